//! hprofviz
//!
//! Call graphs and heap summaries for JVM HPROF dumps.
//!
//! This crate provides the core implementation for the
//! `hprofviz` CLI tool:
//! - ASCII CPU-sampling dumps become Graphviz DOT call graphs
//! - Binary heap dumps are summarized by allocating stack trace
//!
//! ## Getting Started
//!
//! ```bash
//! java -agentlib:hprof=cpu=samples,file=cpu.txt MyApp
//! hprofviz graph --keep 40 cpu.txt cpu.dot
//! dot -Tsvg cpu.dot > cpu.svg
//! ```

pub mod aggregator;
pub mod commands;
pub mod dot;
pub mod output;
pub mod parser;
pub mod utils;
