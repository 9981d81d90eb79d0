//! Dump parsing and schema definitions.
//!
//! This module handles:
//! - Big-endian primitive reads over the binary dump
//! - Decoding binary HPROF heap dumps
//! - Parsing ASCII CPU-sampling dumps
//! - Defining the shared call site / trace model

pub mod hprof_binary;
pub mod hprof_text;
pub mod reader;
pub mod schema;

// Re-export main types
pub use hprof_binary::{decode_heap_dump, decode_heap_dump_file, BasicType, HeapProfile, HprofDecoder};
pub use hprof_text::{parse_frame_line, parse_text_dump};
pub use reader::ByteReader;
pub use schema::{
    CallSite, CallSiteId, CallSiteTable, Class, Frame, HeapReport, OverheadSummary, StackSize,
    StackTrace, Trace, TraceSet,
};
