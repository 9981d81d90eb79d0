//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while decoding a binary HPROF stream
///
/// Every variant is fatal: the decoder never returns a partial profile.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("bad header string {0:?}")]
    BadMagic(String),

    #[error("only id size of 8 handled; got {0}")]
    UnsupportedIdSize(u32),

    #[error("{referrer} referred to unknown {what} string {id}")]
    UndefinedString {
        referrer: &'static str,
        what: &'static str,
        id: u64,
    },

    #[error("frame referred to unknown class serial {0}")]
    UndefinedClass(u32),

    #[error("class dump referred to bad class object id {0}")]
    UndefinedClassObject(u64),

    #[error("trace referred to unknown frame id {0}")]
    UndefinedFrame(u64),

    #[error("duplicate stack trace serial {0}")]
    DuplicateTrace(u32),

    #[error("unknown heap dump sub-tag {0:#04x}")]
    UnknownSubTag(u8),

    #[error("unexpected basic type {0:#x}")]
    UnknownBasicType(u8),

    #[error("heap dump segment declared {declared} bytes but sub-records consumed {consumed}")]
    SegmentLengthMismatch { declared: u64, consumed: u64 },

    #[error("record {tag:#04x} declared {length} bytes, too short for its fields")]
    RecordTooShort { tag: u8, length: u32 },

    #[error("record {tag:#04x} declared {declared} bytes but its fields took {consumed}")]
    RecordLengthMismatch { tag: u8, declared: u32, consumed: u64 },

    #[error("unexpected end of stream at byte offset {offset}")]
    Truncated { offset: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while parsing an ASCII HPROF dump
///
/// Every variant carries the 1-based line number of the offending input line.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Line {line}: cannot parse TRACE line")]
    MalformedTraceHeader { line: usize },

    #[error("Line {line}: cannot parse trace line {text:?}")]
    MalformedFrame { line: usize, text: String },

    #[error("Line {line}: bad line number {value:?}")]
    BadLineNumber { line: usize, value: String },

    #[error("Line {line}: {reason}")]
    MalformedSample { line: usize, reason: String },

    #[error("Line {line}: found id {id}, but no trace with such id exists")]
    UnknownTrace { line: usize, id: u32 },

    #[error("Line {line}: duplicate trace with id {id}")]
    DuplicateTrace { line: usize, id: u32 },

    #[error("Line {line}: IO error: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Errors caused by the caller's choice of options rather than the input data
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Cannot provide both -topk and -regex.")]
    ConflictingFilters,

    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Cannot keep {requested} nodes; only {available} available")]
    PruneExceedsNodes { requested: usize, available: usize },

    #[error("Path is empty")]
    EmptyPath,
}

/// Errors that can occur during DOT graph rendering
#[derive(Error, Debug)]
pub enum DotError {
    #[error("Empty call graph")]
    EmptyGraph,

    #[error("Formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
