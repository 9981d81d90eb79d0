//! Configuration and constants for the CLI.

/// Current JSON heap report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Header string that opens every binary dump, NUL terminator included
pub const HPROF_MAGIC: &[u8] = b"JAVA PROFILE 1.0.2\0";

/// The only identifier width the binary decoder handles
pub const SUPPORTED_ID_SIZE: u32 = 8;

// Object header overheads for a 64-bit OpenJDK 8 layout, measured empirically.
// They are approximations: compressed oops and alignment padding are ignored.
// TODO: derive these from the CLASS DUMP instance size instead of fixed values.
pub const INSTANCE_HEADER_SIZE: u64 = 16;
pub const OBJECT_ARRAY_HEADER_SIZE: u64 = 24;
pub const PRIMITIVE_ARRAY_HEADER_SIZE: u64 = 24;

/// Filename recorded for stack frames without a source file
pub const UNKNOWN_FILE: &str = "<unknown>";

/// Line number sentinels, as written by the JVM
pub const UNKNOWN_LINE: i32 = -1;
pub const COMPILED_METHOD_LINE: i32 = -2;
pub const NATIVE_METHOD_LINE: i32 = -3;

/// Number of largest stack traces reported by the heap summary
pub const DEFAULT_TOP_STACKS: usize = 10;
