//! Parser for the ASCII dump written by `-agentlib:hprof=cpu=samples`.
//!
//! The dump is scanned line by line with three modes: between sections,
//! inside a `TRACE` block, and inside the `CPU SAMPLES` table. Trace
//! blocks define stacks; the samples table assigns each trace its count.

use super::schema::{CallSite, Trace, TraceSet};
use crate::utils::config::{COMPILED_METHOD_LINE, NATIVE_METHOD_LINE, UNKNOWN_LINE};
use crate::utils::error::ParseError;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::BufRead;

static TRACE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TRACE (\d+):(?: \(thread=\d+\))?$").expect("valid regex"));
static FRAME_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^(]+)\(([^:]+):([^)]+)\)$").expect("valid regex"));
static SAMPLES_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CPU SAMPLES BEGIN \(total = (\d+)\)").expect("valid regex"));
static SAMPLES_COLUMNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rank\s+self\s+accum\s+count\s+trace\s+method$").expect("valid regex")
});

const SAMPLES_END: &str = "CPU SAMPLES END";

/// Frame line of a trace the JVM could not walk
const EMPTY_STACK: &str = "<empty>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Header,
    Trace(u32),
    Samples,
}

/// Parse an ASCII CPU-sampling dump into traces
///
/// **Public** - main entry point for text dumps
///
/// # Returns
/// Every `TRACE` block, keyed by id, with counts from the samples table.
/// Traces the samples table never mentions keep a count of zero.
///
/// # Errors
/// Any malformed trace header, frame line or samples row, a duplicate
/// trace id, or a samples row naming an undefined trace. The error
/// carries the 1-based line number.
pub fn parse_text_dump<R: BufRead>(input: R) -> Result<TraceSet, ParseError> {
    let mut set = TraceSet::new();
    let mut mode = Mode::Header;

    for (index, raw) in input.lines().enumerate() {
        let lineno = index + 1;
        let raw = raw.map_err(|source| ParseError::Io {
            line: lineno,
            source,
        })?;
        let line = raw.strip_suffix('\r').unwrap_or(&raw);

        // A trace block ends at the first unindented line, which is then
        // handled like any other line outside a block.
        if matches!(mode, Mode::Trace(_)) && !line.starts_with('\t') {
            mode = Mode::Header;
        }

        mode = match mode {
            Mode::Header => read_section_line(&mut set, line, lineno)?,
            Mode::Trace(id) => {
                if let Some(site) = parse_frame_line(&line[1..], lineno)? {
                    let site_id = set.call_sites.intern(site);
                    if let Some(trace) = set.traces.get_mut(&id) {
                        trace.stack.push(site_id);
                    }
                }
                mode
            }
            Mode::Samples => read_samples_line(&mut set, line, lineno)?,
        };
    }

    check_declared_total(&set);
    info!(
        "Parsed {} traces over {} distinct call sites",
        set.len(),
        set.call_sites.len()
    );

    Ok(set)
}

/// Handle a line outside any block: look for a trace or samples header
fn read_section_line(set: &mut TraceSet, line: &str, lineno: usize) -> Result<Mode, ParseError> {
    if let Some(caps) = TRACE_HEADER.captures(line) {
        let id: u32 = caps[1]
            .parse()
            .map_err(|_| ParseError::MalformedTraceHeader { line: lineno })?;
        if set.traces.contains_key(&id) {
            return Err(ParseError::DuplicateTrace { line: lineno, id });
        }
        set.traces.insert(id, Trace::new(id));
        return Ok(Mode::Trace(id));
    }

    if let Some(caps) = SAMPLES_HEADER.captures(line) {
        set.declared_total = caps[1].parse().ok();
        debug!("Line {}: entering samples table", lineno);
        return Ok(Mode::Samples);
    }

    Ok(Mode::Header)
}

/// Parse `<method>(<file>:<line>)`; `None` for an `<empty>` stack marker
///
/// **Public** - exposed for reuse and testing
pub fn parse_frame_line(text: &str, lineno: usize) -> Result<Option<CallSite>, ParseError> {
    if text.trim() == EMPTY_STACK {
        return Ok(None);
    }

    let caps = FRAME_LINE
        .captures(text)
        .ok_or_else(|| ParseError::MalformedFrame {
            line: lineno,
            text: text.to_string(),
        })?;
    let line_number = parse_line_number(&caps[3]).ok_or_else(|| ParseError::BadLineNumber {
        line: lineno,
        value: caps[3].to_string(),
    })?;

    Ok(Some(CallSite::new(&caps[1], &caps[2], line_number)))
}

/// Decimal line number or one of the JVM's placeholder texts
fn parse_line_number(value: &str) -> Option<i32> {
    match value {
        "Unknown line" => Some(UNKNOWN_LINE),
        "Compiled method" => Some(COMPILED_METHOD_LINE),
        "Native method" => Some(NATIVE_METHOD_LINE),
        _ => value.parse().ok(),
    }
}

/// Handle a line inside the samples table
fn read_samples_line(set: &mut TraceSet, line: &str, lineno: usize) -> Result<Mode, ParseError> {
    if line == SAMPLES_END {
        return Ok(Mode::Header);
    }
    if SAMPLES_COLUMNS.is_match(line.trim()) || !line.starts_with(' ') {
        return Ok(Mode::Samples);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(ParseError::MalformedSample {
            line: lineno,
            reason: format!("unexpected number of columns ({})", fields.len()),
        });
    }

    let count: u64 = fields[3].parse().map_err(|_| ParseError::MalformedSample {
        line: lineno,
        reason: format!("cannot parse count {:?}", fields[3]),
    })?;
    let id: u32 = fields[4].parse().map_err(|_| ParseError::MalformedSample {
        line: lineno,
        reason: format!("cannot parse id {:?}", fields[4]),
    })?;

    let trace = set
        .traces
        .get_mut(&id)
        .ok_or(ParseError::UnknownTrace { line: lineno, id })?;
    trace.count = count;

    Ok(Mode::Samples)
}

fn check_declared_total(set: &TraceSet) {
    if let Some(declared) = set.declared_total {
        let counted = set.total_count();
        if counted != declared {
            warn!(
                "Samples table announced {} samples but rows add up to {}",
                declared, counted
            );
        }
    }
}
