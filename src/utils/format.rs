//! Human-readable formatting helpers for reports.

const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with SI units ("1.5 MB")
///
/// Values below 10 in a scaled unit get one decimal, larger ones none.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else if value < 10.0 {
        format!("{:.1} {}", value, UNITS[unit])
    } else {
        format!("{:.0} {}", value, UNITS[unit])
    }
}

/// Format `part/whole (pct%)`, as used in sample-retention logging
pub fn format_fraction(part: u64, whole: u64) -> String {
    let percentage = if whole > 0 {
        100.0 * part as f64 / whole as f64
    } else {
        0.0
    };
    format!("{}/{} ({:.2}%)", part, whole, percentage)
}
