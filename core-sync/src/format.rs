//! Human-readable rendering helpers for status lines.

pub use core_async::time::format_hms;

const SI_PREFIXES: [char; 6] = ['k', 'M', 'G', 'T', 'P', 'E'];

/// Format a byte count with SI (power of 1000) units: `999 B`, `1.5 kB`,
/// `2.0 GB`.
pub fn human_readable_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut exp = 0usize;
    let mut scaled = bytes;
    while scaled >= UNIT && exp < SI_PREFIXES.len() {
        scaled /= UNIT;
        exp += 1;
    }

    let value = bytes as f64 / (UNIT as f64).powi(exp as i32);
    format!("{:.1} {}B", value, SI_PREFIXES[exp - 1])
}
