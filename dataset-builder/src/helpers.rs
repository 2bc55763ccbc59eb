const UNITS: [&str; 4] = ["bytes", "KB", "MB", "GB"];

/// Render a byte count the way the size readout shows it, eg "12 MB".
///
/// Uses 1024 based units, picking the largest unit the count exceeds, and rounds to the nearest
/// whole number.
///
pub fn format_bytes(bytes: u64) -> String {
    for exponent in (1..UNITS.len()).rev() {
        let divisor = 1024_u64.pow(exponent as u32);
        if bytes > divisor {
            let scaled = (bytes as f64 / divisor as f64).round();
            return format!("{scaled} {}", UNITS[exponent]);
        }
    }

    format!("{bytes} {}", UNITS[0])
}
