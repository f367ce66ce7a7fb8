//! Memory parsing utilities for Grid Engine output.

/// Parse a Grid Engine memory value to megabytes.
///
/// Handles "4G", "1000M", "4096K", "1T" (suffix case-insensitive) and a bare
/// integer, which is taken as megabytes.
///
/// Returns None for empty strings or values that are not a number.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (number, unit) = match s.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&s[..idx], c.to_ascii_uppercase()),
        _ => (s, 'M'),
    };
    let value: f64 = number.parse().ok()?;
    if value < 0.0 {
        return None;
    }

    match unit {
        'T' => Some((value * 1024.0 * 1024.0) as u64),
        'G' => Some((value * 1024.0) as u64),
        'M' => Some(value as u64),
        'K' => Some((value / 1024.0) as u64),
        _ => None,
    }
}

/// Format megabytes as a Grid Engine memory request (e.g. "2048M").
pub fn format_memory_mb(mb: u64) -> String {
    format!("{}M", mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_mb() {
        assert_eq!(parse_memory_mb("4G"), Some(4096));
        assert_eq!(parse_memory_mb("4g"), Some(4096));
        assert_eq!(parse_memory_mb("1000M"), Some(1000));
        assert_eq!(parse_memory_mb("4096K"), Some(4));
        assert_eq!(parse_memory_mb("1T"), Some(1024 * 1024));
        assert_eq!(parse_memory_mb("1.5G"), Some(1536));
        assert_eq!(parse_memory_mb("4096"), Some(4096));
        assert_eq!(parse_memory_mb(""), None);
    }

    #[test]
    fn test_parse_memory_mb_rejects_garbage() {
        assert_eq!(parse_memory_mb("INFINITY"), None);
        assert_eq!(parse_memory_mb("4X"), None);
        assert_eq!(parse_memory_mb("G"), None);
    }

    #[test]
    fn test_format_memory_mb() {
        assert_eq!(format_memory_mb(2048), "2048M");
    }
}
