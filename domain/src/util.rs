//! Shared utility functions.

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Generate a v4-shaped unique identifier from the current time.
///
/// Debates and agents are short-lived and identifiers only need to be unique
/// within a process, so a time-derived id avoids pulling in a crypto RNG.
pub fn uuid_v4() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let nanos = now.as_nanos();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (nanos >> 96) as u32,
        (nanos >> 80) as u16,
        (nanos >> 64) as u16 & 0x0fff,
        ((nanos >> 48) as u16 & 0x3fff) | 0x8000,
        (nanos & 0xffffffffffff) as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("stand by original", 5), "stand");
    }

    #[test]
    fn truncate_no_op_when_short() {
        assert_eq!(truncate_str("ok", 16), "ok");
    }

    #[test]
    fn truncate_multibyte_boundary() {
        // 'é' is 2 bytes; cutting inside it must back up to the boundary
        let s = "débat";
        assert_eq!(truncate_str(s, 2), "d");
        assert_eq!(truncate_str(s, 3), "dé");
    }

    #[test]
    fn truncate_empty() {
        assert_eq!(truncate_str("", 4), "");
    }

    #[test]
    fn uuid_shape() {
        let id = uuid_v4();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }
}
