//! Compiler configuration

/// Output buffer size per channel
pub const DEFAULT_CAPACITY: usize = 32768;

/// Settings passed to [`crate::Compiler::new`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Maximum compiled size of each channel, in bytes
    pub capacity: usize,
    /// Address the image is loaded at
    pub base_address: u16,
    /// Trace line routing and channel sizes on stderr
    pub verbose: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            base_address: 0x0000,
            verbose: false,
        }
    }
}

/// Parse an address the way C's `strtol(s, _, 0)` reads it:
/// `0x` prefix for hex, a leading `0` for octal, decimal otherwise.
pub fn parse_address(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    u16::from_str_radix(digits, radix)
        .map_err(|_| format!("invalid address '{}' (0..0xFFFF)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0"), Ok(0));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert_eq!(parse_address("0x8000"), Ok(0x8000));
        assert_eq!(parse_address("0XFFFF"), Ok(0xFFFF));
        assert_eq!(parse_address("010"), Ok(8));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("-1").is_err());
        assert!(parse_address("abc").is_err());
        assert!(parse_address("").is_err());
    }
}
