//! Numeric report mode from the command line.
//!
//! | mode | effect |
//! |------|--------|
//! | 1 | print decoded inputs; stack variant uses the subprocess oracle |
//! | 2 | print `differ` on divergence |
//! | 3 | 1 + 2 |
//! | 4 | print the library's error classification |
//!
//! Any other value (including an absent or non-numeric argument) is mode 0:
//! no extra output, socket oracle for the stack variant.

/// Parsed report mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportMode(pub i32);

impl ReportMode {
    /// Parse like C `atoi`: optional leading whitespace and sign, then as many
    /// digits as are present. Anything unparseable is 0.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self(0);
        };
        let s = raw.trim_start();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let mut value: i64 = 0;
        for b in digits.bytes().take_while(u8::is_ascii_digit) {
            value = value * 10 + i64::from(b - b'0');
            if value > i64::from(i32::MAX) + 1 {
                break;
            }
        }
        let value = if negative { -value } else { value };
        Self(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    #[must_use]
    pub fn print_inputs(self) -> bool {
        matches!(self.0, 1 | 3)
    }

    #[must_use]
    pub fn print_differ(self) -> bool {
        matches!(self.0, 2 | 3)
    }

    #[must_use]
    pub fn print_error(self) -> bool {
        self.0 == 4
    }

    /// Whether the stack variant queries the subprocess oracle.
    #[must_use]
    pub fn uses_subprocess(self) -> bool {
        matches!(self.0, 1 | 3)
    }
}
