//! Fixed-point decimal values
//!
//! The feed delivers values as text ("123.45", "-5"). They are parsed into
//! a scaled integer mantissa plus a decimal count so the digit-roll
//! animation can interpolate without floating point and the original
//! precision survives re-rendering.

use heapless::String;

/// Maximum decimal places accepted from the feed
const MAX_DECIMALS: u8 = 6;

/// Maximum digits accepted from the feed
const MAX_DIGITS: usize = 15;

/// Rendered width of a formatted value
pub const MAX_VALUE_TEXT: usize = 20;

/// A parsed decimal value: `mantissa / 10^decimals`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Number {
    pub mantissa: i64,
    pub decimals: u8,
}

impl Number {
    /// Parse a decimal string: optional `-`, digits, optional `.` + digits
    ///
    /// Anything else (including empty fraction or trailing junk) is
    /// rejected.
    pub fn parse(text: &str) -> Option<Number> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        if digits.is_empty() || digits.len() > MAX_DIGITS {
            return None;
        }

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if frac_part.len() > MAX_DECIMALS as usize {
            return None;
        }

        let mut mantissa: i64 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10)? as i64;
            mantissa = mantissa * 10 + d;
        }
        if negative {
            mantissa = -mantissa;
        }

        Some(Number {
            mantissa,
            decimals: frac_part.len() as u8,
        })
    }

    /// Mantissa rescaled to `decimals` places, saturating at the i64 range
    ///
    /// A 15-digit mantissa scaled up by 6 decimal places exceeds i64, so
    /// upscaling must not be unchecked.
    pub fn scaled_to(&self, decimals: u8) -> i64 {
        let mut m = self.mantissa;
        if decimals >= self.decimals {
            for _ in 0..(decimals - self.decimals) {
                m = m.saturating_mul(10);
            }
        } else {
            for _ in 0..(self.decimals - decimals) {
                m /= 10;
            }
        }
        m
    }

    /// True when `self` is at or above `other`
    pub fn at_least(&self, other: &Number) -> bool {
        let decimals = self.decimals.max(other.decimals);
        self.scaled_to(decimals) >= other.scaled_to(decimals)
    }
}

/// Render a scaled mantissa back to decimal text
pub fn format_scaled(mantissa: i64, decimals: u8) -> String<MAX_VALUE_TEXT> {
    let mut out = String::new();
    let negative = mantissa < 0;
    let mut magnitude = mantissa.unsigned_abs();

    // Digits in reverse, inserting the point after `decimals` of them
    let mut rev = String::<MAX_VALUE_TEXT>::new();
    let mut emitted = 0u8;
    loop {
        let digit = (magnitude % 10) as u8;
        let _ = rev.push((b'0' + digit) as char);
        magnitude /= 10;
        emitted += 1;
        if decimals > 0 && emitted == decimals {
            let _ = rev.push('.');
            // Force a leading zero for |value| < 1
            if magnitude == 0 {
                let _ = rev.push('0');
            }
        }
        if magnitude == 0 && emitted >= decimals {
            break;
        }
    }
    if negative {
        let _ = out.push('-');
    }
    for c in rev.chars().rev() {
        let _ = out.push(c);
    }
    out
}

/// Number of decimal digits in |value| (at least 1)
pub fn digit_count(value: i64) -> u32 {
    let mut magnitude = value.unsigned_abs();
    let mut count = 1;
    while magnitude >= 10 {
        magnitude /= 10;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(
            Number::parse("65000"),
            Some(Number {
                mantissa: 65000,
                decimals: 0
            })
        );
        assert_eq!(
            Number::parse("-5"),
            Some(Number {
                mantissa: -5,
                decimals: 0
            })
        );
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(
            Number::parse("123.45"),
            Some(Number {
                mantissa: 12345,
                decimals: 2
            })
        );
        assert_eq!(
            Number::parse("0.001"),
            Some(Number {
                mantissa: 1,
                decimals: 3
            })
        );
    }

    #[test]
    fn test_parse_rejects_junk() {
        assert_eq!(Number::parse(""), None);
        assert_eq!(Number::parse("-"), None);
        assert_eq!(Number::parse("."), None);
        assert_eq!(Number::parse("12a"), None);
        assert_eq!(Number::parse("1.2.3"), None);
    }

    #[test]
    fn test_format_roundtrip() {
        let n = Number::parse("123.45").unwrap();
        assert_eq!(format_scaled(n.mantissa, n.decimals).as_str(), "123.45");

        let n = Number::parse("-0.50").unwrap();
        assert_eq!(format_scaled(n.mantissa, n.decimals).as_str(), "-0.50");

        assert_eq!(format_scaled(65000, 0).as_str(), "65000");
        assert_eq!(format_scaled(0, 0).as_str(), "0");
    }

    #[test]
    fn test_scaling_saturates_instead_of_overflowing() {
        let n = Number::parse("999999999999999").unwrap();
        assert_eq!(n.scaled_to(6), i64::MAX);

        let n = Number::parse("-999999999999999").unwrap();
        assert_eq!(n.scaled_to(6), i64::MIN);
    }

    #[test]
    fn test_at_least_across_scales() {
        let a = Number::parse("100.5").unwrap();
        let b = Number::parse("100.49").unwrap();
        assert!(a.at_least(&b));
        assert!(!b.at_least(&a));
        assert!(a.at_least(&a));
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(-12345), 5);
    }
}
