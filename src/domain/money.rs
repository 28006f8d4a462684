use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Upper bound accepted for any single money field (10 billion units).
pub const MAX_AMOUNT_CENTS: Cents = 10_000_000_000 * 100;

/// Format cents as a human-readable amount with thousands separators.
/// Example: 123456 -> "1,234.56", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = (abs_cents / 100).to_string();
    let remainder = abs_cents % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{:02}", sign, grouped, remainder)
}

/// Parse a decimal string into cents. Thousands separators and spaces are ignored.
/// Example: "1,250.00" -> 125000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let negative = cleaned.starts_with('-');
    let input = cleaned.trim_start_matches('-');

    if input.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let parts: Vec<&str> = input.split('.').collect();
    let cents = match parts.as_slice() {
        [units] => parse_units(units)?
            .checked_mul(100)
            .ok_or(ParseCentsError::Overflow)?,
        [units, decimals] => {
            let units = if units.is_empty() { 0 } else { parse_units(units)? };

            // Pad or truncate to 2 digits
            let decimal_cents: i64 = match decimals.len() {
                0 => 0,
                1 => parse_units(decimals)? * 10,
                2 => parse_units(decimals)?,
                _ => parse_units(&decimals[..2])?,
            };

            units
                .checked_mul(100)
                .and_then(|cents| cents.checked_add(decimal_cents))
                .ok_or(ParseCentsError::Overflow)?
        }
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    Ok(if negative { -cents } else { cents })
}

fn parse_units(digits: &str) -> Result<i64, ParseCentsError> {
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    digits.parse().map_err(|err: std::num::ParseIntError| match err.kind() {
        std::num::IntErrorKind::PosOverflow => ParseCentsError::Overflow,
        _ => ParseCentsError::InvalidFormat,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(123456), "1,234.56");
        assert_eq!(format_cents(100000000), "1,000,000.00");
        assert_eq!(format_cents(-12345678), "-123,456.78");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_strips_separators() {
        assert_eq!(parse_cents("1,250.00"), Ok(125000));
        assert_eq!(parse_cents(" 2 500 "), Ok(250000));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents("+5").is_err());
    }

    #[test]
    fn test_parse_cents_overflow_is_rejected() {
        assert_eq!(
            parse_cents("99999999999999999"),
            Err(ParseCentsError::Overflow)
        );
        assert_eq!(
            parse_cents("92233720368547758.08"),
            Err(ParseCentsError::Overflow)
        );
        assert_eq!(
            parse_cents("99999999999999999999999"),
            Err(ParseCentsError::Overflow)
        );
        assert_eq!(parse_cents("92233720368547758.07"), Ok(i64::MAX));
        assert_eq!(parse_cents("92233720368547758"), Ok(9_223_372_036_854_775_800));
    }
}
