use std::fmt;

/// Money is an integer count of the smallest currency unit (e.g. 1 won, 1 cent).
/// Sums never go through floating point.
pub type Amount = i64;

/// Sum of amounts. Wide enough that adding up any ledger of non-negative
/// `Amount`s cannot overflow.
pub type Total = i128;

/// Format an amount or total with thousands separators.
/// Example: 1234500 -> "1,234,500", -1200 -> "-1,200"
pub fn format_amount(amount: impl Into<Total>) -> String {
    let amount: Total = amount.into();
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Parse a user-typed amount. Thousands separators (`,` or `_`) are ignored.
/// Example: "1,500" -> 1500, "300" -> 300, "-20" -> -20
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let cleaned: String = digits.chars().filter(|c| *c != ',' && *c != '_').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseAmountError::InvalidFormat);
    }

    let value: Amount = cleaned.parse().map_err(|_| ParseAmountError::Overflow)?;
    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
            ParseAmountError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(100), "100");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(1234500), "1,234,500");
        assert_eq!(format_amount(-1200), "-1,200");
        assert_eq!(
            format_amount(Total::from(Amount::MAX) * 2),
            "18,446,744,073,709,551,614"
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("300"), Ok(300));
        assert_eq!(parse_amount(" 1,500 "), Ok(1500));
        assert_eq!(parse_amount("10_000"), Ok(10000));
        assert_eq!(parse_amount("-20"), Ok(-20));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("12.50"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("abc"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(
            parse_amount("99999999999999999999"),
            Err(ParseAmountError::Overflow)
        );
    }
}
