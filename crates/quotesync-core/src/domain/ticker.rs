use std::fmt::{Display, Formatter};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 32;

/// Ticker identifier as supplied by the source universe query.
///
/// Tickers pass through into the quote endpoint path, so the accepted
/// character set is restricted. Case and exchange suffixes (`AAPL.US`,
/// `GSPC.INDX`) are preserved as-is; index prefixes like `^` are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let len = trimmed.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        for (index, ch) in trimmed.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_' | '^' | '=');
            if !valid {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_preserves_case() {
        let ticker = Ticker::parse(" Aapl.US ").expect("must parse");
        assert_eq!(ticker.as_str(), "Aapl.US");
    }

    #[test]
    fn accepts_index_and_forex_shapes() {
        assert!(Ticker::parse("^GSPC").is_ok());
        assert!(Ticker::parse("EURUSD=X").is_ok());
        assert!(Ticker::parse("BRK-B").is_ok());
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(matches!(
            Ticker::parse("   "),
            Err(ValidationError::EmptyTicker)
        ));
    }

    #[test]
    fn rejects_path_breaking_characters() {
        assert!(matches!(
            Ticker::parse("AAPL/US"),
            Err(ValidationError::TickerInvalidChar { ch: '/', .. })
        ));
        assert!(Ticker::parse("AAPL US").is_err());
    }

    #[test]
    fn rejects_overlong_tickers() {
        let long = "A".repeat(MAX_TICKER_LEN + 1);
        assert!(matches!(
            Ticker::parse(&long),
            Err(ValidationError::TickerTooLong { .. })
        ));
    }
}
