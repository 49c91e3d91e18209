//! Dashboard summary command

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::config::settings::Settings;
use crate::display::summary::format_summary;
use crate::error::{LedgerError, LedgerResult};
use crate::services::SummaryService;
use crate::storage::Storage;

/// Print the dashboard, optionally with a one-off conversion rate
pub fn handle_summary_command(
    storage: &Storage,
    settings: &Settings,
    rate: Option<&str>,
) -> LedgerResult<()> {
    let rate = match rate {
        Some(rate) => parse_rate(rate)?,
        None => settings.sar_to_yer_rate,
    };

    let summary = SummaryService::new(storage).summarize(rate)?;
    print!("{}", format_summary(&summary));
    Ok(())
}

/// Parse a positive SAR to YER rate
pub fn parse_rate(input: &str) -> LedgerResult<Decimal> {
    let rate = Decimal::from_str(input.trim()).map_err(|_| {
        LedgerError::Validation(format!("Invalid rate: '{}'", input))
    })?;
    if rate <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "Rate must be greater than zero".into(),
        ));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("140").unwrap(), Decimal::from(140));
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("abc").is_err());
    }
}
