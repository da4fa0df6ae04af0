use chrono::{Local, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::error::PayrollError;

pub fn now() -> DateTimeWithTimeZone {
    Local::now().fixed_offset()
}

/// Money and hours are rounded half away from zero to 2 decimals everywhere
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a wall clock time written as `HH:MM`
pub fn parse_clock(value: &str) -> Result<NaiveTime, PayrollError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| PayrollError::validation(format!("`{value}` is not a valid HH:MM time")))
}

pub fn parse_optional_clock(value: Option<&str>) -> Result<Option<NaiveTime>, PayrollError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(parse_clock)
        .transpose()
}

pub fn format_clock(time: Option<NaiveTime>) -> Option<String> {
    time.map(|t| t.format("%H:%M").to_string())
}
