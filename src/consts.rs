use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Worked hours from which a day counts as present rather than half day
pub const FULL_DAY_HOURS: Decimal = dec!(4);

/// Admitted all-employee recalculations allowed per trailing window
pub const RECALCULATION_RATE_LIMIT: u64 = 3;
pub const RECALCULATION_RATE_WINDOW_MINUTES: i64 = 30;

pub const HISTORY_DEFAULT_LIMIT: u64 = 10;
pub const HISTORY_MAX_LIMIT: u64 = 100;

pub const DAYS_PER_YEAR: Decimal = dec!(365);

// Statutory bonus defaults, used until a configuration is saved
pub const DEFAULT_BONUS_RATE: Decimal = dec!(8.33);
pub const DEFAULT_ELIGIBILITY_CUTOFF: Decimal = dec!(21000);
pub const DEFAULT_MIN_WAGES: Decimal = dec!(7000);

pub const DEFAULT_GRATUITY_MIN_YEARS: Decimal = dec!(5);
pub const DEFAULT_PAYABLE_DAYS: Decimal = dec!(15);
pub const DEFAULT_MONTH_DAYS: Decimal = dec!(26);

/// Rows or ids carried by one bulk statement, well under the Postgres limit of 65535 bind parameters
pub const BULK_ROWS: usize = 1000;
