use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "Present")]
    Present,
    #[sea_orm(string_value = "Half Day")]
    #[serde(rename = "Half Day")]
    HalfDay,
    #[sea_orm(string_value = "Absent")]
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payout_status")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processed")]
    Processed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "summary_status")]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    #[sea_orm(string_value = "generated")]
    Generated,
    #[sea_orm(string_value = "processed")]
    Processed,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// How fractional years of service are rounded before gratuity is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "year_rounding")]
pub enum YearRounding {
    #[sea_orm(string_value = "round_down")]
    #[serde(rename = "round_down", alias = "RoundDown")]
    RoundDown,
    #[sea_orm(string_value = "round_up")]
    #[serde(rename = "round_up", alias = "RoundUp")]
    RoundUp,
    #[sea_orm(string_value = "round_nearest")]
    #[serde(rename = "round_nearest", alias = "RoundNearest")]
    RoundNearest,
    /// Truncated to two decimals, not rounded
    #[sea_orm(string_value = "raw_2dp")]
    #[serde(rename = "raw_2dp", alias = "Raw2dp")]
    Raw2dp,
}
