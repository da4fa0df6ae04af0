use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StartRecalculation {
    pub(super) date_from: NaiveDate,
    pub(super) date_to: NaiveDate,
    #[serde(default)]
    pub(super) all_employees: bool,
    pub(super) employee_id: Option<Uuid>,
}

/// Punches as `HH:MM`, a missing or empty punch is left alone
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ManualAttendance {
    pub(super) employee_id: Uuid,
    pub(super) date: NaiveDate,
    pub(super) check_in: Option<String>,
    pub(super) check_out: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct HistoryQuery {
    pub(super) limit: Option<u64>,
}
