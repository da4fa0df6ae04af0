use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ProcessEncashment {
    pub(super) payment_period: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PreviewQuery {
    pub(super) leave_type: i32,
    pub(super) cutoff_date: NaiveDate,
    #[serde(default)]
    pub(super) threshold: Decimal,
}
