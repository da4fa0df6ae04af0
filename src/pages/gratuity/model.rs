use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ProcessGratuity {
    pub(super) month: i16,
    pub(super) year: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PreviewQuery {
    pub(super) cutoff_date: NaiveDate,
}
