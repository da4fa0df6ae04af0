use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{consts::{BULK_ROWS, FULL_DAY_HOURS}, entity::{attendance, prelude::*, sea_orm_active_enums::AttendanceStatus}, error::PayrollError, utils};

/// Derives worked hours and day status from the punches of one day
///
/// A check-out that is not after the check-in counts as no time worked. The
/// status is decided on the exact duration, only the stored hours are rounded.
pub fn derive(check_in: Option<NaiveTime>, check_out: Option<NaiveTime>) -> (Decimal, AttendanceStatus) {
    let hours = match (check_in, check_out) {
        (Some(check_in), Some(check_out)) if check_out > check_in => {
            Decimal::from((check_out - check_in).num_seconds()) / dec!(3600)
        },
        _ => Decimal::ZERO,
    };

    let status = if hours >= FULL_DAY_HOURS {
        AttendanceStatus::Present
    } else if hours > Decimal::ZERO {
        AttendanceStatus::HalfDay
    } else {
        AttendanceStatus::Absent
    };

    (utils::round_money(hours), status)
}

/// Punches to store when `supplied` is written over `stored`
///
/// Supplying both replaces both. Otherwise a supplied punch only fills a
/// punch that is still empty.
pub fn merge_punches(
    stored: (Option<NaiveTime>, Option<NaiveTime>),
    supplied: (Option<NaiveTime>, Option<NaiveTime>),
) -> (Option<NaiveTime>, Option<NaiveTime>) {
    match supplied {
        (Some(check_in), Some(check_out)) => (Some(check_in), Some(check_out)),
        (check_in, check_out) => (stored.0.or(check_in), stored.1.or(check_out)),
    }
}

/// Attendance of `employee_ids` between both dates, inclusive
pub async fn get_range<C: ConnectionTrait>(db: &C, employee_ids: &[Uuid], date_from: NaiveDate, date_to: NaiveDate) -> Result<Vec<attendance::Model>, PayrollError> {
    if employee_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for ids in employee_ids.chunks(BULK_ROWS) {
        let chunk = Attendance::find()
            .filter(attendance::Column::EmployeeId.is_in(ids.iter().copied()))
            .filter(attendance::Column::Date.between(date_from, date_to))
            .order_by_asc(attendance::Column::EmployeeId)
            .order_by_asc(attendance::Column::Date)
            .all(db).await?;

        records.extend(chunk);
    }

    if employee_ids.len() > BULK_ROWS {
        records.sort_by_key(|record| (record.employee_id, record.date));
    }

    Ok(records)
}

pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    date: NaiveDate,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    is_manual: bool,
) -> Result<attendance::Model, PayrollError> {
    let existing = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.eq(date))
        .one(db).await?;

    let now = utils::now();

    let record = match existing {
        Some(record) => {
            let (check_in, check_out) = merge_punches((record.check_in, record.check_out), (check_in, check_out));
            let (hours_worked, status) = derive(check_in, check_out);

            Attendance::update(attendance::ActiveModel {
                id: Unchanged(record.id),
                updated_at: Set(now),
                check_in: Set(check_in),
                check_out: Set(check_out),
                hours_worked: Set(hours_worked),
                status: Set(status),
                is_manual: Set(record.is_manual || is_manual),
                ..Default::default()
            }).exec(db).await?
        },
        None => {
            let (hours_worked, status) = derive(check_in, check_out);

            Attendance::insert(attendance::ActiveModel {
                created_at: Set(now),
                updated_at: Set(now),
                employee_id: Set(employee_id),
                date: Set(date),
                check_in: Set(check_in),
                check_out: Set(check_out),
                hours_worked: Set(hours_worked),
                status: Set(status),
                is_manual: Set(is_manual),
                ..Default::default()
            }).exec_with_returning(db).await?
        },
    };

    Ok(record)
}

pub async fn update_derived<C: ConnectionTrait>(db: &C, record: &attendance::Model, hours_worked: Decimal, status: AttendanceStatus) -> Result<(), PayrollError> {
    Attendance::update_many()
        .set(attendance::ActiveModel {
            updated_at: Set(utils::now()),
            hours_worked: Set(hours_worked),
            status: Set(status),
            ..Default::default()
        })
        .filter(attendance::Column::Id.eq(record.id))
        .exec(db).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    fn at(hour: u32, minute: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    #[test]
    fn test_derive_full_day() {
        assert_eq!(derive(at(9, 0), at(17, 30)), (dec!(8.5), AttendanceStatus::Present));
    }

    #[test]
    fn test_derive_half_day() {
        assert_eq!(derive(at(9, 0), at(12, 0)), (dec!(3), AttendanceStatus::HalfDay));
    }

    #[test]
    fn test_derive_without_punches() {
        assert_eq!(derive(None, None), (Decimal::ZERO, AttendanceStatus::Absent));
        assert_eq!(derive(at(9, 0), None), (Decimal::ZERO, AttendanceStatus::Absent));
        assert_eq!(derive(None, at(17, 0)), (Decimal::ZERO, AttendanceStatus::Absent));
    }

    #[test]
    fn test_derive_boundaries() {
        assert_eq!(derive(at(9, 0), at(13, 0)), (dec!(4), AttendanceStatus::Present));
        assert_eq!(derive(at(9, 0), at(12, 59)), (dec!(3.98), AttendanceStatus::HalfDay));
        assert_eq!(derive(at(9, 0), at(9, 0)), (Decimal::ZERO, AttendanceStatus::Absent));
        assert_eq!(derive(at(9, 0), NaiveTime::from_hms_opt(12, 59, 42)), (dec!(4.00), AttendanceStatus::HalfDay));
        assert_eq!(derive(at(17, 0), at(9, 0)), (Decimal::ZERO, AttendanceStatus::Absent));
    }

    #[test]
    fn test_merge_punches_both_supplied_replace() {
        assert_eq!(merge_punches((at(8, 0), at(16, 0)), (at(9, 0), at(17, 0))), (at(9, 0), at(17, 0)));
    }

    #[test]
    fn test_merge_punches_single_punch_only_fills_gaps() {
        assert_eq!(merge_punches((at(8, 0), None), (at(9, 0), None)), (at(8, 0), None));
        assert_eq!(merge_punches((at(8, 0), None), (None, at(17, 0))), (at(8, 0), at(17, 0)));
        assert_eq!(merge_punches((None, None), (at(9, 0), None)), (at(9, 0), None));
        assert_eq!(merge_punches((at(8, 0), at(16, 0)), (None, None)), (at(8, 0), at(16, 0)));
    }

    #[actix_web::test]
    async fn test_upsert_inserts_new_day() {
        let employee_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let inserted = fixtures::record(employee_id, date, at(9, 0), at(17, 30));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<attendance::Model>::new(),
                vec![ inserted.clone() ],
            ])
            .into_connection();

        let record = upsert(&db, employee_id, date, at(9, 0), at(17, 30), true).await.unwrap();
        assert_eq!(record, inserted);
    }

    #[actix_web::test]
    async fn test_get_range_without_employees_skips_the_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        assert!(get_range(&db, &[], day, day).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_update_derived() {
        let record = fixtures::record(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), at(9, 0), at(12, 0));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ])
            .into_connection();

        update_derived(&db, &record, dec!(3), AttendanceStatus::HalfDay).await.unwrap();
    }
}
