use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sea_orm::{sea_query::{Expr, Func, LikeExpr}, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{consts::BULK_ROWS, entity::{employee, prelude::*, salary_component::{self, SalaryField}}, error::PayrollError};

/// Narrows the set of employees a payroll run works on
///
/// Empty lists don't filter. `active` defaults to active employees only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeFilter {
    pub locations: Vec<Uuid>,
    pub departments: Vec<Uuid>,
    pub cost_centers: Vec<Uuid>,
    pub search: Option<String>,
    pub active: Option<bool>,
}

impl EmployeeFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all()
            .add(employee::Column::IsActive.eq(self.active.unwrap_or(true)));

        if !self.locations.is_empty() {
            condition = condition.add(employee::Column::LocationId.is_in(self.locations.clone()));
        }
        if !self.departments.is_empty() {
            condition = condition.add(employee::Column::DepartmentId.is_in(self.departments.clone()));
        }
        if !self.cost_centers.is_empty() {
            condition = condition.add(employee::Column::CostCenterId.is_in(self.cost_centers.clone()));
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));

            condition = condition.add(Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(employee::Column::Code))).like(LikeExpr::new(pattern.as_str()).escape('\\')))
                .add(Expr::expr(Func::lower(Expr::col(employee::Column::Name))).like(LikeExpr::new(pattern.as_str()).escape('\\'))));
        }

        condition
    }
}

/// Makes `%`, `_` and `\` match themselves in a `LIKE` pattern
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

pub async fn list_employees<C: ConnectionTrait>(db: &C, filter: &EmployeeFilter) -> Result<Vec<employee::Model>, PayrollError> {
    let employees = Employee::find()
        .filter(filter.condition())
        .order_by_asc(employee::Column::Code)
        .all(db).await?;

    Ok(employees)
}

pub async fn find_employee<C: ConnectionTrait>(db: &C, employee_id: Uuid) -> Result<employee::Model, PayrollError> {
    Employee::find_by_id(employee_id)
        .one(db).await?
        .ok_or_else(|| PayrollError::not_found(format!("employee {employee_id} does not exist")))
}

pub async fn current_salary<C: ConnectionTrait>(db: &C, employee_id: Uuid) -> Result<Option<salary_component::Model>, PayrollError> {
    let salary = SalaryComponent::find()
        .filter(salary_component::Column::EmployeeId.eq(employee_id))
        .filter(salary_component::Column::IsCurrent.eq(true))
        .one(db).await?;

    Ok(salary)
}

/// Current salary rows keyed by employee, employees without one are absent
pub async fn current_salaries<C: ConnectionTrait>(db: &C, employee_ids: &[Uuid]) -> Result<HashMap<Uuid, salary_component::Model>, PayrollError> {
    if employee_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut salaries = HashMap::new();
    for ids in employee_ids.chunks(BULK_ROWS) {
        let chunk = SalaryComponent::find()
            .filter(salary_component::Column::EmployeeId.is_in(ids.iter().copied()))
            .filter(salary_component::Column::IsCurrent.eq(true))
            .all(db).await?;

        salaries.extend(chunk.into_iter().map(|salary| (salary.employee_id, salary)));
    }

    Ok(salaries)
}

pub async fn daily_salary<C: ConnectionTrait>(db: &C, employee_id: Uuid) -> Result<Decimal, PayrollError> {
    Ok(find_employee(db, employee_id).await?.daily_salary)
}

/// Sum of the selected components, each counted once
pub fn base_salary(salary: &salary_component::Model, fields: &[SalaryField]) -> Decimal {
    fields.iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .map(|field| salary.component(field))
        .sum()
}


#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::{fixtures, *};

    #[test]
    fn test_base_salary() {
        let salary = fixtures::salary(Uuid::new_v4(), dec!(10000), dec!(5000));

        assert_eq!(base_salary(&salary, &[SalaryField::Basic, SalaryField::Hra]), dec!(15000));
        assert_eq!(base_salary(&salary, &[SalaryField::Basic]), dec!(10000));
        assert_eq!(base_salary(&salary, &[SalaryField::Basic, SalaryField::Basic]), dec!(10000));
        assert_eq!(base_salary(&salary, &[SalaryField::Telephone]), Decimal::ZERO);
        assert_eq!(base_salary(&salary, &[]), Decimal::ZERO);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("emp-0001"), "emp-0001");
        assert_eq!(escape_like("100%_done"), r"100\%\_done");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    #[actix_web::test]
    async fn test_search_wildcards_match_literally() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<employee::Model>::new(),
            ])
            .into_connection();

        let filter = EmployeeFilter { search: Some(" 50%_Off ".to_string()), ..Default::default() };
        assert!(list_employees(&db, &filter).await.unwrap().is_empty());

        let log = db.into_transaction_log();
        let values = format!("{:?}", log[0].statements()[0].values);
        assert!(values.contains(r#""%50\\%\\_off%""#));
    }

    #[actix_web::test]
    async fn test_find_employee() {
        let employee = fixtures::employee("EMP-0001", dec!(500), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
                vec![],
            ])
            .into_connection();

        assert_eq!(find_employee(&db, employee.id).await.unwrap(), employee);
        assert!(matches!(find_employee(&db, Uuid::new_v4()).await, Err(PayrollError::NotFound(_))));
    }

    #[actix_web::test]
    async fn test_daily_salary() {
        let employee = fixtures::employee("EMP-0002", dec!(812.50), NaiveDate::from_ymd_opt(2021, 4, 1).unwrap());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .into_connection();

        assert_eq!(daily_salary(&db, employee.id).await.unwrap(), dec!(812.50));
    }

    #[actix_web::test]
    async fn test_current_salaries_without_ids_skips_the_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        assert!(current_salaries(&db, &[]).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_current_salaries_keyed_by_employee() {
        let first = fixtures::salary(Uuid::new_v4(), dec!(10000), dec!(5000));
        let second = fixtures::salary(Uuid::new_v4(), dec!(20000), dec!(8000));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ first.clone(), second.clone() ],
            ])
            .into_connection();

        let salaries = current_salaries(&db, &[first.employee_id, second.employee_id]).await.unwrap();

        assert_eq!(salaries.len(), 2);
        assert_eq!(salaries[&second.employee_id], second);
    }

    #[actix_web::test]
    async fn test_current_salaries_split_across_statements() {
        let employee_ids = (0..BULK_ROWS + 1).map(|_| Uuid::new_v4()).collect::<Vec<_>>();
        let first = fixtures::salary(employee_ids[0], dec!(10000), dec!(5000));
        let last = fixtures::salary(employee_ids[BULK_ROWS], dec!(20000), dec!(8000));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ first.clone() ],
                vec![ last.clone() ],
            ])
            .into_connection();

        let salaries = current_salaries(&db, &employee_ids).await.unwrap();

        assert_eq!(salaries.len(), 2);
        assert_eq!(salaries[&last.employee_id], last);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].statements()[0].values.as_ref().unwrap().0.len(), BULK_ROWS + 1);
        assert_eq!(log[1].statements()[0].values.as_ref().unwrap().0.len(), 2);
    }
}
