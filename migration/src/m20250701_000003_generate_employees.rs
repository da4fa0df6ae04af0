use sea_orm_migration::prelude::*;

use crate::m20250701_000001_init::{Employee, LeaveBalance, SalaryComponent};

/// Earned leave, the type encashment runs are usually generated for
const EARNED_LEAVE: i32 = 7;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let time = Expr::val("2025-07-01T06:58:41.474Z").cast_as("timestamptz");
        let locations = ["a1", "a2", "a3"].map(|suffix| format!("{:0>32}", suffix));

        // Creates 100 employees, each with a current salary and a leave balance
        for i in 1..=100 {
            let employee_id = Expr::val(format!("{:032x}", i as u128)).cast_as("uuid");
            let location_id = Expr::val(locations[i % locations.len()].clone()).cast_as("uuid");
            let joining_year = rand::random_range(2012..=2024);
            let joining_date = Expr::val(format!("{joining_year}-{:02}-01", rand::random_range(1..=12))).cast_as("date");

            let basic: i64 = rand::random_range(8_000..=40_000);
            let hra = basic / 2;
            let special: i64 = rand::random_range(0..=10_000);
            let daily_salary = (basic + hra + special) / 26;

            manager
                .exec_stmt(Query::insert()
                    .into_table(Employee::Table)
                    .columns(["id", "created_at", "updated_at", "code", "name", "location_id", "daily_salary", "joining_date", "is_active"])
                    .values_panic([employee_id.clone(), time.clone(), time.clone(), format!("EMP-{i:04}").into(), format!("Employee {i}").into(), location_id, daily_salary.into(), joining_date, true.into()])
                    .to_owned()
            ).await?;

            manager
                .exec_stmt(Query::insert()
                    .into_table(SalaryComponent::Table)
                    .columns(["created_at", "updated_at", "employee_id", "basic", "hra", "special", "medical", "conveyance", "telephone", "month", "year", "effective_from", "is_current"])
                    .values_panic([time.clone(), time.clone(), employee_id.clone(), basic.into(), hra.into(), special.into(), 1_250.into(), 1_600.into(), 500.into(), 7.into(), 2025.into(), Expr::val("2025-07-01").cast_as("date"), true.into()])
                    .to_owned()
            ).await?;

            let balance_days: i32 = rand::random_range(0..=45);

            manager
                .exec_stmt(Query::insert()
                    .into_table(LeaveBalance::Table)
                    .columns(["created_at", "updated_at", "employee_id", "leave_type", "balance_days", "balance_as_on"])
                    .values_panic([time.clone(), time.clone(), employee_id, EARNED_LEAVE.into(), balance_days.into(), Expr::val("2025-06-30").cast_as("date")])
                    .to_owned()
            ).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Salary components and leave balances cascade with the employee
        for i in 1..=100 {
            let uuid = format!("{:032x}", i as u128);

            manager
                .exec_stmt(Query::delete()
                    .from_table(Employee::Table)
                    .and_where(Expr::col("id").eq(Expr::val(uuid).cast_as("uuid")))
                    .to_owned()
            ).await?;
        }

        Ok(())
    }
}
