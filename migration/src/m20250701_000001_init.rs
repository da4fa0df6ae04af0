use sea_orm_migration::{prelude::{extension::postgres::TypeDropStatement, *}, sea_orm::{ActiveEnum, DbBackend, DeriveActiveEnum, EnumIter, Schema}};

use crate::{setup_employee_fk, util::{default_table_statement, money, quantity, EmployeeColumn}};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(DbBackend::Postgres);

        manager
            .create_type(
                schema.create_enum_from_active_enum::<AttendanceStatus>()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Employee::Table)
                .col(ColumnDef::new(Employee::Code)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Employee::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::LocationId)
                    .uuid())
                .col(ColumnDef::new(Employee::DepartmentId)
                    .uuid())
                .col(ColumnDef::new(Employee::CostCenterId)
                    .uuid())
                .col(money(Employee::DailySalary))
                .col(ColumnDef::new(Employee::JoiningDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Employee::ExitDate)
                    .date())
                .col(ColumnDef::new(Employee::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(SalaryComponent::Table)
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid()
                    .not_null())
                .col(money(SalaryComponent::Basic))
                .col(money(SalaryComponent::Hra))
                .col(money(SalaryComponent::Special))
                .col(money(SalaryComponent::Medical))
                .col(money(SalaryComponent::Conveyance))
                .col(money(SalaryComponent::Telephone))
                .col(ColumnDef::new(SalaryComponent::Month)
                    .small_integer()
                    .not_null())
                .col(ColumnDef::new(SalaryComponent::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(SalaryComponent::EffectiveFrom)
                    .date()
                    .not_null())
                .col(ColumnDef::new(SalaryComponent::IsCurrent)
                    .boolean()
                    .not_null()
                    .default(false))
                .take()
            ).await?;
        setup_employee_fk!(manager, SalaryComponent::Table);

        // At most one current salary per employee
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_salary_component_current \
                 ON salary_component (employee_id) WHERE is_current"
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Attendance::Table)
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Attendance::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Attendance::CheckIn)
                    .time())
                .col(ColumnDef::new(Attendance::CheckOut)
                    .time())
                .col(quantity(Attendance::HoursWorked))
                .col(ColumnDef::new(Attendance::Status)
                    .custom(AttendanceStatus::name())
                    .not_null())
                .col(ColumnDef::new(Attendance::IsManual)
                    .boolean()
                    .not_null()
                    .default(false))
                .take()
            ).await?;
        setup_employee_fk!(manager, Attendance::Table);

        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("idx_attendance_employee_date")
                .table(Attendance::Table)
                .col(EmployeeColumn::EmployeeId)
                .col(Attendance::Date)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(LeaveBalance::Table)
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(LeaveBalance::LeaveType)
                    .integer()
                    .not_null())
                .col(quantity(LeaveBalance::BalanceDays))
                .col(ColumnDef::new(LeaveBalance::BalanceAsOn)
                    .date()
                    .not_null())
                .take()
            ).await?;
        setup_employee_fk!(manager, LeaveBalance::Table);

        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("idx_leave_balance_lookup")
                .table(LeaveBalance::Table)
                .col(EmployeeColumn::EmployeeId)
                .col(LeaveBalance::LeaveType)
                .col(LeaveBalance::BalanceAsOn)
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            LeaveBalance::Table.into_iden(),
            Attendance::Table.into_iden(),
            SalaryComponent::Table.into_iden(),
            Employee::Table.into_iden(),
        ] {
            manager.drop_table(
                TableDropStatement::new()
                    .table(table)
                    .take()
            ).await?;
        }

        manager
            .drop_type(
                TypeDropStatement::new()
                    .name(AttendanceStatus::name())
                    .to_owned()
            ).await?;

        Ok(())
    }
}

#[derive(Iden)]
pub(crate) enum Employee {
    Table,
    Code,
    Name,
    LocationId,
    DepartmentId,
    CostCenterId,
    DailySalary,
    JoiningDate,
    ExitDate,
    IsActive,
}

#[derive(Iden)]
pub(crate) enum SalaryComponent {
    Table,
    Basic,
    Hra,
    Special,
    Medical,
    Conveyance,
    Telephone,
    Month,
    Year,
    EffectiveFrom,
    IsCurrent,
}

#[derive(Iden)]
enum Attendance {
    Table,
    Date,
    CheckIn,
    CheckOut,
    HoursWorked,
    Status,
    IsManual,
}

#[derive(Iden)]
pub(crate) enum LeaveBalance {
    Table,
    LeaveType,
    BalanceDays,
    BalanceAsOn,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
enum AttendanceStatus {
    #[sea_orm(string_value = "Present")]
    Present,
    #[sea_orm(string_value = "Half Day")]
    HalfDay,
    #[sea_orm(string_value = "Absent")]
    Absent,
}
