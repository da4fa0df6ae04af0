use sea_orm_migration::{prelude::{extension::postgres::TypeDropStatement, *}, sea_orm::{ActiveEnum, DbBackend, DeriveActiveEnum, EnumIter, Schema}};

use crate::{setup_employee_fk, util::{default_table_statement, money, quantity, EmployeeColumn}};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(DbBackend::Postgres);

        manager.create_type(schema.create_enum_from_active_enum::<PayoutStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<SummaryStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<YearRounding>()).await?;

        let db = manager.get_connection();

        manager
            .create_table(default_table_statement()
                .table(BonusConfiguration::Table)
                .col(ColumnDef::new(BonusConfiguration::BonusRate)
                    .decimal_len(5, 2)
                    .not_null()
                    .check(Expr::col(BonusConfiguration::BonusRate).between(0, 100)))
                .col(money(BonusConfiguration::EligibilityCutoff))
                .col(money(BonusConfiguration::MinWages))
                .col(money(BonusConfiguration::MinBonus))
                .col(money(BonusConfiguration::MaxBonus))
                .col(ColumnDef::new(BonusConfiguration::IsActive)
                    .boolean()
                    .not_null()
                    .default(false))
                .take()
            ).await?;
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_bonus_configuration_active \
             ON bonus_configuration (is_active) WHERE is_active"
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(BonusRecord::Table)
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(BonusRecord::PaymentPeriod)
                    .text()
                    .not_null())
                .col(money(BonusRecord::BaseSalary))
                .col(money(BonusRecord::BonusAmount))
                .col(ColumnDef::new(BonusRecord::Status)
                    .custom(PayoutStatus::name())
                    .not_null())
                .col(ColumnDef::new(BonusRecord::ProcessedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;
        setup_employee_fk!(manager, BonusRecord::Table);
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_bonus_record_pending \
             ON bonus_record (payment_period, employee_id) WHERE status = 'pending'"
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(BonusSummary::Table)
                .col(ColumnDef::new(BonusSummary::PaymentPeriod)
                    .text()
                    .not_null())
                .col(ColumnDef::new(BonusSummary::Filters)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(BonusSummary::TotalEmployees)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(BonusSummary::EligibleEmployees)
                    .integer()
                    .not_null())
                .col(money(BonusSummary::TotalPayable))
                .col(ColumnDef::new(BonusSummary::Status)
                    .custom(SummaryStatus::name())
                    .not_null())
                .col(ColumnDef::new(BonusSummary::GeneratedAt)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(BonusSummary::ProcessedAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(BonusSummary::DeletedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(LeaveEncashment::Table)
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(LeaveEncashment::PaymentPeriod)
                    .text()
                    .not_null())
                .col(ColumnDef::new(LeaveEncashment::LeaveType)
                    .integer()
                    .not_null())
                .col(quantity(LeaveEncashment::BalanceDays))
                .col(quantity(LeaveEncashment::EncashDays))
                .col(money(LeaveEncashment::DailySalary))
                .col(money(LeaveEncashment::EncashAmount))
                .col(ColumnDef::new(LeaveEncashment::Processed)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(LeaveEncashment::ProcessedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;
        setup_employee_fk!(manager, LeaveEncashment::Table);
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_leave_encashment_unprocessed \
             ON leave_encashment (payment_period, employee_id) WHERE NOT processed"
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(GratuityConfiguration::Table)
                .col(quantity(GratuityConfiguration::MinYears))
                .col(quantity(GratuityConfiguration::PayableDays)
                    .default(15))
                .col(quantity(GratuityConfiguration::MonthDays)
                    .default(26)
                    .check(Expr::col(GratuityConfiguration::MonthDays).gt(0)))
                .col(ColumnDef::new(GratuityConfiguration::ExitOnly)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(GratuityConfiguration::YearRounding)
                    .custom(YearRounding::name())
                    .not_null())
                .col(ColumnDef::new(GratuityConfiguration::SalaryComponents)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(GratuityConfiguration::IsActive)
                    .boolean()
                    .not_null()
                    .default(false))
                .take()
            ).await?;
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_gratuity_configuration_active \
             ON gratuity_configuration (is_active) WHERE is_active"
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(GratuityRecord::Table)
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(GratuityRecord::JoiningDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(GratuityRecord::EndDate)
                    .date()
                    .not_null())
                .col(quantity(GratuityRecord::YearsOfService))
                .col(money(GratuityRecord::LastDrawnSalary))
                .col(money(GratuityRecord::GratuityAmount))
                .col(ColumnDef::new(GratuityRecord::Month)
                    .small_integer()
                    .not_null())
                .col(ColumnDef::new(GratuityRecord::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(GratuityRecord::Status)
                    .custom(PayoutStatus::name())
                    .not_null())
                .col(ColumnDef::new(GratuityRecord::ProcessedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;
        setup_employee_fk!(manager, GratuityRecord::Table);
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_gratuity_record_pending \
             ON gratuity_record (year, month, employee_id) WHERE status = 'pending'"
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(RecalculationLog::Table)
                .col(ColumnDef::new(RecalculationLog::DateFrom)
                    .date()
                    .not_null())
                .col(ColumnDef::new(RecalculationLog::DateTo)
                    .date()
                    .not_null())
                .col(ColumnDef::new(RecalculationLog::AllEmployees)
                    .boolean()
                    .not_null())
                .col(ColumnDef::new(EmployeeColumn::EmployeeId)
                    .uuid())
                .col(ColumnDef::new(RecalculationLog::Status)
                    .text()
                    .not_null())
                .col(ColumnDef::new(RecalculationLog::Progress)
                    .small_integer()
                    .not_null()
                    .default(0)
                    .check(Expr::col(RecalculationLog::Progress).between(0, 100)))
                .col(ColumnDef::new(RecalculationLog::RecordsProcessed)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(RecalculationLog::RecordsUpdated)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(RecalculationLog::StartedAt)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(RecalculationLog::CompletedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;
        setup_employee_fk!(manager, RecalculationLog::Table);

        manager
            .create_table(default_table_statement()
                .table(RecalculationRateLimit::Table)
                .col(ColumnDef::new(RecalculationRateLimit::JobId)
                    .uuid()
                    .not_null())
                .take()
            ).await?;

        manager
            .create_foreign_key(ForeignKeyCreateStatement::new()
                .from(RecalculationRateLimit::Table, RecalculationRateLimit::JobId)
                .to(RecalculationLog::Table, crate::util::DefaultColumn::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .take()
            ).await?;

        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("idx_recalculation_rate_limit_created_at")
                .table(RecalculationRateLimit::Table)
                .col(crate::util::DefaultColumn::CreatedAt)
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            RecalculationRateLimit::Table.into_iden(),
            RecalculationLog::Table.into_iden(),
            GratuityRecord::Table.into_iden(),
            GratuityConfiguration::Table.into_iden(),
            LeaveEncashment::Table.into_iden(),
            BonusSummary::Table.into_iden(),
            BonusRecord::Table.into_iden(),
            BonusConfiguration::Table.into_iden(),
        ] {
            manager.drop_table(
                TableDropStatement::new()
                    .table(table)
                    .take()
            ).await?;
        }

        for name in [YearRounding::name(), SummaryStatus::name(), PayoutStatus::name()] {
            manager
                .drop_type(
                    TypeDropStatement::new()
                        .name(name)
                        .to_owned()
                ).await?;
        }

        Ok(())
    }
}

#[derive(Iden)]
enum BonusConfiguration {
    Table,
    BonusRate,
    EligibilityCutoff,
    MinWages,
    MinBonus,
    MaxBonus,
    IsActive,
}

#[derive(Iden)]
enum BonusRecord {
    Table,
    PaymentPeriod,
    BaseSalary,
    BonusAmount,
    Status,
    ProcessedAt,
}

#[derive(Iden)]
enum BonusSummary {
    Table,
    PaymentPeriod,
    Filters,
    TotalEmployees,
    EligibleEmployees,
    TotalPayable,
    Status,
    GeneratedAt,
    ProcessedAt,
    DeletedAt,
}

#[derive(Iden)]
enum LeaveEncashment {
    Table,
    PaymentPeriod,
    LeaveType,
    BalanceDays,
    EncashDays,
    DailySalary,
    EncashAmount,
    Processed,
    ProcessedAt,
}

#[derive(Iden)]
enum GratuityConfiguration {
    Table,
    MinYears,
    PayableDays,
    MonthDays,
    ExitOnly,
    YearRounding,
    SalaryComponents,
    IsActive,
}

#[derive(Iden)]
enum GratuityRecord {
    Table,
    JoiningDate,
    EndDate,
    YearsOfService,
    LastDrawnSalary,
    GratuityAmount,
    Month,
    Year,
    Status,
    ProcessedAt,
}

#[derive(Iden)]
enum RecalculationLog {
    Table,
    DateFrom,
    DateTo,
    AllEmployees,
    Status,
    Progress,
    RecordsProcessed,
    RecordsUpdated,
    StartedAt,
    CompletedAt,
}

#[derive(Iden)]
enum RecalculationRateLimit {
    Table,
    JobId,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payout_status")]
enum PayoutStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processed")]
    Processed,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "summary_status")]
enum SummaryStatus {
    #[sea_orm(string_value = "generated")]
    Generated,
    #[sea_orm(string_value = "processed")]
    Processed,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "year_rounding")]
enum YearRounding {
    #[sea_orm(string_value = "round_down")]
    RoundDown,
    #[sea_orm(string_value = "round_up")]
    RoundUp,
    #[sea_orm(string_value = "round_nearest")]
    RoundNearest,
    #[sea_orm(string_value = "raw_2dp")]
    Raw2dp,
}
