use sea_orm_migration::prelude::*;

pub(crate) fn default_table_statement() -> TableCreateStatement {
    TableCreateStatement::new()
        .if_not_exists()
        .col(ColumnDef::new(DefaultColumn::Id)
            .uuid()
            .primary_key()
            .default(Expr::cust("GEN_RANDOM_UUID()"))
            .take())
        .col(ColumnDef::new(DefaultColumn::CreatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .take())
        .col(ColumnDef::new(DefaultColumn::UpdatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .take())
        .take()
}

#[derive(DeriveIden)]
pub(crate) enum DefaultColumn {
    Id,
    CreatedAt,
    UpdatedAt,
}

/// `NUMERIC(12, 2)` column for money amounts, never negative
pub(crate) fn money<T: IntoIden>(name: T) -> ColumnDef {
    let name = name.into_iden();

    ColumnDef::new(name.clone())
        .decimal_len(12, 2)
        .not_null()
        .default(0)
        .check(Expr::col(name).gte(0))
        .take()
}

/// `NUMERIC(8, 2)` column for day and year counts
pub(crate) fn quantity<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .decimal_len(8, 2)
        .not_null()
        .default(0)
        .take()
}

/// Table must carry an `employee_id` uuid column
///
/// # Example
///
/// ```rs
/// manager
///     .create_table(default_table_statement()
///         .table(LeaveBalance::Table)
///         .col(ColumnDef::new(EmployeeColumn::EmployeeId)
///             .uuid()
///             .not_null())
///         .take()
///     ).await?;
/// setup_employee_fk!(manager, LeaveBalance::Table);
/// ```
#[macro_export]
macro_rules! setup_employee_fk {
    ($m:expr,$t:expr) => {{
        use crate::util::*;
        use crate::m20250701_000001_init::Employee;

        $m.create_foreign_key(ForeignKeyCreateStatement::new()
                .from($t, EmployeeColumn::EmployeeId)
                .to(Employee::Table, DefaultColumn::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::Cascade)
                .take()
        ).await?;
    }};
}

#[derive(DeriveIden)]
pub(crate) enum EmployeeColumn {
    EmployeeId,
}
