pub use sea_orm_migration::prelude::*;

mod util;
mod m20250701_000001_init;
mod m20250701_000002_payroll;
mod m20250701_000003_generate_employees;

/// Schema migrations, safe to apply in every environment
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250701_000001_init::Migration),
            Box::new(m20250701_000002_payroll::Migration),
        ]
    }
}

/// Local development data, applied on top of [`Migrator`] through the `seed` binary
///
/// Keeps its own history table so the schema migrator never picks it up.
pub struct SeedMigrator;

#[async_trait::async_trait]
impl MigratorTrait for SeedMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250701_000003_generate_employees::Migration),
        ]
    }

    fn migration_table_name() -> DynIden {
        Alias::new("seaql_seed_migrations").into_iden()
    }
}
