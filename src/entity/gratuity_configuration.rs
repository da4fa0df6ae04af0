use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

use super::{salary_component::SalaryField, sea_orm_active_enums::YearRounding};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gratuity_configuration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub min_years: Decimal,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub payable_days: Decimal,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub month_days: Decimal,
    /// Only employees with an exit date are eligible
    pub exit_only: bool,
    pub year_rounding: YearRounding,
    #[sea_orm(column_type = "JsonBinary")]
    pub salary_components: SalaryFields,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct SalaryFields(pub Vec<SalaryField>);

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
