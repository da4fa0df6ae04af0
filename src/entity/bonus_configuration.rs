use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bonus_configuration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    /// Percentage of the clamped base salary
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub bonus_rate: Decimal,
    /// Highest base salary the rate is applied to
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub eligibility_cutoff: Decimal,
    /// Lowest base salary the rate is applied to
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub min_wages: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub min_bonus: Decimal,
    /// Zero means uncapped
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub max_bonus: Decimal,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
