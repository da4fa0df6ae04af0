use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leave_encashment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub employee_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub payment_period: String,
    pub leave_type: i32,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub balance_days: Decimal,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub encash_days: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub daily_salary: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub encash_amount: Decimal,
    pub processed: bool,
    pub processed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Employee,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
