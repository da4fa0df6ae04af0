use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PayoutStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gratuity_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub employee_id: Uuid,
    pub joining_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub years_of_service: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub last_drawn_salary: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub gratuity_amount: Decimal,
    pub month: i16,
    pub year: i32,
    pub status: PayoutStatus,
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
