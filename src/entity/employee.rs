use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text", unique)]
    pub code: String,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub location_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub cost_center_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub daily_salary: Decimal,
    pub joining_date: Date,
    pub exit_date: Option<Date>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
    #[sea_orm(has_many = "super::salary_component::Entity")]
    SalaryComponent,
    #[sea_orm(has_many = "super::leave_balance::Entity")]
    LeaveBalance,
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl Related<super::salary_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalaryComponent.def()
    }
}

impl Related<super::leave_balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeaveBalance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
