use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One attendance recalculation job
///
/// `status` is `started`, `completed` or `failed: <reason>`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recalculation_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub date_from: Date,
    pub date_to: Date,
    pub all_employees: bool,
    pub employee_id: Option<Uuid>,
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub progress: i16,
    pub records_processed: i32,
    pub records_updated: i32,
    pub started_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
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
