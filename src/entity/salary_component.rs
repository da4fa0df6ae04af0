use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "salary_component")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub employee_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub basic: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hra: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub special: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub medical: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub conveyance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub telephone: Decimal,
    pub month: i16,
    pub year: i32,
    pub effective_from: Date,
    pub is_current: bool,
}

impl Model {
    pub fn component(&self, field: SalaryField) -> Decimal {
        match field {
            SalaryField::Basic => self.basic,
            SalaryField::Hra => self.hra,
            SalaryField::Special => self.special,
            SalaryField::Medical => self.medical,
            SalaryField::Conveyance => self.conveyance,
            SalaryField::Telephone => self.telephone,
        }
    }
}

/// Money columns of a salary row that can take part in a base salary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryField {
    Basic,
    Hra,
    Special,
    Medical,
    Conveyance,
    Telephone,
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
