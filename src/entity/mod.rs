pub mod prelude;

pub mod attendance;
pub mod bonus_configuration;
pub mod bonus_record;
pub mod bonus_summary;
pub mod employee;
pub mod gratuity_configuration;
pub mod gratuity_record;
pub mod leave_balance;
pub mod leave_encashment;
pub mod recalculation_log;
pub mod recalculation_rate_limit;
pub mod salary_component;
pub mod sea_orm_active_enums;
