pub use super::attendance::Entity as Attendance;
pub use super::bonus_configuration::Entity as BonusConfiguration;
pub use super::bonus_record::Entity as BonusRecord;
pub use super::bonus_summary::Entity as BonusSummary;
pub use super::employee::Entity as Employee;
pub use super::gratuity_configuration::Entity as GratuityConfiguration;
pub use super::gratuity_record::Entity as GratuityRecord;
pub use super::leave_balance::Entity as LeaveBalance;
pub use super::leave_encashment::Entity as LeaveEncashment;
pub use super::recalculation_log::Entity as RecalculationLog;
pub use super::recalculation_rate_limit::Entity as RecalculationRateLimit;
pub use super::salary_component::Entity as SalaryComponent;
