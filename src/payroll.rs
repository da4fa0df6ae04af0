pub mod attendance;
pub mod bonus;
pub mod configuration;
pub mod employees;
pub mod encashment;
pub mod gratuity;
pub mod jobs;
pub mod recalculation;
pub mod run;
