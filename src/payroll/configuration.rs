use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{consts::{DEFAULT_BONUS_RATE, DEFAULT_ELIGIBILITY_CUTOFF, DEFAULT_GRATUITY_MIN_YEARS, DEFAULT_MIN_WAGES, DEFAULT_MONTH_DAYS, DEFAULT_PAYABLE_DAYS}, entity::{bonus_configuration, gratuity_configuration::{self, SalaryFields}, prelude::*, salary_component::SalaryField, sea_orm_active_enums::YearRounding}, error::PayrollError, utils};

/// Statutory bonus formula parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusSettings {
    /// Percentage of the clamped base salary
    pub bonus_rate: Decimal,
    pub eligibility_cutoff: Decimal,
    pub min_wages: Decimal,
    #[serde(default)]
    pub min_bonus: Decimal,
    /// Zero leaves the bonus uncapped
    #[serde(default)]
    pub max_bonus: Decimal,
}

impl Default for BonusSettings {
    fn default() -> Self {
        Self {
            bonus_rate: DEFAULT_BONUS_RATE,
            eligibility_cutoff: DEFAULT_ELIGIBILITY_CUTOFF,
            min_wages: DEFAULT_MIN_WAGES,
            min_bonus: Decimal::ZERO,
            max_bonus: Decimal::ZERO,
        }
    }
}

impl BonusSettings {
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.bonus_rate < Decimal::ZERO || self.bonus_rate > Decimal::ONE_HUNDRED {
            return Err(PayrollError::validation("`bonus_rate` must be between 0 and 100"));
        }

        let amounts = [
            ("eligibility_cutoff", self.eligibility_cutoff),
            ("min_wages", self.min_wages),
            ("min_bonus", self.min_bonus),
            ("max_bonus", self.max_bonus),
        ];
        if let Some((name, _)) = amounts.iter().find(|(_, amount)| *amount < Decimal::ZERO) {
            return Err(PayrollError::validation(format!("`{name}` must not be negative")));
        }

        if self.min_wages > self.eligibility_cutoff {
            return Err(PayrollError::validation("`min_wages` must not exceed `eligibility_cutoff`"));
        }
        if self.max_bonus > Decimal::ZERO && self.min_bonus > self.max_bonus {
            return Err(PayrollError::validation("`min_bonus` must not exceed `max_bonus`"));
        }

        Ok(())
    }
}

impl From<&bonus_configuration::Model> for BonusSettings {
    fn from(config: &bonus_configuration::Model) -> Self {
        Self {
            bonus_rate: config.bonus_rate,
            eligibility_cutoff: config.eligibility_cutoff,
            min_wages: config.min_wages,
            min_bonus: config.min_bonus,
            max_bonus: config.max_bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuitySettings {
    pub min_years: Decimal,
    pub payable_days: Decimal,
    pub month_days: Decimal,
    #[serde(default)]
    pub exit_only: bool,
    pub year_rounding: YearRounding,
    pub salary_components: Vec<SalaryField>,
}

impl Default for GratuitySettings {
    fn default() -> Self {
        Self {
            min_years: DEFAULT_GRATUITY_MIN_YEARS,
            payable_days: DEFAULT_PAYABLE_DAYS,
            month_days: DEFAULT_MONTH_DAYS,
            exit_only: false,
            year_rounding: YearRounding::RoundDown,
            salary_components: vec![SalaryField::Basic],
        }
    }
}

impl GratuitySettings {
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.month_days <= Decimal::ZERO {
            return Err(PayrollError::validation("`month_days` must be positive"));
        }
        if self.payable_days < Decimal::ZERO {
            return Err(PayrollError::validation("`payable_days` must not be negative"));
        }
        if self.min_years < Decimal::ZERO {
            return Err(PayrollError::validation("`min_years` must not be negative"));
        }
        if self.salary_components.is_empty() {
            return Err(PayrollError::validation("`salary_components` must select at least one component"));
        }

        Ok(())
    }
}

impl From<&gratuity_configuration::Model> for GratuitySettings {
    fn from(config: &gratuity_configuration::Model) -> Self {
        Self {
            min_years: config.min_years,
            payable_days: config.payable_days,
            month_days: config.month_days,
            exit_only: config.exit_only,
            year_rounding: config.year_rounding,
            salary_components: config.salary_components.0.clone(),
        }
    }
}

/// The active bonus configuration, saving the statutory default on first use
pub async fn active_bonus(db: &DatabaseConnection) -> Result<bonus_configuration::Model, PayrollError> {
    if let Some(config) = find_active_bonus(db).await? {
        return Ok(config);
    }

    match insert_bonus(db, &BonusSettings::default()).await {
        Ok(config) => {
            info!(config_id = %config.id, "saved default bonus configuration");
            Ok(config)
        },
        // Someone else saved one in between
        Err(PayrollError::Conflict(_)) => find_active_bonus(db).await?
            .ok_or_else(|| PayrollError::not_found("no active bonus configuration")),
        Err(e) => Err(e),
    }
}

pub async fn replace_bonus(db: &DatabaseConnection, settings: &BonusSettings) -> Result<bonus_configuration::Model, PayrollError> {
    settings.validate()?;

    let txn = db.begin().await?;

    BonusConfiguration::update_many()
        .set(bonus_configuration::ActiveModel {
            updated_at: Set(utils::now()),
            is_active: Set(false),
            ..Default::default()
        })
        .filter(bonus_configuration::Column::IsActive.eq(true))
        .exec(&txn).await?;

    let config = insert_bonus(&txn, settings).await?;
    txn.commit().await?;

    info!(config_id = %config.id, bonus_rate = %config.bonus_rate, "bonus configuration replaced");

    Ok(config)
}

async fn find_active_bonus<C: ConnectionTrait>(db: &C) -> Result<Option<bonus_configuration::Model>, PayrollError> {
    let config = BonusConfiguration::find()
        .filter(bonus_configuration::Column::IsActive.eq(true))
        .one(db).await?;

    Ok(config)
}

async fn insert_bonus<C: ConnectionTrait>(db: &C, settings: &BonusSettings) -> Result<bonus_configuration::Model, PayrollError> {
    let now = utils::now();

    let config = BonusConfiguration::insert(bonus_configuration::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        bonus_rate: Set(settings.bonus_rate),
        eligibility_cutoff: Set(settings.eligibility_cutoff),
        min_wages: Set(settings.min_wages),
        min_bonus: Set(settings.min_bonus),
        max_bonus: Set(settings.max_bonus),
        is_active: Set(true),
        ..Default::default()
    }).exec_with_returning(db).await?;

    Ok(config)
}

/// The active gratuity configuration, saving the default on first use
pub async fn active_gratuity(db: &DatabaseConnection) -> Result<gratuity_configuration::Model, PayrollError> {
    if let Some(config) = find_active_gratuity(db).await? {
        return Ok(config);
    }

    match insert_gratuity(db, &GratuitySettings::default()).await {
        Ok(config) => {
            info!(config_id = %config.id, "saved default gratuity configuration");
            Ok(config)
        },
        Err(PayrollError::Conflict(_)) => find_active_gratuity(db).await?
            .ok_or_else(|| PayrollError::not_found("no active gratuity configuration")),
        Err(e) => Err(e),
    }
}

pub async fn replace_gratuity(db: &DatabaseConnection, settings: &GratuitySettings) -> Result<gratuity_configuration::Model, PayrollError> {
    settings.validate()?;

    let txn = db.begin().await?;

    GratuityConfiguration::update_many()
        .set(gratuity_configuration::ActiveModel {
            updated_at: Set(utils::now()),
            is_active: Set(false),
            ..Default::default()
        })
        .filter(gratuity_configuration::Column::IsActive.eq(true))
        .exec(&txn).await?;

    let config = insert_gratuity(&txn, settings).await?;
    txn.commit().await?;

    info!(config_id = %config.id, year_rounding = ?config.year_rounding, "gratuity configuration replaced");

    Ok(config)
}

async fn find_active_gratuity<C: ConnectionTrait>(db: &C) -> Result<Option<gratuity_configuration::Model>, PayrollError> {
    let config = GratuityConfiguration::find()
        .filter(gratuity_configuration::Column::IsActive.eq(true))
        .one(db).await?;

    Ok(config)
}

async fn insert_gratuity<C: ConnectionTrait>(db: &C, settings: &GratuitySettings) -> Result<gratuity_configuration::Model, PayrollError> {
    let now = utils::now();

    let config = GratuityConfiguration::insert(gratuity_configuration::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        min_years: Set(settings.min_years),
        payable_days: Set(settings.payable_days),
        month_days: Set(settings.month_days),
        exit_only: Set(settings.exit_only),
        year_rounding: Set(settings.year_rounding),
        salary_components: Set(SalaryFields(settings.salary_components.clone())),
        is_active: Set(true),
        ..Default::default()
    }).exec_with_returning(db).await?;

    Ok(config)
}
