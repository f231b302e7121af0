use serde::Deserialize;

use crate::eligibility::{EVEN_SEM_THRESHOLD, ODD_SEM_THRESHOLD};
use crate::ledger::FeeType;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub eligibility: EligibilityConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "fee_ledger.db".to_string(),
        }
    }
}

/// Clearance percentages required per semester type
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EligibilityConfig {
    #[serde(default = "default_odd_threshold")]
    pub odd_sem_threshold: f64,
    #[serde(default = "default_even_threshold")]
    pub even_sem_threshold: f64,
}

fn default_odd_threshold() -> f64 {
    ODD_SEM_THRESHOLD
}

fn default_even_threshold() -> f64 {
    EVEN_SEM_THRESHOLD
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            odd_sem_threshold: ODD_SEM_THRESHOLD,
            even_sem_threshold: EVEN_SEM_THRESHOLD,
        }
    }
}

/// Department names used when a category is settled administratively
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "default_college_department")]
    pub college_department: String,
    #[serde(default = "default_transport_department")]
    pub transport_department: String,
}

fn default_college_department() -> String {
    "Accounts".to_string()
}

fn default_transport_department() -> String {
    "Transport".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            college_department: default_college_department(),
            transport_department: default_transport_department(),
        }
    }
}

impl LedgerConfig {
    pub fn department(&self, fee_type: FeeType) -> &str {
        match fee_type {
            FeeType::College => &self.college_department,
            FeeType::Transport => &self.transport_department,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("FEE_LEDGER").separator("__"))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that could never be met or that invert the odd/even ordering
    pub fn validate(&self) -> anyhow::Result<()> {
        let e = &self.eligibility;

        for (name, value) in [
            ("odd_sem_threshold", e.odd_sem_threshold),
            ("even_sem_threshold", e.even_sem_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("{} must be between 0 and 100, got {}", name, value);
            }
        }

        if e.odd_sem_threshold > e.even_sem_threshold {
            anyhow::bail!(
                "odd_sem_threshold ({}) cannot exceed even_sem_threshold ({})",
                e.odd_sem_threshold,
                e.even_sem_threshold
            );
        }

        if self.ledger.college_department.trim().is_empty()
            || self.ledger.transport_department.trim().is_empty()
        {
            anyhow::bail!("department names cannot be empty");
        }

        Ok(())
    }
}
