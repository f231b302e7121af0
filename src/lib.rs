pub mod cli;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod service;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use eligibility::{EligibilityEvaluator, EligibilityResult};
pub use error::{FeeError, Result};
pub use ledger::{LedgerReconciler, StudentFeeProfile};
pub use service::FeeService;
