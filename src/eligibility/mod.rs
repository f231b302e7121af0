pub mod evaluator;
pub mod rules;

pub use evaluator::{
    EligibilityEvaluator, EligibilityResult, PaymentProgress, StudentSnapshot,
    EVEN_SEM_THRESHOLD, ODD_SEM_THRESHOLD,
};
pub use rules::{ReasonLog, Rule, RuleOutcome};
