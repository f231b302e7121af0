pub mod models;
pub mod payments;
pub mod reconciler;

pub use models::{
    Amount, FeeRecord, FeeStatus, FeeType, StudentFeeProfile, StudentStatus, Transaction,
};
pub use payments::{record_payment, PaymentConfirmation};
pub use reconciler::{split_due, LedgerReconciler, Reconciliation};
