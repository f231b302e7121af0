use crate::{
    error::{FeeError, Result},
    ledger::models::{year_of_semester, Amount, FeeRecord, FeeType, StudentFeeProfile},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A confirmed payment against one semester of one fee category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub semester: u32,
    pub fee_type: FeeType,
    pub amount: Amount,
    pub mode: String,
    pub reference: String,
}

/// Apply a confirmed payment to the matching fee record
pub fn record_payment<'a>(
    profile: &'a mut StudentFeeProfile,
    payment: &PaymentConfirmation,
) -> Result<&'a FeeRecord> {
    if payment.amount <= 0 {
        return Err(FeeError::InvalidArgument(format!(
            "payment amount must be positive (got {})",
            payment.amount
        )));
    }

    if payment.semester == 0 {
        return Err(FeeError::InvalidArgument("semester must start at 1".to_string()));
    }

    let usn = profile.usn.clone();
    let year = year_of_semester(payment.semester);

    let record = profile
        .record_mut(year, payment.semester, payment.fee_type)
        .ok_or_else(|| {
            FeeError::NotFound(format!(
                "no {} fee record for semester {} of {}",
                payment.fee_type, payment.semester, usn
            ))
        })?;

    let outstanding = record.outstanding();
    if payment.amount > outstanding {
        warn!(
            "Rejected overpayment of {} on {} sem {} for {} (outstanding {})",
            payment.amount, payment.fee_type, payment.semester, usn, outstanding
        );
        return Err(FeeError::InvalidArgument(format!(
            "payment of {} exceeds outstanding balance of {}",
            payment.amount, outstanding
        )));
    }

    record.apply_payment(payment.amount, &payment.mode, &payment.reference);

    info!(
        "Recorded {} payment of {} for {} sem {} ({}), status now {}",
        payment.fee_type, payment.amount, usn, payment.semester, payment.reference, record.status
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::FeeStatus;

    fn payment(semester: u32, amount: Amount) -> PaymentConfirmation {
        PaymentConfirmation {
            semester,
            fee_type: FeeType::College,
            amount,
            mode: "Online".to_string(),
            reference: format!("order_{}", amount),
        }
    }

    fn profile_with_record() -> StudentFeeProfile {
        let mut profile = StudentFeeProfile::new("1AB22EC007", "user-7", "Meera", 2);
        profile
            .fee_records
            .push(FeeRecord::new(2, 3, FeeType::College, 5000));
        profile
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut profile = profile_with_record();

        let record = record_payment(&mut profile, &payment(3, 2000)).unwrap();
        assert_eq!(record.status, FeeStatus::Partial);

        let record = record_payment(&mut profile, &payment(3, 3000)).unwrap();
        assert_eq!(record.status, FeeStatus::Paid);
        assert_eq!(record.amount_paid, 5000);
        assert_eq!(record.transactions.len(), 2);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let mut profile = profile_with_record();
        let err = record_payment(&mut profile, &payment(4, 100)).unwrap_err();
        assert!(matches!(err, FeeError::NotFound(_)));
    }

    #[test]
    fn test_invalid_amounts_are_rejected() {
        let mut profile = profile_with_record();

        for amount in [0, -50, 5001] {
            let err = record_payment(&mut profile, &payment(3, amount)).unwrap_err();
            assert!(matches!(err, FeeError::InvalidArgument(_)), "amount {}", amount);
        }
        assert!(profile.fee_records[0].transactions.is_empty());
    }
}
