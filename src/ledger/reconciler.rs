// src/ledger/reconciler.rs
use crate::{
    config::LedgerConfig,
    error::{FeeError, Result},
    ledger::models::{Amount, FeeRecord, FeeStatus, FeeType, StudentFeeProfile},
};
use tracing::{debug, info, warn};

/// Outcome of applying a category due to a profile
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The due was split across the two semesters of the current year
    Assigned {
        fee_type: FeeType,
        odd_semester: (u32, Amount),
        even_semester: (u32, Amount),
    },
    /// Every outstanding record of the category was marked paid
    Settled {
        fee_type: FeeType,
        records_cleared: usize,
        amount_settled: Amount,
    },
}

/// Turns due-amount changes into ledger entries
pub struct LedgerReconciler {
    config: LedgerConfig,
}

impl LedgerReconciler {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    /// Assign `new_due` to `fee_type` for the current year, or settle the
    /// category when `new_due` is zero
    ///
    /// The legacy top-level due of the category always takes `new_due`.
    pub fn apply_category_due(
        &self,
        profile: &mut StudentFeeProfile,
        fee_type: FeeType,
        new_due: Amount,
    ) -> Result<Reconciliation> {
        if new_due < 0 {
            warn!("Rejected negative {} due {} for {}", fee_type, new_due, profile.usn);
            return Err(FeeError::InvalidArgument(format!(
                "{} due cannot be negative (got {})",
                fee_type, new_due
            )));
        }

        if profile.current_year == 0 {
            return Err(FeeError::InvalidArgument(format!(
                "student {} has no current academic year",
                profile.usn
            )));
        }

        let outcome = if new_due > 0 {
            self.assign(profile, fee_type, new_due)
        } else {
            self.settle(profile, fee_type)
        };

        profile.set_legacy_due(fee_type, new_due);

        Ok(outcome)
    }

    fn assign(
        &self,
        profile: &mut StudentFeeProfile,
        fee_type: FeeType,
        new_due: Amount,
    ) -> Reconciliation {
        let year = profile.current_year;
        let (sem_a, sem_b) = profile.current_semesters();
        let (first, second) = split_due(new_due);

        upsert_record(profile, year, sem_a, fee_type, first);
        upsert_record(profile, year, sem_b, fee_type, second);

        info!(
            "Assigned {} due {} to {} (sem {}: {}, sem {}: {})",
            fee_type, new_due, profile.usn, sem_a, first, sem_b, second
        );

        Reconciliation::Assigned {
            fee_type,
            odd_semester: (sem_a, first),
            even_semester: (sem_b, second),
        }
    }

    fn settle(&self, profile: &mut StudentFeeProfile, fee_type: FeeType) -> Reconciliation {
        let department = self.config.department(fee_type);
        let mode = format!("{} Dept", department);
        let reference = format!("Marked as Paid by {} Dept", department);

        let mut records_cleared = 0;
        let mut amount_settled = 0;

        for record in profile
            .fee_records
            .iter_mut()
            .filter(|r| r.fee_type == fee_type && r.status != FeeStatus::Paid)
        {
            let paid_now = record.amount_due - record.amount_paid;

            if paid_now > 0 {
                record.apply_payment(paid_now, &mode, &reference);
                amount_settled += paid_now;
            } else {
                record.amount_paid = record.amount_due;
            }
            record.status = FeeStatus::Paid;
            records_cleared += 1;

            debug!(
                "Settled {} sem {} for {}: {} cleared",
                fee_type, record.semester, profile.usn, paid_now
            );
        }

        info!(
            "Marked {} fees paid for {}: {} records, {} settled by {} Dept",
            fee_type, profile.usn, records_cleared, amount_settled, department
        );

        Reconciliation::Settled {
            fee_type,
            records_cleared,
            amount_settled,
        }
    }
}

impl Default for LedgerReconciler {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

/// Split a due across two semesters, rounding the first half up
pub fn split_due(amount: Amount) -> (Amount, Amount) {
    let first = (amount + 1) / 2;
    (first, amount - first)
}

fn upsert_record(
    profile: &mut StudentFeeProfile,
    year: u32,
    semester: u32,
    fee_type: FeeType,
    amount_due: Amount,
) {
    match profile.record_mut(year, semester, fee_type) {
        Some(existing) => existing.set_amount_due(amount_due),
        None => profile
            .fee_records
            .push(FeeRecord::new(year, semester, fee_type, amount_due)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(year: u32) -> StudentFeeProfile {
        StudentFeeProfile::new("1AB21CS042", "user-42", "Ravi", year)
    }

    fn amounts(profile: &StudentFeeProfile, fee_type: FeeType) -> Vec<(u32, Amount)> {
        profile
            .fee_records
            .iter()
            .filter(|r| r.fee_type == fee_type)
            .map(|r| (r.semester, r.amount_due))
            .collect()
    }

    #[test]
    fn test_split_sums_exactly() {
        for amount in [0, 1, 2, 3, 999, 10_000, 10_001, 123_457] {
            let (a, b) = split_due(amount);
            assert_eq!(a + b, amount);
            assert!(a >= b && a - b <= 1);
        }
    }

    #[test]
    fn test_assign_creates_two_pending_records() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(2);

        let outcome = reconciler
            .apply_category_due(&mut profile, FeeType::College, 10_000)
            .unwrap();

        assert_eq!(
            outcome,
            Reconciliation::Assigned {
                fee_type: FeeType::College,
                odd_semester: (3, 5000),
                even_semester: (4, 5000),
            }
        );
        assert_eq!(amounts(&profile, FeeType::College), vec![(3, 5000), (4, 5000)]);
        assert!(profile
            .fee_records
            .iter()
            .all(|r| r.status == FeeStatus::Pending && r.transactions.is_empty()));
        assert_eq!(profile.college_fee_due, 10_000);
    }

    #[test]
    fn test_odd_amount_rounds_first_semester_up() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(1);

        reconciler
            .apply_category_due(&mut profile, FeeType::Transport, 2501)
            .unwrap();

        assert_eq!(amounts(&profile, FeeType::Transport), vec![(1, 1251), (2, 1250)]);
        assert_eq!(profile.transport_fee_due, 2501);
    }

    #[test]
    fn test_reassign_updates_in_place_and_keeps_payments() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(2);

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 10_000)
            .unwrap();
        profile
            .record_mut(2, 3, FeeType::College)
            .unwrap()
            .apply_payment(4000, "UPI", "pay_1");

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 6000)
            .unwrap();

        assert_eq!(profile.fee_records.len(), 2);
        let sem3 = profile.record(2, 3, FeeType::College).unwrap();
        assert_eq!(sem3.amount_due, 3000);
        assert_eq!(sem3.amount_paid, 4000);
        assert_eq!(sem3.status, FeeStatus::Paid);
        assert_eq!(sem3.transactions.len(), 1);

        let sem4 = profile.record(2, 4, FeeType::College).unwrap();
        assert_eq!(sem4.status, FeeStatus::Pending);
        assert_eq!(profile.college_fee_due, 6000);
    }

    #[test]
    fn test_reassign_over_paid_records_keeps_new_due() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(2);

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 10_000)
            .unwrap();
        for semester in [3, 4] {
            profile
                .record_mut(2, semester, FeeType::College)
                .unwrap()
                .apply_payment(5000, "Online", "order");
        }

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 8000)
            .unwrap();

        assert!(profile
            .current_year_records()
            .all(|r| r.status == FeeStatus::Paid));
        assert_eq!(profile.college_fee_due, 8000);
        assert_eq!(profile.legacy_due(FeeType::College), 8000);
    }

    #[test]
    fn test_categories_do_not_interfere() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(3);

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 80_000)
            .unwrap();
        reconciler
            .apply_category_due(&mut profile, FeeType::Transport, 12_000)
            .unwrap();
        reconciler
            .apply_category_due(&mut profile, FeeType::Transport, 0)
            .unwrap();

        assert_eq!(profile.fee_records.len(), 4);
        assert!(profile
            .fee_records
            .iter()
            .filter(|r| r.fee_type == FeeType::College)
            .all(|r| r.status == FeeStatus::Pending));
        assert_eq!(profile.college_fee_due, 80_000);
        assert_eq!(profile.transport_fee_due, 0);
    }

    #[test]
    fn test_settlement_clears_outstanding_balance() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(1);
        let mut record = FeeRecord::new(1, 1, FeeType::Transport, 2000);
        record.apply_payment(500, "Cash", "rcpt-9");
        profile.fee_records.push(record);
        profile.transport_fee_due = 2000;

        let outcome = reconciler
            .apply_category_due(&mut profile, FeeType::Transport, 0)
            .unwrap();

        assert_eq!(
            outcome,
            Reconciliation::Settled {
                fee_type: FeeType::Transport,
                records_cleared: 1,
                amount_settled: 1500,
            }
        );

        let record = &profile.fee_records[0];
        assert_eq!(record.amount_paid, 2000);
        assert_eq!(record.status, FeeStatus::Paid);
        assert_eq!(record.transactions.len(), 2);

        let settlement = record.transactions.last().unwrap();
        assert_eq!(settlement.amount, 1500);
        assert_eq!(settlement.mode, "Transport Dept");
        assert_eq!(settlement.reference, "Marked as Paid by Transport Dept");
        assert_eq!(profile.transport_fee_due, 0);
    }

    #[test]
    fn test_settlement_is_idempotent() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(2);

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 9000)
            .unwrap();
        reconciler
            .apply_category_due(&mut profile, FeeType::College, 0)
            .unwrap();
        let after_first = profile.clone();

        let second = reconciler
            .apply_category_due(&mut profile, FeeType::College, 0)
            .unwrap();

        assert_eq!(
            second,
            Reconciliation::Settled {
                fee_type: FeeType::College,
                records_cleared: 0,
                amount_settled: 0,
            }
        );
        assert_eq!(profile, after_first);
        assert_eq!(
            profile
                .fee_records
                .iter()
                .map(|r| r.transactions.len())
                .sum::<usize>(),
            2
        );
    }

    #[test]
    fn test_settlement_uses_configured_department() {
        let reconciler = LedgerReconciler::new(LedgerConfig::default());
        let mut profile = student(1);

        reconciler
            .apply_category_due(&mut profile, FeeType::College, 100)
            .unwrap();
        reconciler
            .apply_category_due(&mut profile, FeeType::College, 0)
            .unwrap();

        let tx = &profile.fee_records[0].transactions[0];
        assert_eq!(tx.mode, "Accounts Dept");
        assert_eq!(tx.reference, "Marked as Paid by Accounts Dept");
    }

    #[test]
    fn test_settlement_reaches_prior_years() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(1);

        reconciler
            .apply_category_due(&mut profile, FeeType::Transport, 3000)
            .unwrap();
        profile.current_year = 2;

        reconciler
            .apply_category_due(&mut profile, FeeType::Transport, 0)
            .unwrap();

        assert!(profile
            .fee_records
            .iter()
            .all(|r| r.year == 1 && r.status == FeeStatus::Paid));
    }

    #[test]
    fn test_negative_due_is_rejected_without_mutation() {
        let reconciler = LedgerReconciler::default();
        let mut profile = student(2);
        let before = profile.clone();

        let err = reconciler
            .apply_category_due(&mut profile, FeeType::College, -1)
            .unwrap_err();

        assert!(matches!(err, FeeError::InvalidArgument(_)));
        assert_eq!(profile, before);
    }
}
