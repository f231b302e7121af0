use serde::Serialize;
use tracing::debug;

use crate::{
    config::EligibilityConfig,
    eligibility::rules::{ReasonLog, Rule, RuleOutcome},
    ledger::{Amount, FeeType, StudentFeeProfile, StudentStatus},
};

/// Minimum percentage of the year's fees paid to sit odd semester exams
pub const ODD_SEM_THRESHOLD: f64 = 50.0;

/// Even semester exams need the year fully paid; the target is 100% but the
/// comparison allows for floating point error just below it
pub const EVEN_SEM_THRESHOLD: f64 = 99.9;

/// Read-only view of the student shown next to the decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSnapshot {
    pub usn: String,
    pub name: String,
    pub college_fee_due: Amount,
    pub transport_fee_due: Amount,
    pub last_sem_dues: Amount,
    pub percentage_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub eligible_for_odd_sem: bool,
    pub eligible_for_even_sem: bool,
    pub reasons: Vec<String>,
    pub percentage_paid: f64,
    pub rules: Vec<RuleOutcome>,
    pub student: StudentSnapshot,
}

/// Totals the evaluator works from, after the legacy fallback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentProgress {
    pub total_due: Amount,
    pub total_paid: Amount,
    pub percentage_paid: f64,
}

impl PaymentProgress {
    pub fn of(profile: &StudentFeeProfile) -> Self {
        let (total_due, total_paid) = profile
            .current_year_records()
            .filter(|r| FeeType::ALL.contains(&r.fee_type))
            .fold((0, 0), |(due, paid), r| (due + r.amount_due, paid + r.amount_paid));

        let legacy_due: Amount = FeeType::ALL.iter().map(|t| profile.legacy_due(*t)).sum();

        // No ledger entries for the year yet: fall back to the top-level dues
        let (effective_due, effective_paid) = if total_due > 0 {
            (total_due, total_paid)
        } else {
            (legacy_due, 0)
        };

        let percentage_paid = if effective_due > 0 {
            (effective_paid as f64 / effective_due as f64 * 100.0).clamp(0.0, 100.0)
        } else if legacy_due == 0 {
            100.0
        } else {
            0.0
        };

        Self {
            total_due: effective_due,
            total_paid: effective_paid,
            percentage_paid,
        }
    }
}

pub struct EligibilityEvaluator {
    config: EligibilityConfig,
}

impl EligibilityEvaluator {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    /// Decide exam eligibility from the ledger and the administrative flags
    ///
    /// Rules run in a fixed order: student status, odd semester threshold,
    /// even semester threshold, administrative override, prior dues block.
    /// The override replaces every earlier reason; the prior dues block is
    /// applied after it and can only take eligibility away.
    pub fn evaluate(&self, profile: &StudentFeeProfile) -> EligibilityResult {
        let mut log = ReasonLog::new();

        // Recorded for the caller, does not gate eligibility on its own
        if profile.status != StudentStatus::Active {
            log.fail(
                Rule::StudentStatus,
                format!("Student status is {}", profile.status),
            );
        } else {
            log.pass(Rule::StudentStatus);
        }

        let progress = PaymentProgress::of(profile);
        let percentage_paid = progress.percentage_paid;

        let mut eligible_for_odd_sem = percentage_paid >= self.config.odd_sem_threshold;
        if eligible_for_odd_sem {
            log.pass(Rule::OddSemester);
        } else {
            log.fail(
                Rule::OddSemester,
                format!(
                    "Odd Sem Eligibility: Paid {:.1}% (Need {}%)",
                    percentage_paid, self.config.odd_sem_threshold
                ),
            );
        }

        let mut eligible_for_even_sem = percentage_paid >= self.config.even_sem_threshold;
        if eligible_for_even_sem {
            log.pass(Rule::EvenSemester);
        } else if eligible_for_odd_sem {
            log.fail(
                Rule::EvenSemester,
                format!("Even Sem Eligibility: Paid {:.1}% (Need 100%)", percentage_paid),
            );
        } else {
            log.fail_silently(Rule::EvenSemester);
        }

        match profile.eligibility_override {
            Some(true) => {
                eligible_for_odd_sem = true;
                eligible_for_even_sem = true;
                log.supersede(Rule::Override, true, "Administratively Overridden (Eligible)");
            }
            Some(false) => {
                eligible_for_odd_sem = false;
                eligible_for_even_sem = false;
                log.supersede(
                    Rule::Override,
                    false,
                    "Administratively Overridden (Ineligible)",
                );
            }
            None => {}
        }

        let mut is_eligible = eligible_for_odd_sem;

        if profile.last_sem_dues > 0 {
            is_eligible = false;
            eligible_for_odd_sem = false;
            eligible_for_even_sem = false;
            log.fail(
                Rule::LastSemesterDues,
                format!("Pending Last Semester Dues: {}", profile.last_sem_dues),
            );
        }

        debug!(
            "Eligibility for {}: {} of {} paid ({:.1}%), odd={}, even={}, override={:?}, last_sem_dues={}",
            profile.usn,
            progress.total_paid,
            progress.total_due,
            percentage_paid,
            eligible_for_odd_sem,
            eligible_for_even_sem,
            profile.eligibility_override,
            profile.last_sem_dues
        );

        EligibilityResult {
            is_eligible,
            eligible_for_odd_sem,
            eligible_for_even_sem,
            reasons: log.reasons(),
            percentage_paid,
            rules: log.into_outcomes(),
            student: StudentSnapshot {
                usn: profile.usn.clone(),
                name: profile.name.clone(),
                college_fee_due: profile.college_fee_due,
                transport_fee_due: profile.transport_fee_due,
                last_sem_dues: profile.last_sem_dues,
                percentage_paid,
            },
        }
    }
}

impl Default for EligibilityEvaluator {
    fn default() -> Self {
        Self::new(EligibilityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FeeRecord, LedgerReconciler};

    fn student() -> StudentFeeProfile {
        StudentFeeProfile::new("1AB21ME013", "user-13", "Kiran", 2)
    }

    fn with_college_due(amount: Amount) -> StudentFeeProfile {
        let mut profile = student();
        LedgerReconciler::default()
            .apply_category_due(&mut profile, FeeType::College, amount)
            .unwrap();
        profile
    }

    fn pay(profile: &mut StudentFeeProfile, semester: u32, amount: Amount) {
        profile
            .record_mut(2, semester, FeeType::College)
            .unwrap()
            .apply_payment(amount, "Online", "test");
    }

    #[test]
    fn test_nothing_paid_reports_only_odd_shortfall() {
        let result = EligibilityEvaluator::default().evaluate(&with_college_due(10_000));

        assert!(!result.is_eligible);
        assert!(!result.eligible_for_odd_sem);
        assert!(!result.eligible_for_even_sem);
        assert_eq!(result.percentage_paid, 0.0);
        assert_eq!(result.reasons, vec!["Odd Sem Eligibility: Paid 0.0% (Need 50%)"]);
    }

    #[test]
    fn test_half_paid_clears_odd_semester_only() {
        let mut profile = with_college_due(10_000);
        pay(&mut profile, 3, 5000);

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert_eq!(result.percentage_paid, 50.0);
        assert!(result.is_eligible);
        assert!(result.eligible_for_odd_sem);
        assert!(!result.eligible_for_even_sem);
        assert_eq!(result.reasons, vec!["Even Sem Eligibility: Paid 50.0% (Need 100%)"]);
    }

    #[test]
    fn test_fully_paid_clears_both() {
        let mut profile = with_college_due(10_000);
        pay(&mut profile, 3, 5000);
        pay(&mut profile, 4, 5000);

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert_eq!(result.percentage_paid, 100.0);
        assert!(result.eligible_for_odd_sem && result.eligible_for_even_sem);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_even_threshold_tolerates_rounding_near_full() {
        let mut profile = with_college_due(100_000);
        pay(&mut profile, 3, 50_000);
        pay(&mut profile, 4, 49_950);

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert!(result.percentage_paid >= EVEN_SEM_THRESHOLD);
        assert!(result.eligible_for_even_sem);
    }

    #[test]
    fn test_only_current_year_records_count() {
        let mut profile = with_college_due(10_000);
        profile
            .fee_records
            .push(FeeRecord::new(1, 1, FeeType::College, 40_000));
        pay(&mut profile, 3, 5000);

        let result = EligibilityEvaluator::default().evaluate(&profile);
        assert_eq!(result.percentage_paid, 50.0);
    }

    #[test]
    fn test_fallback_to_legacy_dues_without_records() {
        let mut profile = student();
        profile.college_fee_due = 60_000;

        let result = EligibilityEvaluator::default().evaluate(&profile);
        assert_eq!(result.percentage_paid, 0.0);
        assert!(!result.eligible_for_odd_sem);

        profile.college_fee_due = 0;
        let result = EligibilityEvaluator::default().evaluate(&profile);
        assert_eq!(result.percentage_paid, 100.0);
        assert!(result.eligible_for_odd_sem && result.eligible_for_even_sem);
    }

    #[test]
    fn test_overpaid_ledger_is_capped_at_full() {
        let mut profile = with_college_due(10_000);
        pay(&mut profile, 3, 5000);
        pay(&mut profile, 4, 5000);
        LedgerReconciler::default()
            .apply_category_due(&mut profile, FeeType::College, 8000)
            .unwrap();

        let result = EligibilityEvaluator::default().evaluate(&profile);
        assert_eq!(result.percentage_paid, 100.0);
    }

    #[test]
    fn test_inactive_status_is_informational() {
        let mut profile = with_college_due(10_000);
        pay(&mut profile, 3, 5000);
        pay(&mut profile, 4, 5000);
        profile.status = StudentStatus::Inactive;

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert!(result.is_eligible);
        assert!(result.eligible_for_odd_sem && result.eligible_for_even_sem);
        assert_eq!(result.reasons, vec!["Student status is inactive"]);
    }

    #[test]
    fn test_override_true_replaces_reasons() {
        let mut profile = with_college_due(10_000);
        profile.status = StudentStatus::Suspended;
        profile.eligibility_override = Some(true);

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert!(result.is_eligible);
        assert!(result.eligible_for_odd_sem && result.eligible_for_even_sem);
        assert_eq!(result.reasons, vec!["Administratively Overridden (Eligible)"]);
        assert_eq!(result.percentage_paid, 0.0);
    }

    #[test]
    fn test_override_false_blocks_paid_student() {
        let mut profile = with_college_due(10_000);
        pay(&mut profile, 3, 5000);
        pay(&mut profile, 4, 5000);
        profile.eligibility_override = Some(false);

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert!(!result.is_eligible);
        assert!(!result.eligible_for_odd_sem && !result.eligible_for_even_sem);
        assert_eq!(result.reasons, vec!["Administratively Overridden (Ineligible)"]);
    }

    #[test]
    fn test_last_sem_dues_beat_override() {
        let mut profile = with_college_due(10_000);
        profile.eligibility_override = Some(true);
        profile.last_sem_dues = 2500;

        let result = EligibilityEvaluator::default().evaluate(&profile);

        assert!(!result.is_eligible);
        assert!(!result.eligible_for_odd_sem && !result.eligible_for_even_sem);
        assert_eq!(
            result.reasons,
            vec![
                "Administratively Overridden (Eligible)",
                "Pending Last Semester Dues: 2500",
            ]
        );
    }

    #[test]
    fn test_last_sem_dues_append_to_threshold_reasons() {
        let mut profile = with_college_due(10_000);
        profile.last_sem_dues = 100;

        let result = EligibilityEvaluator::default().evaluate(&profile);
        assert_eq!(
            result.reasons,
            vec![
                "Odd Sem Eligibility: Paid 0.0% (Need 50%)",
                "Pending Last Semester Dues: 100",
            ]
        );
    }

    #[test]
    fn test_configured_thresholds() {
        let mut profile = with_college_due(10_000);
        pay(&mut profile, 3, 4000);

        let evaluator = EligibilityEvaluator::new(EligibilityConfig {
            odd_sem_threshold: 40.0,
            even_sem_threshold: 99.9,
        });
        let result = evaluator.evaluate(&profile);
        assert!(result.eligible_for_odd_sem);

        let result = EligibilityEvaluator::default().evaluate(&profile);
        assert_eq!(result.reasons, vec!["Odd Sem Eligibility: Paid 40.0% (Need 50%)"]);
    }

    #[test]
    fn test_result_json_field_names() {
        let result = EligibilityEvaluator::default().evaluate(&with_college_due(10_000));
        let json = serde_json::to_value(&result).unwrap();

        for key in [
            "isEligible",
            "eligibleForOddSem",
            "eligibleForEvenSem",
            "reasons",
            "percentagePaid",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        for key in ["usn", "collegeFeeDue", "transportFeeDue", "lastSemDues", "percentagePaid"] {
            assert!(json["student"].get(key).is_some(), "missing student.{}", key);
        }
        assert_eq!(json["rules"][1]["rule"], "oddSemester");
    }
}
