// src/service.rs
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::{
    config::Config,
    eligibility::{EligibilityEvaluator, EligibilityResult},
    error::{FeeError, Result},
    ledger::{
        record_payment, Amount, FeeType, LedgerReconciler, PaymentConfirmation,
        StudentFeeProfile, StudentStatus,
    },
    storage::{LedgerStats, StudentStore},
};

/// Caller identity as supplied by the authentication layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub usn: String,
    pub user_id: String,
    pub name: String,
    pub current_year: u32,
    #[serde(default)]
    pub college_fee_due: Amount,
    #[serde(default)]
    pub transport_fee_due: Amount,
    #[serde(default)]
    pub last_sem_dues: Amount,
    #[serde(default)]
    pub transport_opted: bool,
}

/// Transport department update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportUpdate {
    pub transport_opted: Option<bool>,
    pub transport_fee_due: Option<Amount>,
}

/// Hands out one async mutex per USN; an entry lives only while some caller
/// holds or waits on it
#[derive(Default)]
struct StudentLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StudentLocks {
    async fn acquire(&self, usn: &str) -> StudentGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(usn.to_string()).or_default().clone()
        };

        StudentGuard {
            locks: self,
            usn: usn.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

struct StudentGuard<'a> {
    locks: &'a StudentLocks,
    usn: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for StudentGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        // Clones are only taken under the map lock, so a count of one means
        // nobody else holds or waits on this entry
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.usn)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.usn);
        }
    }
}

/// Runs every ledger operation as read profile, compute, save profile
pub struct FeeService<S: StudentStore> {
    store: Mutex<S>,
    locks: StudentLocks,
    reconciler: LedgerReconciler,
    evaluator: EligibilityEvaluator,
}

impl<S: StudentStore> FeeService<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store: Mutex::new(store),
            locks: StudentLocks::default(),
            reconciler: LedgerReconciler::new(config.ledger.clone()),
            evaluator: EligibilityEvaluator::new(config.eligibility.clone()),
        }
    }

    pub async fn enrol(&self, student: NewStudent) -> Result<StudentFeeProfile> {
        if student.usn.trim().is_empty() || student.user_id.trim().is_empty() {
            return Err(FeeError::InvalidArgument(
                "usn and user id are required".to_string(),
            ));
        }
        if student.current_year == 0 {
            return Err(FeeError::InvalidArgument(
                "current year must be at least 1".to_string(),
            ));
        }
        for (field, value) in [
            ("collegeFeeDue", student.college_fee_due),
            ("transportFeeDue", student.transport_fee_due),
            ("lastSemDues", student.last_sem_dues),
        ] {
            if value < 0 {
                return Err(FeeError::InvalidArgument(format!(
                    "{} cannot be negative (got {})",
                    field, value
                )));
            }
        }

        let mut profile = StudentFeeProfile::new(
            student.usn.trim(),
            student.user_id.trim(),
            &student.name,
            student.current_year,
        );
        profile.college_fee_due = student.college_fee_due;
        profile.transport_fee_due = student.transport_fee_due;
        profile.last_sem_dues = student.last_sem_dues;
        profile.transport_opted = student.transport_opted;

        let _guard = self.locks.acquire(&profile.usn).await;
        let stored = self.store.lock().await.insert(&profile)?;

        info!("Enrolled {} (year {})", stored.usn, stored.current_year);
        Ok(stored)
    }

    /// Profile belonging to the calling user
    pub async fn profile(&self, identity: &Identity) -> Result<StudentFeeProfile> {
        self.store
            .lock()
            .await
            .find_by_identity(&identity.user_id)?
            .ok_or_else(|| FeeError::NotFound("Student profile not found".to_string()))
    }

    pub async fn search(&self, pattern: &str) -> Result<StudentFeeProfile> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(FeeError::InvalidArgument("search query is empty".to_string()));
        }

        self.store
            .lock()
            .await
            .find_by_usn(pattern)?
            .ok_or_else(|| FeeError::NotFound(format!("no student matching '{}'", pattern)))
    }

    pub async fn get(&self, usn: &str) -> Result<StudentFeeProfile> {
        self.store
            .lock()
            .await
            .get(usn)?
            .ok_or_else(|| FeeError::NotFound(format!("student {}", usn)))
    }

    /// Exam eligibility of the calling user
    pub async fn check_eligibility(&self, identity: &Identity) -> Result<EligibilityResult> {
        let profile = self.profile(identity).await?;
        let mut result = self.evaluator.evaluate(&profile);
        result.student.name = identity.name.clone();
        Ok(result)
    }

    /// Exam eligibility of any student, for staff
    pub async fn eligibility_of(&self, usn: &str) -> Result<EligibilityResult> {
        let profile = self.get(usn).await?;
        Ok(self.evaluator.evaluate(&profile))
    }

    pub async fn update_transport(
        &self,
        usn: &str,
        update: TransportUpdate,
    ) -> Result<StudentFeeProfile> {
        self.modify(usn, |profile, reconciler| {
            if let Some(opted) = update.transport_opted {
                profile.transport_opted = opted;
            }
            if let Some(due) = update.transport_fee_due {
                reconciler.apply_category_due(profile, FeeType::Transport, due)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn update_college_fee(&self, usn: &str, due: Amount) -> Result<StudentFeeProfile> {
        self.modify(usn, |profile, reconciler| {
            reconciler.apply_category_due(profile, FeeType::College, due)?;
            Ok(())
        })
        .await
    }

    pub async fn apply_category_due(
        &self,
        usn: &str,
        fee_type: FeeType,
        due: Amount,
    ) -> Result<StudentFeeProfile> {
        match fee_type {
            FeeType::College => self.update_college_fee(usn, due).await,
            FeeType::Transport => {
                self.update_transport(
                    usn,
                    TransportUpdate {
                        transport_opted: None,
                        transport_fee_due: Some(due),
                    },
                )
                .await
            }
        }
    }

    pub async fn confirm_payment(
        &self,
        usn: &str,
        payment: PaymentConfirmation,
    ) -> Result<StudentFeeProfile> {
        self.modify(usn, |profile, _| {
            record_payment(profile, &payment)?;
            Ok(())
        })
        .await
    }

    pub async fn set_override(&self, usn: &str, value: Option<bool>) -> Result<StudentFeeProfile> {
        self.modify(usn, |profile, _| {
            profile.eligibility_override = value;
            Ok(())
        })
        .await
    }

    pub async fn set_last_sem_dues(&self, usn: &str, amount: Amount) -> Result<StudentFeeProfile> {
        if amount < 0 {
            return Err(FeeError::InvalidArgument(format!(
                "last semester dues cannot be negative (got {})",
                amount
            )));
        }

        self.modify(usn, |profile, _| {
            profile.last_sem_dues = amount;
            Ok(())
        })
        .await
    }

    pub async fn set_status(&self, usn: &str, status: StudentStatus) -> Result<StudentFeeProfile> {
        self.modify(usn, |profile, _| {
            profile.status = status;
            Ok(())
        })
        .await
    }

    pub async fn stats(&self) -> Result<LedgerStats> {
        self.store.lock().await.stats()
    }

    async fn modify<F>(&self, usn: &str, change: F) -> Result<StudentFeeProfile>
    where
        F: FnOnce(&mut StudentFeeProfile, &LedgerReconciler) -> Result<()>,
    {
        let _guard = self.locks.acquire(usn).await;

        let mut profile = self
            .store
            .lock()
            .await
            .get(usn)?
            .ok_or_else(|| FeeError::NotFound(format!("student {}", usn)))?;

        if let Err(e) = change(&mut profile, &self.reconciler) {
            warn!("Update to {} rejected: {}", usn, e);
            return Err(e);
        }

        self.store.lock().await.save(&profile)
    }
}
