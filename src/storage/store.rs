use serde::Serialize;

use crate::{error::Result, ledger::StudentFeeProfile};

/// Persistence boundary for student fee profiles
#[cfg_attr(test, mockall::automock)]
pub trait StudentStore: Send {
    /// Create a new profile; fails with `Conflict` if the USN or user id is taken
    fn insert(&self, profile: &StudentFeeProfile) -> Result<StudentFeeProfile>;

    /// Profile owned by the given user identity
    fn find_by_identity(&self, user_id: &str) -> Result<Option<StudentFeeProfile>>;

    /// First profile whose USN contains `pattern`, ignoring case
    fn find_by_usn(&self, pattern: &str) -> Result<Option<StudentFeeProfile>>;

    /// Profile with exactly this USN
    fn get(&self, usn: &str) -> Result<Option<StudentFeeProfile>>;

    /// Persist a profile read earlier. Fails with `Conflict` if it was saved by
    /// someone else in between. Returns the profile with its new version.
    fn save(&self, profile: &StudentFeeProfile) -> Result<StudentFeeProfile>;

    fn stats(&self) -> Result<LedgerStats>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_students: usize,
    pub total_records: usize,
    pub pending_records: usize,
    pub partial_records: usize,
    pub paid_records: usize,
    pub total_assigned: i64,
    pub total_collected: i64,
    pub total_last_sem_dues: i64,
}

impl LedgerStats {
    pub fn collection_rate(&self) -> f64 {
        if self.total_assigned == 0 {
            0.0
        } else {
            (self.total_collected as f64 / self.total_assigned as f64) * 100.0
        }
    }
}
