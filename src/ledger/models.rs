use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whole currency units
pub type Amount = i64;

/// Fee category tracked in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    College,
    Transport,
}

impl FeeType {
    pub const ALL: [FeeType; 2] = [FeeType::College, FeeType::Transport];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::College => "college",
            FeeType::Transport => "transport",
        }
    }
}

impl std::fmt::Display for FeeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "college" => Ok(FeeType::College),
            "transport" => Ok(FeeType::Transport),
            other => Err(format!("unknown fee category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Pending,
    Partial,
    Paid,
}

impl FeeStatus {
    /// Status implied by the paid and due amounts
    pub fn derive(amount_paid: Amount, amount_due: Amount) -> Self {
        if amount_paid >= amount_due {
            FeeStatus::Paid
        } else if amount_paid > 0 {
            FeeStatus::Partial
        } else {
            FeeStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Pending => "pending",
            FeeStatus::Partial => "partial",
            FeeStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FeeStatus::Pending),
            "partial" => Ok(FeeStatus::Partial),
            "paid" => Ok(FeeStatus::Paid),
            other => Err(format!("unknown fee status '{}'", other)),
        }
    }
}

/// A single payment applied to a fee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: Amount,
    pub date: DateTime<Utc>,
    pub mode: String,
    pub reference: String,
}

/// One fee category for one semester of one academic year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub year: u32,
    pub semester: u32,
    pub fee_type: FeeType,
    pub amount_due: Amount,
    #[serde(default)]
    pub amount_paid: Amount,
    pub status: FeeStatus,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl FeeRecord {
    pub fn new(year: u32, semester: u32, fee_type: FeeType, amount_due: Amount) -> Self {
        Self {
            year,
            semester,
            fee_type,
            amount_due,
            amount_paid: 0,
            status: FeeStatus::Pending,
            transactions: Vec::new(),
        }
    }

    pub fn matches(&self, year: u32, semester: u32, fee_type: FeeType) -> bool {
        self.year == year && self.semester == semester && self.fee_type == fee_type
    }

    pub fn outstanding(&self) -> Amount {
        (self.amount_due - self.amount_paid).max(0)
    }

    pub fn set_amount_due(&mut self, amount_due: Amount) {
        self.amount_due = amount_due;
        self.refresh_status();
    }

    pub fn refresh_status(&mut self) {
        self.status = FeeStatus::derive(self.amount_paid, self.amount_due);
    }

    /// Add a payment to `amount_paid` and log it
    pub fn apply_payment(&mut self, amount: Amount, mode: &str, reference: &str) {
        self.amount_paid += amount;
        self.refresh_status();
        self.transactions.push(Transaction {
            amount,
            date: Utc::now(),
            mode: mode.to_string(),
            reference: reference.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
    Suspended,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Graduated => "graduated",
            StudentStatus::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "graduated" => Ok(StudentStatus::Graduated),
            "suspended" => Ok(StudentStatus::Suspended),
            other => Err(format!("unknown student status '{}'", other)),
        }
    }
}

/// A student's fee ledger together with the flags the evaluator reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFeeProfile {
    pub usn: String,
    /// Identity of the user account that owns this profile
    pub user_id: String,
    pub name: String,
    pub current_year: u32,
    pub status: StudentStatus,
    #[serde(default)]
    pub last_sem_dues: Amount,
    /// Last due assigned to the category, rewritten by the reconciler
    #[serde(default)]
    pub college_fee_due: Amount,
    #[serde(default)]
    pub transport_fee_due: Amount,
    #[serde(default)]
    pub eligibility_override: Option<bool>,
    #[serde(default)]
    pub transport_opted: bool,
    #[serde(default)]
    pub fee_records: Vec<FeeRecord>,
    /// Optimistic concurrency token, bumped by every successful save
    #[serde(default)]
    pub version: i64,
}

impl StudentFeeProfile {
    pub fn new(usn: &str, user_id: &str, name: &str, current_year: u32) -> Self {
        Self {
            usn: usn.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            current_year,
            status: StudentStatus::Active,
            last_sem_dues: 0,
            college_fee_due: 0,
            transport_fee_due: 0,
            eligibility_override: None,
            transport_opted: false,
            fee_records: Vec::new(),
            version: 0,
        }
    }

    /// Odd and even semester numbers of the current academic year
    pub fn current_semesters(&self) -> (u32, u32) {
        semesters_of_year(self.current_year)
    }

    pub fn record(&self, year: u32, semester: u32, fee_type: FeeType) -> Option<&FeeRecord> {
        self.fee_records
            .iter()
            .find(|r| r.matches(year, semester, fee_type))
    }

    pub fn record_mut(
        &mut self,
        year: u32,
        semester: u32,
        fee_type: FeeType,
    ) -> Option<&mut FeeRecord> {
        self.fee_records
            .iter_mut()
            .find(|r| r.matches(year, semester, fee_type))
    }

    pub fn current_year_records(&self) -> impl Iterator<Item = &FeeRecord> {
        let year = self.current_year;
        self.fee_records.iter().filter(move |r| r.year == year)
    }

    pub fn legacy_due(&self, fee_type: FeeType) -> Amount {
        match fee_type {
            FeeType::College => self.college_fee_due,
            FeeType::Transport => self.transport_fee_due,
        }
    }

    pub(crate) fn set_legacy_due(&mut self, fee_type: FeeType, amount: Amount) {
        match fee_type {
            FeeType::College => self.college_fee_due = amount,
            FeeType::Transport => self.transport_fee_due = amount,
        }
    }
}

pub fn semesters_of_year(year: u32) -> (u32, u32) {
    (year * 2 - 1, year * 2)
}

pub fn year_of_semester(semester: u32) -> u32 {
    (semester + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(FeeStatus::derive(0, 5000), FeeStatus::Pending);
        assert_eq!(FeeStatus::derive(1, 5000), FeeStatus::Partial);
        assert_eq!(FeeStatus::derive(5000, 5000), FeeStatus::Paid);
        assert_eq!(FeeStatus::derive(0, 0), FeeStatus::Paid);
    }

    #[test]
    fn test_semester_numbering() {
        assert_eq!(semesters_of_year(1), (1, 2));
        assert_eq!(semesters_of_year(2), (3, 4));
        assert_eq!(year_of_semester(3), 2);
        assert_eq!(year_of_semester(4), 2);
    }

    #[test]
    fn test_apply_payment_updates_status_and_log() {
        let mut record = FeeRecord::new(2, 3, FeeType::College, 5000);
        record.apply_payment(2000, "UPI", "pay_001");
        assert_eq!(record.status, FeeStatus::Partial);
        assert_eq!(record.outstanding(), 3000);

        record.apply_payment(3000, "UPI", "pay_002");
        assert_eq!(record.status, FeeStatus::Paid);
        assert_eq!(record.transactions.len(), 2);
        assert_eq!(record.transactions[0].reference, "pay_001");
    }

    #[test]
    fn test_profile_json_uses_legacy_field_names() {
        let profile = StudentFeeProfile::new("1AB21CS001", "u-1", "Asha", 2);
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["usn"], "1AB21CS001");
        assert_eq!(json["collegeFeeDue"], 0);
        assert_eq!(json["transportFeeDue"], 0);
        assert_eq!(json["lastSemDues"], 0);
        assert!(json["eligibilityOverride"].is_null());
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_fee_type_parsing() {
        assert_eq!("Transport".parse::<FeeType>(), Ok(FeeType::Transport));
        assert!("hostel".parse::<FeeType>().is_err());
    }
}
