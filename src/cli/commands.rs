use clap::{Parser, Subcommand, ValueEnum};

use crate::ledger::{FeeType, StudentStatus};

#[derive(Debug, Parser)]
#[command(name = "fee-ledger")]
#[command(about = "Student fee ledger and exam eligibility engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    College,
    Transport,
}

impl From<Category> for FeeType {
    fn from(value: Category) -> Self {
        match value {
            Category::College => FeeType::College,
            Category::Transport => FeeType::Transport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Status {
    Active,
    Inactive,
    Graduated,
    Suspended,
}

impl From<Status> for StudentStatus {
    fn from(value: Status) -> Self {
        match value {
            Status::Active => StudentStatus::Active,
            Status::Inactive => StudentStatus::Inactive,
            Status::Graduated => StudentStatus::Graduated,
            Status::Suspended => StudentStatus::Suspended,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverrideValue {
    /// Force eligible
    Eligible,
    /// Force ineligible
    Ineligible,
    /// Remove the override
    Unset,
}

impl From<OverrideValue> for Option<bool> {
    fn from(value: OverrideValue) -> Self {
        match value {
            OverrideValue::Eligible => Some(true),
            OverrideValue::Ineligible => Some(false),
            OverrideValue::Unset => None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Enrol a student
    Enrol {
        usn: String,

        /// Identity of the student's user account
        #[arg(long)]
        user: String,

        #[arg(long)]
        name: String,

        /// Current academic year (1-based)
        #[arg(long)]
        year: u32,

        /// College fee due for the year before any ledger entries exist
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        college_fee_due: i64,

        /// Transport fee due for the year before any ledger entries exist
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        transport_fee_due: i64,

        /// Dues carried over from a prior period
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        last_sem_dues: i64,

        #[arg(long)]
        transport_opted: bool,
    },

    /// Show the profile owned by a user
    Profile {
        #[arg(long)]
        user: String,
    },

    /// Find a student by partial USN
    Search {
        query: String,
    },

    /// Transport department update
    Transport {
        usn: String,

        /// Mark the student as using (or not using) college transport
        #[arg(long)]
        opted: Option<bool>,

        /// New transport due for the year; 0 marks it paid
        #[arg(long, allow_hyphen_values = true)]
        due: Option<i64>,
    },

    /// Set the college fee due for the year; 0 marks it paid
    College {
        usn: String,

        #[arg(allow_hyphen_values = true)]
        due: i64,
    },

    /// Record a confirmed payment
    Pay {
        usn: String,

        #[arg(long, value_enum)]
        category: Category,

        #[arg(long)]
        semester: u32,

        #[arg(long, allow_hyphen_values = true)]
        amount: i64,

        /// Payment mode (e.g. Online, Cash, DD)
        #[arg(long, default_value = "Online")]
        mode: String,

        /// Gateway order id or receipt number
        #[arg(long)]
        reference: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Set or clear the administrative eligibility override
    Override {
        usn: String,

        #[arg(value_enum)]
        value: OverrideValue,
    },

    /// Set dues outstanding from a previous period
    LastSemDues {
        usn: String,

        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },

    /// Change a student's enrolment status
    Status {
        usn: String,

        #[arg(value_enum)]
        status: Status,
    },

    /// Check exam eligibility
    Eligibility {
        /// Check as this user (student view)
        #[arg(long, conflicts_with = "usn")]
        user: Option<String>,

        /// Display name of the calling user
        #[arg(long, requires = "user")]
        name: Option<String>,

        /// Check a student by USN (staff view)
        #[arg(long)]
        usn: Option<String>,
    },

    /// Show the fee records and transactions of a student
    History {
        usn: String,
    },

    /// Show collection statistics
    Stats,
}
