pub mod db;
pub mod store;

pub use db::Database;
pub use store::{LedgerStats, StudentStore};

#[cfg(test)]
pub use store::MockStudentStore;
