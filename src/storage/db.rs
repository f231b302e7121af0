use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::{
    error::{FeeError, Result},
    ledger::{FeeRecord, StudentFeeProfile, Transaction},
    storage::store::{LedgerStats, StudentStore},
};

const STUDENT_COLUMNS: &str = "usn, user_id, name, current_year, status, last_sem_dues,
     college_fee_due, transport_fee_due, eligibility_override, transport_opted, version";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS students (
                usn TEXT PRIMARY KEY,
                user_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                current_year INTEGER NOT NULL,
                status TEXT NOT NULL,
                last_sem_dues INTEGER NOT NULL DEFAULT 0,
                college_fee_due INTEGER NOT NULL DEFAULT 0,
                transport_fee_due INTEGER NOT NULL DEFAULT 0,
                eligibility_override INTEGER,
                transport_opted INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fee_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                usn TEXT NOT NULL,
                year INTEGER NOT NULL,
                semester INTEGER NOT NULL,
                fee_type TEXT NOT NULL,
                amount_due INTEGER NOT NULL,
                amount_paid INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                UNIQUE (usn, year, semester, fee_type),
                FOREIGN KEY (usn) REFERENCES students(usn)
            )",
            [],
        )?;

        // Append-only: rows are never updated or deleted
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fee_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                amount INTEGER NOT NULL,
                date TEXT NOT NULL,
                mode TEXT NOT NULL,
                reference TEXT NOT NULL,
                UNIQUE (record_id, seq),
                FOREIGN KEY (record_id) REFERENCES fee_records(id)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_fee_records_usn ON fee_records(usn)",
            [],
        )?;

        Ok(())
    }

    fn load(&self, usn: &str) -> Result<Option<StudentFeeProfile>> {
        let query = format!("SELECT {} FROM students WHERE usn = ?1", STUDENT_COLUMNS);
        let profile = self
            .conn
            .query_row(&query, [usn], profile_from_row)
            .optional()?;

        match profile {
            Some(mut profile) => {
                profile.fee_records = self.load_records(&profile.usn)?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    fn load_records(&self, usn: &str) -> Result<Vec<FeeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, year, semester, fee_type, amount_due, amount_paid, status
             FROM fee_records
             WHERE usn = ?1
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([usn], |row| {
                let id: i64 = row.get(0)?;
                let record = FeeRecord {
                    year: row.get(1)?,
                    semester: row.get(2)?,
                    fee_type: parse_column(row, 3)?,
                    amount_due: row.get(4)?,
                    amount_paid: row.get(5)?,
                    status: parse_column(row, 6)?,
                    transactions: Vec::new(),
                };
                Ok((id, record))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, mut record) in rows {
            record.transactions = self.load_transactions(id)?;
            records.push(record);
        }

        Ok(records)
    }

    fn load_transactions(&self, record_id: i64) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT amount, date, mode, reference
             FROM fee_transactions
             WHERE record_id = ?1
             ORDER BY seq",
        )?;

        let transactions = stmt
            .query_map([record_id], |row| {
                Ok(Transaction {
                    amount: row.get(0)?,
                    date: parse_timestamp(row, 1)?,
                    mode: row.get(2)?,
                    reference: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    fn lookup_usn(&self, query: &str, arg: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(query, [arg], |row| row.get(0))
            .optional()?)
    }

    fn write_records(&self, profile: &StudentFeeProfile) -> Result<()> {
        for record in &profile.fee_records {
            self.conn.execute(
                "INSERT INTO fee_records
                 (usn, year, semester, fee_type, amount_due, amount_paid, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (usn, year, semester, fee_type) DO UPDATE SET
                    amount_due = excluded.amount_due,
                    amount_paid = excluded.amount_paid,
                    status = excluded.status",
                params![
                    profile.usn,
                    record.year,
                    record.semester,
                    record.fee_type.as_str(),
                    record.amount_due,
                    record.amount_paid,
                    record.status.as_str(),
                ],
            )?;

            let record_id: i64 = self.conn.query_row(
                "SELECT id FROM fee_records
                 WHERE usn = ?1 AND year = ?2 AND semester = ?3 AND fee_type = ?4",
                params![
                    profile.usn,
                    record.year,
                    record.semester,
                    record.fee_type.as_str()
                ],
                |row| row.get(0),
            )?;

            let stored: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM fee_transactions WHERE record_id = ?1",
                [record_id],
                |row| row.get(0),
            )?;
            let stored = stored as usize;

            if stored > record.transactions.len() {
                return Err(FeeError::Conflict(format!(
                    "{} sem {} {} has {} stored transactions but only {} in memory",
                    profile.usn,
                    record.semester,
                    record.fee_type,
                    stored,
                    record.transactions.len()
                )));
            }

            for (seq, tx) in record.transactions.iter().enumerate().skip(stored) {
                self.conn.execute(
                    "INSERT INTO fee_transactions
                     (record_id, seq, amount, date, mode, reference)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record_id,
                        seq as i64,
                        tx.amount,
                        tx.date.to_rfc3339(),
                        tx.mode,
                        tx.reference,
                    ],
                )?;
            }
        }

        Ok(())
    }
}

impl StudentStore for Database {
    fn insert(&self, profile: &StudentFeeProfile) -> Result<StudentFeeProfile> {
        let tx = self.conn.unchecked_transaction()?;

        let taken = self
            .conn
            .query_row(
                "SELECT usn FROM students WHERE usn = ?1 OR user_id = ?2",
                params![profile.usn, profile.user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        if let Some(existing) = taken {
            return Err(FeeError::Conflict(format!(
                "student {} or user {} already enrolled (as {})",
                profile.usn, profile.user_id, existing
            )));
        }

        self.conn.execute(
            "INSERT INTO students
             (usn, user_id, name, current_year, status, last_sem_dues, college_fee_due,
              transport_fee_due, eligibility_override, transport_opted, version, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11)",
            params![
                profile.usn,
                profile.user_id,
                profile.name,
                profile.current_year,
                profile.status.as_str(),
                profile.last_sem_dues,
                profile.college_fee_due,
                profile.transport_fee_due,
                profile.eligibility_override,
                profile.transport_opted,
                Utc::now().to_rfc3339(),
            ],
        )?;

        self.write_records(profile)?;
        tx.commit()?;

        debug!("Inserted student {}", profile.usn);

        let mut stored = profile.clone();
        stored.version = 1;
        Ok(stored)
    }

    fn find_by_identity(&self, user_id: &str) -> Result<Option<StudentFeeProfile>> {
        match self.lookup_usn("SELECT usn FROM students WHERE user_id = ?1", user_id)? {
            Some(usn) => self.load(&usn),
            None => Ok(None),
        }
    }

    fn find_by_usn(&self, pattern: &str) -> Result<Option<StudentFeeProfile>> {
        let found = self.lookup_usn(
            "SELECT usn FROM students
             WHERE instr(lower(usn), lower(?1)) > 0
             ORDER BY usn
             LIMIT 1",
            pattern,
        )?;

        match found {
            Some(usn) => self.load(&usn),
            None => Ok(None),
        }
    }

    fn get(&self, usn: &str) -> Result<Option<StudentFeeProfile>> {
        self.load(usn)
    }

    fn save(&self, profile: &StudentFeeProfile) -> Result<StudentFeeProfile> {
        let tx = self.conn.unchecked_transaction()?;

        let updated = self.conn.execute(
            "UPDATE students SET
                name = ?3,
                current_year = ?4,
                status = ?5,
                last_sem_dues = ?6,
                college_fee_due = ?7,
                transport_fee_due = ?8,
                eligibility_override = ?9,
                transport_opted = ?10,
                version = version + 1,
                updated_at = ?11
             WHERE usn = ?1 AND version = ?2",
            params![
                profile.usn,
                profile.version,
                profile.name,
                profile.current_year,
                profile.status.as_str(),
                profile.last_sem_dues,
                profile.college_fee_due,
                profile.transport_fee_due,
                profile.eligibility_override,
                profile.transport_opted,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if updated == 0 {
            let exists = self
                .lookup_usn("SELECT usn FROM students WHERE usn = ?1", &profile.usn)?
                .is_some();

            if !exists {
                return Err(FeeError::NotFound(format!("student {}", profile.usn)));
            }

            warn!(
                "Stale write for {} at version {}, rejecting",
                profile.usn, profile.version
            );
            return Err(FeeError::Conflict(format!(
                "student {} was modified concurrently (version {} is stale)",
                profile.usn, profile.version
            )));
        }

        self.write_records(profile)?;
        tx.commit()?;

        let mut stored = profile.clone();
        stored.version += 1;

        debug!("Saved student {} at version {}", stored.usn, stored.version);
        Ok(stored)
    }

    fn stats(&self) -> Result<LedgerStats> {
        let total_students: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;

        let count_status = |status: &str| -> Result<usize> {
            let count: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM fee_records WHERE status = ?1",
                [status],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        };

        let pending_records = count_status("pending")?;
        let partial_records = count_status("partial")?;
        let paid_records = count_status("paid")?;

        let (total_assigned, total_collected): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(amount_due), 0), COALESCE(SUM(amount_paid), 0) FROM fee_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let total_last_sem_dues: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(last_sem_dues), 0) FROM students",
            [],
            |row| row.get(0),
        )?;

        Ok(LedgerStats {
            total_students: total_students as usize,
            total_records: pending_records + partial_records + paid_records,
            pending_records,
            partial_records,
            paid_records,
            total_assigned,
            total_collected,
            total_last_sem_dues,
        })
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<StudentFeeProfile> {
    Ok(StudentFeeProfile {
        usn: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        current_year: row.get(3)?,
        status: parse_column(row, 4)?,
        last_sem_dues: row.get(5)?,
        college_fee_due: row.get(6)?,
        transport_fee_due: row.get(7)?,
        eligibility_override: row.get(8)?,
        transport_opted: row.get(9)?,
        fee_records: Vec::new(),
        version: row.get(10)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
