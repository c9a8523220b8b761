//! SQLite store for the day-detail cache and machine metadata.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::models::{DayDetail, MachineMeta};

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt cached document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Thread-safe database store.
///
/// Day details are stored as one JSON document per `(box_id, day)`; the
/// compound primary key makes the upsert the single atomic write the cache
/// contract relies on.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS day_details (
    box_id     TEXT NOT NULL,
    day        TEXT NOT NULL,
    detail     TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (box_id, day)
);
CREATE INDEX IF NOT EXISTS idx_day_details_day ON day_details(day);

CREATE TABLE IF NOT EXISTS machines (
    machine_name    TEXT PRIMARY KEY,
    box_id          TEXT,
    initial_counter REAL NOT NULL DEFAULT 0,
    company         TEXT,
    provider        TEXT,
    start_date      TEXT
);
";

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // --- Day-detail cache ---

    /// Fetch the cached detail for one device/day, if any.
    pub fn find_day_detail(&self, box_id: &str, day: &str) -> Result<Option<DayDetail>, DbError> {
        let conn = self.lock();
        let doc: Option<String> = conn
            .query_row(
                "SELECT detail FROM day_details WHERE box_id = ?1 AND day = ?2",
                params![box_id, day],
                |row| row.get(0),
            )
            .optional()?;
        match doc {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Insert-or-replace the detail for its `(box_id, day)` key.
    pub fn upsert_day_detail(&self, detail: &DayDetail) -> Result<(), DbError> {
        let json = serde_json::to_string(detail)?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO day_details (box_id, day, detail, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(box_id, day) DO UPDATE SET
             detail = excluded.detail, updated_at = excluded.updated_at",
            params![detail.box_id, detail.day, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // --- Machine metadata ---

    /// Initial season counter for a machine, matched case-insensitively by
    /// exact name.
    pub fn find_initial_counter(&self, machine_name: &str) -> Result<Option<f64>, DbError> {
        let conn = self.lock();
        let v: Option<f64> = conn
            .query_row(
                "SELECT initial_counter FROM machines WHERE machine_name = ?1 COLLATE NOCASE",
                params![machine_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(v)
    }

    /// All machine metadata rows, name order.
    pub fn list_machines(&self) -> Result<Vec<MachineMeta>, DbError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT machine_name, box_id, initial_counter, company, provider, start_date
             FROM machines ORDER BY machine_name",
        )?;
        let machines = stmt
            .query_map([], |row| {
                Ok(MachineMeta {
                    machine_name: row.get(0)?,
                    box_id: row.get(1)?,
                    initial_counter: row.get(2)?,
                    company: row.get(3)?,
                    provider: row.get(4)?,
                    start_date: row.get(5)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(machines)
    }

    /// Insert-or-replace one machine row keyed by name.
    pub fn upsert_machine(&self, meta: &MachineMeta) -> Result<(), DbError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO machines (machine_name, box_id, initial_counter, company, provider, start_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(machine_name) DO UPDATE SET
             box_id = excluded.box_id, initial_counter = excluded.initial_counter,
             company = excluded.company, provider = excluded.provider,
             start_date = excluded.start_date",
            params![
                meta.machine_name,
                meta.box_id,
                meta.initial_counter,
                meta.company,
                meta.provider,
                meta.start_date,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Averages, EmergencySummary, RunSummary, SOURCE_CACHE};
    use tempfile::NamedTempFile;

    fn detail(box_id: &str, day: &str, ticks: i64) -> DayDetail {
        DayDetail {
            box_id: box_id.into(),
            day: day.into(),
            emergencias: EmergencySummary::default(),
            contador_dia_ticks: ticks,
            run: RunSummary::default(),
            averages: Averages::default(),
            bins_1h: Vec::new(),
            computed_at: Utc::now(),
            source: SOURCE_CACHE.into(),
        }
    }

    #[test]
    fn test_day_detail_upsert_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        assert!(store.find_day_detail("42", "2024-06-10").unwrap().is_none());

        let first = detail("42", "2024-06-10", 100);
        store.upsert_day_detail(&first).unwrap();
        let got = store.find_day_detail("42", "2024-06-10").unwrap().unwrap();
        assert_eq!(got, first);

        // Same key overwrites; latest computation wins.
        let second = detail("42", "2024-06-10", 250);
        store.upsert_day_detail(&second).unwrap();
        let got = store.find_day_detail("42", "2024-06-10").unwrap().unwrap();
        assert_eq!(got.contador_dia_ticks, 250);

        // Other keys are untouched.
        store.upsert_day_detail(&detail("42", "2024-06-11", 7)).unwrap();
        store.upsert_day_detail(&detail("43", "2024-06-10", 8)).unwrap();
        assert_eq!(
            store
                .find_day_detail("42", "2024-06-10")
                .unwrap()
                .unwrap()
                .contador_dia_ticks,
            250
        );
    }

    #[test]
    fn test_machine_lookup_case_insensitive() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        store
            .upsert_machine(&MachineMeta {
                machine_name: "Linea Norte".into(),
                box_id: Some("42".into()),
                initial_counter: 1500.0,
                company: None,
                provider: None,
                start_date: Some("2024-03-01".into()),
            })
            .unwrap();

        assert_eq!(
            store.find_initial_counter("LINEA NORTE").unwrap(),
            Some(1500.0)
        );
        assert_eq!(store.find_initial_counter("linea norte").unwrap(), Some(1500.0));
        assert_eq!(store.find_initial_counter("otra").unwrap(), None);

        let machines = store.list_machines().unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].machine_name, "Linea Norte");
    }
}
