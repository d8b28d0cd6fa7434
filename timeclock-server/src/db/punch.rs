//! Punch ledger: the append-only ENTRY/EXIT sequence per employee.
//!
//! The ledger enforces strict alternation at write time: an entry is rejected
//! while another entry is open, an exit is rejected without one. The
//! check-then-write is serialized per employee — the PostgreSQL backend locks
//! the employee row inside a transaction, the in-memory backend holds the map
//! entry guard across the check — so two concurrent punches for the same
//! employee can never both succeed. Punches for different employees never
//! block each other.
//!
//! Records are immutable once written; no update or delete path exists in
//! this module.
//!
//! PostgreSQL is used when available; the in-memory backend serves
//! development and tests (punches are lost on restart).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use timeclock_core::{PunchKind, VerificationMethod};
use utoipa::ToSchema;
use uuid::Uuid;

/// A single immutable punch record
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PunchRecord {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub employee_id: Uuid,
    /// Resolved site; present on every ENTRY, best-effort on EXIT
    #[schema(value_type = Option<String>)]
    pub site_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "ENTRY")]
    pub kind: PunchKind,
    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "DEVICE_FINGERPRINT")]
    pub verification_method: VerificationMethod,
}

/// Clock-in state derived from the latest record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PunchStatus {
    pub is_clocked_in: bool,
    pub last_punch: Option<PunchRecord>,
}

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("an entry is already open for this employee")]
    AlreadyClockedIn,

    #[error("no open entry for this employee")]
    NoOpenEntry,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Ledger storage backend
enum LedgerBackend {
    /// PostgreSQL storage (production)
    Postgres(PgPool),
    /// In-memory storage (development fallback), one vector per employee
    Memory(DashMap<Uuid, Vec<PunchRecord>>),
}

/// The punch ledger with its storage backend
pub struct PunchLedger {
    backend: LedgerBackend,
}

impl PunchLedger {
    /// Create a ledger backed by PostgreSQL
    pub fn with_postgres(pool: PgPool) -> Self {
        Self {
            backend: LedgerBackend::Postgres(pool),
        }
    }

    /// Create a ledger with in-memory storage (development only)
    pub fn in_memory() -> Self {
        Self {
            backend: LedgerBackend::Memory(DashMap::new()),
        }
    }

    /// Check if using persistent storage
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, LedgerBackend::Postgres(_))
    }

    /// Record an ENTRY punch. A resolved site is required at the type level.
    ///
    /// Fails with [`LedgerError::AlreadyClockedIn`] when the employee's most
    /// recent punch is an ENTRY.
    pub async fn record_entry(
        &self,
        employee_id: Uuid,
        site_id: Uuid,
        latitude: f64,
        longitude: f64,
        method: VerificationMethod,
    ) -> Result<PunchRecord, LedgerError> {
        match &self.backend {
            LedgerBackend::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                lock_employee(&mut tx, employee_id).await?;

                if let Some(last) = latest_kind(&mut tx, employee_id).await? {
                    if last == PunchKind::Entry {
                        return Err(LedgerError::AlreadyClockedIn);
                    }
                }

                let record = insert_punch(
                    &mut tx,
                    employee_id,
                    Some(site_id),
                    PunchKind::Entry,
                    latitude,
                    longitude,
                    method,
                )
                .await?;
                tx.commit().await?;
                Ok(record)
            }
            LedgerBackend::Memory(map) => {
                // The entry guard is exclusive per employee for the whole
                // check-then-push
                let mut records = map.entry(employee_id).or_default();
                if records.last().map(|r| r.kind) == Some(PunchKind::Entry) {
                    return Err(LedgerError::AlreadyClockedIn);
                }
                let record = memory_punch(
                    employee_id,
                    Some(site_id),
                    PunchKind::Entry,
                    latitude,
                    longitude,
                    method,
                );
                records.push(record.clone());
                Ok(record)
            }
        }
    }

    /// Record an EXIT punch. Site attribution is best-effort and may be
    /// absent when no site was within radius at exit time.
    ///
    /// Fails with [`LedgerError::NoOpenEntry`] when the employee has no
    /// punches or the most recent punch is an EXIT.
    pub async fn record_exit(
        &self,
        employee_id: Uuid,
        site_id: Option<Uuid>,
        latitude: f64,
        longitude: f64,
        method: VerificationMethod,
    ) -> Result<PunchRecord, LedgerError> {
        match &self.backend {
            LedgerBackend::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                lock_employee(&mut tx, employee_id).await?;

                match latest_kind(&mut tx, employee_id).await? {
                    Some(PunchKind::Entry) => {}
                    _ => return Err(LedgerError::NoOpenEntry),
                }

                let record = insert_punch(
                    &mut tx,
                    employee_id,
                    site_id,
                    PunchKind::Exit,
                    latitude,
                    longitude,
                    method,
                )
                .await?;
                tx.commit().await?;
                Ok(record)
            }
            LedgerBackend::Memory(map) => {
                let mut records = map.entry(employee_id).or_default();
                match records.last().map(|r| r.kind) {
                    Some(PunchKind::Entry) => {}
                    _ => return Err(LedgerError::NoOpenEntry),
                }
                let record = memory_punch(
                    employee_id,
                    site_id,
                    PunchKind::Exit,
                    latitude,
                    longitude,
                    method,
                );
                records.push(record.clone());
                Ok(record)
            }
        }
    }

    /// Current clock-in status, a pure read of the latest record.
    pub async fn status(&self, employee_id: Uuid) -> Result<PunchStatus, LedgerError> {
        let last_punch = match &self.backend {
            LedgerBackend::Postgres(pool) => {
                sqlx::query_as::<_, PunchRecord>(
                    r#"
                    SELECT id, employee_id, site_id, kind, timestamp,
                           latitude, longitude, verification_method
                    FROM punch_records
                    WHERE employee_id = $1
                    ORDER BY timestamp DESC, id DESC
                    LIMIT 1
                    "#,
                )
                .bind(employee_id)
                .fetch_optional(pool)
                .await?
            }
            LedgerBackend::Memory(map) => map
                .get(&employee_id)
                .and_then(|records| records.last().cloned()),
        };

        Ok(PunchStatus {
            is_clocked_in: last_punch
                .as_ref()
                .map(|r| r.kind == PunchKind::Entry)
                .unwrap_or(false),
            last_punch,
        })
    }

    /// List punches in a timestamp range, ordered by timestamp ascending,
    /// optionally restricted to one employee. Used by reports.
    pub async fn list_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        employee_id: Option<Uuid>,
    ) -> Result<Vec<PunchRecord>, LedgerError> {
        match &self.backend {
            LedgerBackend::Postgres(pool) => {
                let records = sqlx::query_as::<_, PunchRecord>(
                    r#"
                    SELECT id, employee_id, site_id, kind, timestamp,
                           latitude, longitude, verification_method
                    FROM punch_records
                    WHERE timestamp >= $1 AND timestamp <= $2
                      AND ($3::uuid IS NULL OR employee_id = $3)
                    ORDER BY timestamp, id
                    "#,
                )
                .bind(from)
                .bind(to)
                .bind(employee_id)
                .fetch_all(pool)
                .await?;
                Ok(records)
            }
            LedgerBackend::Memory(map) => {
                let mut records: Vec<PunchRecord> = map
                    .iter()
                    .filter(|entry| employee_id.is_none() || employee_id == Some(*entry.key()))
                    .flat_map(|entry| {
                        entry
                            .value()
                            .iter()
                            .filter(|r| r.timestamp >= from && r.timestamp <= to)
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .collect();
                records.sort_by_key(|r| r.timestamp);
                Ok(records)
            }
        }
    }
}

/// Lock the employee row, serializing concurrent punches for one employee
/// without blocking punches for others.
async fn lock_employee(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    employee_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
        .bind(employee_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn latest_kind(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    employee_id: Uuid,
) -> Result<Option<PunchKind>, LedgerError> {
    let kind: Option<String> = sqlx::query_scalar(
        r#"
        SELECT kind FROM punch_records
        WHERE employee_id = $1
        ORDER BY timestamp DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(&mut **tx)
    .await?;

    match kind {
        None => Ok(None),
        Some(raw) => {
            let kind = PunchKind::try_from(raw)
                .map_err(|e| LedgerError::Storage(sqlx::Error::Decode(Box::new(e))))?;
            Ok(Some(kind))
        }
    }
}

async fn insert_punch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    employee_id: Uuid,
    site_id: Option<Uuid>,
    kind: PunchKind,
    latitude: f64,
    longitude: f64,
    method: VerificationMethod,
) -> Result<PunchRecord, sqlx::Error> {
    sqlx::query_as::<_, PunchRecord>(
        r#"
        INSERT INTO punch_records
            (employee_id, site_id, kind, timestamp, latitude, longitude, verification_method)
        VALUES ($1, $2, $3, NOW(), $4, $5, $6)
        RETURNING id, employee_id, site_id, kind, timestamp,
                  latitude, longitude, verification_method
        "#,
    )
    .bind(employee_id)
    .bind(site_id)
    .bind(kind.as_str())
    .bind(latitude)
    .bind(longitude)
    .bind(method.as_str())
    .fetch_one(&mut **tx)
    .await
}

fn memory_punch(
    employee_id: Uuid,
    site_id: Option<Uuid>,
    kind: PunchKind,
    latitude: f64,
    longitude: f64,
    method: VerificationMethod,
) -> PunchRecord {
    PunchRecord {
        id: Uuid::new_v4(),
        employee_id,
        site_id,
        kind,
        timestamp: Utc::now(),
        latitude,
        longitude,
        verification_method: method,
    }
}

impl std::fmt::Debug for PunchLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            LedgerBackend::Postgres(_) => f
                .debug_struct("PunchLedger")
                .field("backend", &"PostgreSQL")
                .finish(),
            LedgerBackend::Memory(map) => f
                .debug_struct("PunchLedger")
                .field("backend", &"Memory")
                .field("employees", &map.len())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const LAT: f64 = 40.4168;
    const LNG: f64 = -3.7038;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_entry_exit_round_trip() {
        let ledger = PunchLedger::in_memory();
        let (employee, site) = ids();

        let status = ledger.status(employee).await.unwrap();
        assert!(!status.is_clocked_in);
        assert!(status.last_punch.is_none());

        let entry = ledger
            .record_entry(employee, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();
        assert_eq!(entry.kind, PunchKind::Entry);
        assert_eq!(entry.site_id, Some(site));

        let status = ledger.status(employee).await.unwrap();
        assert!(status.is_clocked_in);

        let exit = ledger
            .record_exit(employee, None, LAT, LNG, VerificationMethod::DeviceFace)
            .await
            .unwrap();
        assert_eq!(exit.kind, PunchKind::Exit);
        assert_eq!(exit.site_id, None);

        let status = ledger.status(employee).await.unwrap();
        assert!(!status.is_clocked_in);
    }

    #[tokio::test]
    async fn test_double_entry_rejected() {
        let ledger = PunchLedger::in_memory();
        let (employee, site) = ids();

        ledger
            .record_entry(employee, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();

        let err = ledger
            .record_entry(employee, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyClockedIn));
    }

    #[tokio::test]
    async fn test_exit_without_entry_rejected() {
        let ledger = PunchLedger::in_memory();
        let (employee, _) = ids();

        let err = ledger
            .record_exit(employee, None, LAT, LNG, VerificationMethod::EmergencyPin)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoOpenEntry));
    }

    #[tokio::test]
    async fn test_double_exit_rejected() {
        let ledger = PunchLedger::in_memory();
        let (employee, site) = ids();

        ledger
            .record_entry(employee, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();
        ledger
            .record_exit(employee, Some(site), LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();

        let err = ledger
            .record_exit(employee, Some(site), LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoOpenEntry));
    }

    #[tokio::test]
    async fn test_alternation_over_many_punches() {
        let ledger = PunchLedger::in_memory();
        let (employee, site) = ids();

        for _ in 0..5 {
            ledger
                .record_entry(employee, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
                .await
                .unwrap();
            ledger
                .record_exit(employee, Some(site), LAT, LNG, VerificationMethod::DeviceFingerprint)
                .await
                .unwrap();
        }

        let records = ledger
            .list_range(
                Utc::now() - chrono::Duration::hours(1),
                Utc::now() + chrono::Duration::hours(1),
                Some(employee),
            )
            .await
            .unwrap();
        assert_eq!(records.len(), 10);
        for pair in records.chunks(2) {
            assert_eq!(pair[0].kind, PunchKind::Entry);
            assert_eq!(pair[1].kind, PunchKind::Exit);
        }
    }

    #[tokio::test]
    async fn test_concurrent_entries_exactly_one_succeeds() {
        let ledger = Arc::new(PunchLedger::in_memory());
        let (employee, site) = ids();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .record_entry(employee, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
                    .await
            }));
        }

        let mut successes = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(LedgerError::AlreadyClockedIn) => rejections += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(rejections, 7);
    }

    #[tokio::test]
    async fn test_different_employees_do_not_interfere() {
        let ledger = PunchLedger::in_memory();
        let (alice, site) = ids();
        let bob = Uuid::new_v4();

        ledger
            .record_entry(alice, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();
        ledger
            .record_entry(bob, site, LAT, LNG, VerificationMethod::FacialRecognition)
            .await
            .unwrap();

        assert!(ledger.status(alice).await.unwrap().is_clocked_in);
        assert!(ledger.status(bob).await.unwrap().is_clocked_in);
    }

    #[tokio::test]
    async fn test_list_range_filters_by_employee() {
        let ledger = PunchLedger::in_memory();
        let (alice, site) = ids();
        let bob = Uuid::new_v4();

        ledger
            .record_entry(alice, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();
        ledger
            .record_entry(bob, site, LAT, LNG, VerificationMethod::DeviceFingerprint)
            .await
            .unwrap();

        let from = Utc::now() - chrono::Duration::hours(1);
        let to = Utc::now() + chrono::Duration::hours(1);

        let all = ledger.list_range(from, to, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_alice = ledger.list_range(from, to, Some(alice)).await.unwrap();
        assert_eq!(only_alice.len(), 1);
        assert_eq!(only_alice[0].employee_id, alice);
    }
}
