//! `SQLite` implementation of [`SnapshotRepository`].
//!
//! Only state is stored; the derived views (phase, heat and storage status)
//! are recomputed when a row is read back.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use harvestguard_app::ports::SnapshotRepository;
use harvestguard_domain::actuator::{ActuatorState, TargetMoisture};
use harvestguard_domain::error::HarvestGuardError;
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::{DeviceSnapshot, StorageStatus};
use harvestguard_domain::telemetry::HeatStatus;
use harvestguard_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`DeviceSnapshot`].
struct Wrapper(DeviceSnapshot);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<DeviceSnapshot> {
        value.map(|w| w.0)
    }
}

fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let last_update_at: Option<String> = row.try_get("last_update_at")?;
        let target_moisture: f64 = row.try_get("target_moisture")?;
        let temperature: f64 = row.try_get("temperature")?;
        let humidity: f64 = row.try_get("humidity")?;

        let device_id = DeviceId::new(device_id).map_err(decode_error)?;
        let target_moisture = TargetMoisture::new(target_moisture).map_err(decode_error)?;
        let last_update_at = last_update_at
            .map(|value| {
                chrono::DateTime::parse_from_rfc3339(&value)
                    .map(|ts| ts.with_timezone(&chrono::Utc))
            })
            .transpose()
            .map_err(decode_error)?;

        let actuator = ActuatorState {
            roof_open: row.try_get("roof_open")?,
            shaker_on: row.try_get("shaker_on")?,
            is_pouring: row.try_get("is_pouring")?,
        };

        Ok(Self(DeviceSnapshot {
            device_id,
            is_online: row.try_get("is_online")?,
            roof_open: actuator.roof_open,
            shaker_on: actuator.shaker_on,
            is_pouring: actuator.is_pouring,
            temperature,
            humidity,
            is_rain_detected: row.try_get("is_rain_detected")?,
            is_sunny: row.try_get("is_sunny")?,
            target_moisture,
            phase: actuator.phase(),
            heat_status: HeatStatus::from_temperature(temperature),
            storage_status: StorageStatus::derive(
                target_moisture.is_reached_by(humidity),
                actuator.is_pouring,
            ),
            last_update_at,
        }))
    }
}

const UPSERT: &str = "INSERT INTO device_snapshots \
    (device_id, is_online, roof_open, shaker_on, is_pouring, temperature, humidity, \
     is_rain_detected, is_sunny, target_moisture, last_update_at, saved_at) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
    ON CONFLICT(device_id) DO UPDATE SET \
    is_online = excluded.is_online, \
    roof_open = excluded.roof_open, \
    shaker_on = excluded.shaker_on, \
    is_pouring = excluded.is_pouring, \
    temperature = excluded.temperature, \
    humidity = excluded.humidity, \
    is_rain_detected = excluded.is_rain_detected, \
    is_sunny = excluded.is_sunny, \
    target_moisture = excluded.target_moisture, \
    last_update_at = excluded.last_update_at, \
    saved_at = excluded.saved_at";
const SELECT_BY_ID: &str = "SELECT * FROM device_snapshots WHERE device_id = ?";
const SELECT_ALL: &str = "SELECT * FROM device_snapshots ORDER BY device_id";
const DELETE_BY_ID: &str = "DELETE FROM device_snapshots WHERE device_id = ?";

/// `SQLite`-backed snapshot repository.
pub struct SqliteSnapshotRepository {
    pool: SqlitePool,
}

impl SqliteSnapshotRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn rfc3339(ts: Timestamp) -> String {
    ts.to_rfc3339()
}

impl SnapshotRepository for SqliteSnapshotRepository {
    fn save(
        &self,
        snapshot: DeviceSnapshot,
        saved_at: Timestamp,
    ) -> impl Future<Output = Result<DeviceSnapshot, HarvestGuardError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(UPSERT)
                .bind(snapshot.device_id.as_str())
                .bind(snapshot.is_online)
                .bind(snapshot.roof_open)
                .bind(snapshot.shaker_on)
                .bind(snapshot.is_pouring)
                .bind(snapshot.temperature)
                .bind(snapshot.humidity)
                .bind(snapshot.is_rain_detected)
                .bind(snapshot.is_sunny)
                .bind(snapshot.target_moisture.percent())
                .bind(snapshot.last_update_at.map(rfc3339))
                .bind(rfc3339(saved_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(snapshot)
        }
    }

    fn get(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceSnapshot>, HarvestGuardError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(device_id)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(
        &self,
    ) -> impl Future<Output = Result<Vec<DeviceSnapshot>, HarvestGuardError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn delete(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<(), HarvestGuardError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        async move {
            sqlx::query(DELETE_BY_ID)
                .bind(device_id)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use harvestguard_domain::actuator::DryingPhase;
    use harvestguard_domain::telemetry::{DeviceTelemetry, TelemetryReading};

    async fn setup() -> SqliteSnapshotRepository {
        Database::connect("sqlite::memory:", 1)
            .await
            .unwrap()
            .snapshots()
    }

    // whole seconds survive the RFC 3339 round trip exactly
    fn at(secs: i64) -> Timestamp {
        chrono::DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn saved_at() -> Timestamp {
        at(1_717_236_060)
    }

    fn dryer(id: &str) -> DeviceId {
        DeviceId::new(id).unwrap()
    }

    fn snapshot(id: &str, humidity: f64, actuator: ActuatorState) -> DeviceSnapshot {
        let mut telemetry = DeviceTelemetry::new(dryer(id));
        telemetry.record(
            TelemetryReading {
                temperature: 43.5,
                humidity,
                is_rain_detected: !actuator.roof_open,
                is_sunny: actuator.roof_open,
            },
            None,
            at(1_717_236_000),
        );
        DeviceSnapshot::new(&telemetry, actuator, TargetMoisture::default())
    }

    fn pouring() -> ActuatorState {
        ActuatorState {
            roof_open: false,
            shaker_on: false,
            is_pouring: true,
        }
    }

    #[tokio::test]
    async fn should_save_and_retrieve_snapshot() {
        let repo = setup().await;
        let saved = snapshot("dryer-01", 13.0, pouring());

        repo.save(saved.clone(), saved_at()).await.unwrap();

        let fetched = repo.get(&dryer("dryer-01")).await.unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert_eq!(fetched.phase, DryingPhase::Pouring);
        assert_eq!(fetched.storage_status, StorageStatus::Transferring);
    }

    #[tokio::test]
    async fn should_store_given_save_time_rather_than_wall_clock() {
        let repo = setup().await;
        let saved_at = at(1_000_000_000);

        repo.save(snapshot("dryer-01", 18.0, ActuatorState::default()), saved_at)
            .await
            .unwrap();

        let stored: String =
            sqlx::query_scalar("SELECT saved_at FROM device_snapshots WHERE device_id = ?")
                .bind("dryer-01")
                .fetch_one(&repo.pool)
                .await
                .unwrap();
        assert_eq!(stored, saved_at.to_rfc3339());
    }

    #[tokio::test]
    async fn should_return_none_when_snapshot_not_found() {
        let repo = setup().await;
        assert!(repo.get(&dryer("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_replace_snapshot_when_saved_twice() {
        let repo = setup().await;
        repo.save(snapshot("dryer-01", 18.0, ActuatorState::default()), saved_at())
            .await
            .unwrap();
        repo.save(snapshot("dryer-01", 13.0, pouring()), saved_at())
            .await
            .unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_pouring);
    }

    #[tokio::test]
    async fn should_keep_missing_last_update_as_none() {
        let repo = setup().await;
        let never_reported = DeviceSnapshot::new(
            &DeviceTelemetry::new(dryer("dryer-02")),
            ActuatorState::default(),
            TargetMoisture::default(),
        );

        repo.save(never_reported.clone(), saved_at()).await.unwrap();

        let fetched = repo.get(&dryer("dryer-02")).await.unwrap().unwrap();
        assert_eq!(fetched.last_update_at, None);
        assert_eq!(fetched, never_reported);
    }

    #[tokio::test]
    async fn should_list_all_snapshots_ordered_by_device_id() {
        let repo = setup().await;
        for id in ["dryer-03", "dryer-01", "dryer-02"] {
            repo.save(snapshot(id, 18.0, ActuatorState::default()), saved_at())
                .await
                .unwrap();
        }

        let ids: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.device_id.to_string())
            .collect();
        assert_eq!(ids, vec!["dryer-01", "dryer-02", "dryer-03"]);
    }

    #[tokio::test]
    async fn should_delete_snapshot() {
        let repo = setup().await;
        repo.save(snapshot("dryer-01", 18.0, ActuatorState::default()), saved_at())
            .await
            .unwrap();

        repo.delete(&dryer("dryer-01")).await.unwrap();

        assert!(repo.get(&dryer("dryer-01")).await.unwrap().is_none());
        repo.delete(&dryer("dryer-01")).await.unwrap();
    }
}
