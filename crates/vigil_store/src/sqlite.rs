use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use vigil_core::{EpisodeRecord, ProfileStore, RecordStore, SubjectProfile};

/// SQLite-backed record store. Records are persisted as one JSON document
/// per subject; a single upsert keeps each write all-or-nothing.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let pool = open_pool(db_path.as_ref()).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Share an already-open pool (e.g. with the profile store).
    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> Pool<Sqlite> {
        self.pool.clone()
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episode_records (
                subject_id TEXT PRIMARY KEY,
                record TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create episode_records table")?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, subject_id: &str) -> Result<Option<EpisodeRecord>> {
        let row = sqlx::query("SELECT record FROM episode_records WHERE subject_id = ?")
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read episode record")?;
        match row {
            Some(row) => {
                let json: String = row.get("record");
                let record = serde_json::from_str(&json)
                    .context("Failed to deserialize episode record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, subject_id: &str, record: &EpisodeRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize episode record")?;
        sqlx::query(
            r#"
            INSERT INTO episode_records (subject_id, record, updated_at)
            VALUES (?, ?, strftime('%s', 'now'))
            ON CONFLICT(subject_id) DO UPDATE SET
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(subject_id)
        .bind(json)
        .execute(&self.pool)
        .await
        .context("Failed to write episode record")?;
        Ok(())
    }
}

/// SQLite-backed profile store. Read-only from Vigil's perspective; the
/// table is populated by the onboarding/profile service.
#[derive(Clone)]
pub struct SqliteProfileStore {
    pool: Pool<Sqlite>,
}

impl SqliteProfileStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let pool = open_pool(db_path.as_ref()).await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subject_profiles (
                subject_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                contact_address TEXT NOT NULL,
                lifestyle_score INTEGER NOT NULL,
                medical_history TEXT NOT NULL DEFAULT '[]'
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create subject_profiles table")?;
        Ok(())
    }

    /// Seeding helper for dev and tests.
    pub async fn upsert(&self, subject_id: &str, profile: &SubjectProfile) -> Result<()> {
        let history = serde_json::to_string(&profile.medical_history)
            .context("Failed to serialize medical history")?;
        sqlx::query(
            r#"
            INSERT INTO subject_profiles
                (subject_id, name, contact_address, lifestyle_score, medical_history)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(subject_id) DO UPDATE SET
                name = excluded.name,
                contact_address = excluded.contact_address,
                lifestyle_score = excluded.lifestyle_score,
                medical_history = excluded.medical_history
            "#,
        )
        .bind(subject_id)
        .bind(&profile.name)
        .bind(&profile.contact_address)
        .bind(profile.lifestyle_score as i64)
        .bind(history)
        .execute(&self.pool)
        .await
        .context("Failed to write subject profile")?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get(&self, subject_id: &str) -> Result<Option<SubjectProfile>> {
        let row = sqlx::query(
            "SELECT name, contact_address, lifestyle_score, medical_history \
             FROM subject_profiles WHERE subject_id = ?",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read subject profile")?;
        match row {
            Some(row) => {
                let history: String = row.get("medical_history");
                Ok(Some(SubjectProfile {
                    name: row.get("name"),
                    contact_address: row.get("contact_address"),
                    lifestyle_score: row.get::<i64, _>("lifestyle_score") as u8,
                    medical_history: serde_json::from_str(&history)
                        .context("Failed to deserialize medical history")?,
                }))
            }
            None => Ok(None),
        }
    }
}

async fn open_pool(db_path: &Path) -> Result<Pool<Sqlite>> {
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .context("Failed to connect to SQLite database")
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::RiskLevel;

    async fn temp_store() -> (tempfile::TempDir, SqliteRecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRecordStore::new(dir.path().join("vigil.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn missing_record_reads_as_none() {
        let (_dir, store) = temp_store().await;
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_roundtrip_and_upsert() {
        let (_dir, store) = temp_store().await;

        let mut rec = EpisodeRecord::default();
        rec.status = RiskLevel::Red;
        rec.notified = true;
        rec.advisory_text = "call for help".into();
        rec.consecutive_green = 2;
        store.put("s1", &rec).await.unwrap();

        let back = store.get("s1").await.unwrap().unwrap();
        assert_eq!(back.status, RiskLevel::Red);
        assert!(back.notified);
        assert_eq!(back.consecutive_green, 2);

        // Overwrite in place.
        rec.status = RiskLevel::Green;
        rec.notified = false;
        store.put("s1", &rec).await.unwrap();
        let back = store.get("s1").await.unwrap().unwrap();
        assert_eq!(back.status, RiskLevel::Green);
        assert!(!back.notified);
    }

    #[tokio::test]
    async fn profile_roundtrip_with_shared_pool() {
        let dir = tempfile::tempdir().unwrap();
        let records = SqliteRecordStore::new(dir.path().join("vigil.db"))
            .await
            .unwrap();
        let profiles = SqliteProfileStore::with_pool(records.pool()).await.unwrap();

        let profile = SubjectProfile {
            name: "Grace".into(),
            contact_address: "+15550123".into(),
            lifestyle_score: 65,
            medical_history: vec!["hypertension".into()],
        };
        profiles.upsert("s9", &profile).await.unwrap();

        let back = profiles.get("s9").await.unwrap().unwrap();
        assert_eq!(back, profile);
        assert!(profiles.get("missing").await.unwrap().is_none());
    }
}
