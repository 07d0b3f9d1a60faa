use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::sync::Mutex;

use crate::metrics::STORE_INSERTS_TOTAL;

/// Relational store for submitted quiz results: one row per submission in
/// the `UserData` table, `json_data` an opaque JSON text blob.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, user_name: &str, user_id: &str, json_data: &serde_json::Value)
        -> Result<()>;
    async fn ping(&self) -> Result<()>;
}

pub struct MySqlSubmissionStore {
    pool: MySqlPool,
}

impl MySqlSubmissionStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to MySQL")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS UserData (
                id INT AUTO_INCREMENT PRIMARY KEY,
                UserName VARCHAR(255) NOT NULL,
                json_data TEXT NOT NULL,
                UserID VARCHAR(255) NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to ensure UserData table")?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for MySqlSubmissionStore {
    async fn insert(
        &self,
        user_name: &str,
        user_id: &str,
        json_data: &serde_json::Value,
    ) -> Result<()> {
        let result = sqlx::query("INSERT INTO UserData (UserName, json_data, UserID) VALUES (?, ?, ?)")
            .bind(user_name)
            .bind(json_data.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                STORE_INSERTS_TOTAL.with_label_values(&["ok"]).inc();
                tracing::info!("Quiz submission stored: user_id={}", user_id);
                Ok(())
            }
            Err(e) => {
                STORE_INSERTS_TOTAL.with_label_values(&["error"]).inc();
                Err(e).context("Failed to insert quiz submission")
            }
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }
}

/// Row as recorded by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSubmission {
    pub user_name: String,
    pub user_id: String,
    pub json_data: String,
}

/// In-memory store used by integration tests.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    rows: Mutex<Vec<StoredSubmission>>,
}

impl MemorySubmissionStore {
    pub fn rows(&self) -> Vec<StoredSubmission> {
        self.rows.lock().expect("store lock poisoned").clone()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn insert(
        &self,
        user_name: &str,
        user_id: &str,
        json_data: &serde_json::Value,
    ) -> Result<()> {
        self.rows.lock().expect("store lock poisoned").push(StoredSubmission {
            user_name: user_name.to_string(),
            user_id: user_id.to_string(),
            json_data: json_data.to_string(),
        });
        STORE_INSERTS_TOTAL.with_label_values(&["ok"]).inc();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
