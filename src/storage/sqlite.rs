//! SQLite storage implementation

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use super::traits::{InferenceRecord, ResultStorage};
use crate::engine::decoder::BoundingBox;
use crate::engine::registry::{ModelType, OutputKind};

const SELECT_COLUMNS: &str = "id, model_type, kind, image_data, predicted_class, probability_scores, bbox, class_name, score, created_at";

/// SQLite-based result storage
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage
    pub async fn new(db_path: &str) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", db_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let storage = Self { pool };
        storage.initialize().await?;

        Ok(storage)
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inference_results (
                id TEXT PRIMARY KEY,
                model_type TEXT NOT NULL,
                kind TEXT NOT NULL,
                image_data TEXT,
                predicted_class TEXT,
                probability_scores TEXT,
                bbox TEXT,
                class_name TEXT,
                score REAL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_inference_results_created_at ON inference_results(created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("SQLite database initialized");
        Ok(())
    }
}

fn kind_as_str(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Classification => "classification",
        OutputKind::Detection => "detection",
    }
}

fn parse_kind(value: &str) -> Result<OutputKind> {
    match value {
        "classification" => Ok(OutputKind::Classification),
        "detection" => Ok(OutputKind::Detection),
        other => anyhow::bail!("Unknown record kind: {}", other),
    }
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to serialize record field")
}

fn from_json<T: serde::de::DeserializeOwned>(value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| serde_json::from_str(&v))
        .transpose()
        .context("Corrupted record field")
}

fn row_to_record(row: SqliteRow) -> Result<InferenceRecord> {
    let model_type: String = row.get("model_type");
    let kind: String = row.get("kind");
    let score: Option<f64> = row.get("score");

    Ok(InferenceRecord {
        id: row.get("id"),
        model_type: model_type.parse::<ModelType>()?,
        kind: parse_kind(&kind)?,
        image_data: row.get("image_data"),
        predicted_class: row.get("predicted_class"),
        probability_scores: from_json::<Vec<f32>>(row.get("probability_scores"))?,
        bbox: from_json::<BoundingBox>(row.get("bbox"))?,
        class_name: row.get("class_name"),
        score: score.map(|s| s as f32),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ResultStorage for SqliteStorage {
    async fn add(&self, record: InferenceRecord) -> Result<InferenceRecord> {
        sqlx::query(
            r#"
            INSERT INTO inference_results (id, model_type, kind, image_data, predicted_class, probability_scores, bbox, class_name, score, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.model_type.as_str())
        .bind(kind_as_str(record.kind))
        .bind(&record.image_data)
        .bind(&record.predicted_class)
        .bind(to_json(&record.probability_scores)?)
        .bind(to_json(&record.bbox)?)
        .bind(&record.class_name)
        .bind(record.score.map(f64::from))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!("Saved record: {}", record.id);
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<InferenceRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM inference_results WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_record).transpose()
    }

    async fn get_all(&self) -> Result<Vec<InferenceRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM inference_results ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn update(&self, record: &InferenceRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inference_results
            SET model_type = ?, kind = ?, image_data = ?, predicted_class = ?, probability_scores = ?,
                bbox = ?, class_name = ?, score = ?, created_at = ?
            WHERE id = ?
            "#,
        )
        .bind(record.model_type.as_str())
        .bind(kind_as_str(record.kind))
        .bind(&record.image_data)
        .bind(&record.predicted_class)
        .bind(to_json(&record.probability_scores)?)
        .bind(to_json(&record.bbox)?)
        .bind(&record.class_name)
        .bind(record.score.map(f64::from))
        .bind(record.created_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inference_results WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM inference_results")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }
}
