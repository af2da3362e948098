// src/store/sqlite.rs
// SQLite-backed BranchStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Acquire, Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DriftError, DriftResult};
use crate::similarity;

use super::models::{Branch, BranchSummary, DriftType, Message, Role};
use super::BranchStore;

pub struct SqliteBranchStore {
    pool: SqlitePool,
}

impl SqliteBranchStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl BranchStore for SqliteBranchStore {
    async fn upsert_conversation(&self, conversation_id: &str) -> DriftResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO conversations (id, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if DriftError::is_unique_violation(&e) => {
                // Construct-and-discard: this is the `Conflict` case in the
                // error taxonomy, but a concurrent conversation upsert is
                // success, not a failure, so it never leaves this function.
                let _ = DriftError::Conflict(format!(
                    "conversation {} already exists",
                    conversation_id
                ));
                debug!(
                    "conversation {} already exists, treating as success",
                    conversation_id
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_branches(&self, conversation_id: &str) -> DriftResult<Vec<BranchSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.summary, b.centroid, b.parent_branch_id, b.drift_type, b.updated_at,
                   (SELECT COUNT(*) FROM messages m WHERE m.branch_id = b.id) as message_count
            FROM branches b
            WHERE b.conversation_id = ?
            ORDER BY b.updated_at DESC, b.id DESC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let drift_type_str: String = row.get("drift_type");
            let drift_type = DriftType::parse(&drift_type_str).unwrap_or(DriftType::Semantic);
            let centroid_blob: Vec<u8> = row.get("centroid");

            summaries.push(BranchSummary {
                id: row.get("id"),
                summary: row.get("summary"),
                message_count: row.get::<i64, _>("message_count") as u32,
                centroid: blob_to_vec(&centroid_blob),
                parent_id: row.get("parent_branch_id"),
                drift_type,
                updated_at: row.get("updated_at"),
                is_current: false,
            });
        }

        Ok(summaries)
    }

    async fn load_last_message_content(&self, branch_id: &str) -> DriftResult<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT content FROM messages
            WHERE branch_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<String, _>("content")))
    }

    async fn load_branch(&self, branch_id: &str) -> DriftResult<Branch> {
        let row = sqlx::query(
            r#"
            SELECT id, conversation_id, parent_branch_id, summary, centroid, drift_type,
                   depth, created_at, updated_at
            FROM branches WHERE id = ?
            "#,
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DriftError::not_found(format!("branch {} not found", branch_id)))?;

        row_to_branch(&row)
    }

    async fn create_branch(
        &self,
        conversation_id: &str,
        parent_branch_id: Option<&str>,
        summary: &str,
        centroid: &[f32],
        drift_type: DriftType,
    ) -> DriftResult<Branch> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let depth = match parent_branch_id {
            Some(parent_id) => {
                let parent = self.load_branch(parent_id).await?;
                parent.depth + 1
            }
            None => 0,
        };

        sqlx::query(
            r#"
            INSERT INTO branches
                (id, conversation_id, parent_branch_id, summary, centroid, drift_type, depth, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(parent_branch_id)
        .bind(summary)
        .bind(vec_to_blob(centroid))
        .bind(drift_type.as_str())
        .bind(depth as i64)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Branch {
            id,
            conversation_id: conversation_id.to_string(),
            parent_branch_id: parent_branch_id.map(|s| s.to_string()),
            summary: summary.to_string(),
            centroid: centroid.to_vec(),
            drift_type,
            depth,
            created_at: now,
            updated_at: now,
        })
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        branch_id: &str,
        role: Role,
        content: &str,
        embedding: &[f32],
    ) -> DriftResult<Message> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, branch_id, role, content, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(branch_id)
        .bind(role.as_str())
        .bind(content)
        .bind(vec_to_blob(embedding))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            branch_id: branch_id.to_string(),
            role,
            content: content.to_string(),
            embedding: embedding.to_vec(),
            created_at: now,
        })
    }

    async fn update_centroid(&self, branch_id: &str, centroid: &[f32]) -> DriftResult<()> {
        let now = Utc::now();
        sqlx::query("UPDATE branches SET centroid = ?, updated_at = ? WHERE id = ?")
            .bind(vec_to_blob(centroid))
            .bind(now)
            .bind(branch_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn commit_message_with_centroid(
        &self,
        conversation_id: &str,
        branch_id: &str,
        role: Role,
        content: &str,
        embedding: &[f32],
        update_centroid: bool,
    ) -> DriftResult<Message> {
        // `BEGIN IMMEDIATE` takes SQLite's write lock up front, rather than at
        // the first write statement (the default deferred `BEGIN`'s
        // behavior). Without it, two concurrent transactions on the same
        // branch can both execute their SELECTs before either writes, so both
        // compute `update_centroid` from the same stale prior state and the
        // second commit silently clobbers the first's update (§5).
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let branch_row = sqlx::query("SELECT centroid FROM branches WHERE id = ?")
            .bind(branch_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DriftError::not_found(format!("branch {} not found", branch_id)))?;
        let old_centroid_blob: Vec<u8> = branch_row.get("centroid");
        let old_centroid = blob_to_vec(&old_centroid_blob);

        let count_row = sqlx::query("SELECT COUNT(*) as n FROM messages WHERE branch_id = ?")
            .bind(branch_id)
            .fetch_one(&mut *tx)
            .await?;
        let prior_count = count_row.get::<i64, _>("n") as u32;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, branch_id, role, content, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(branch_id)
        .bind(role.as_str())
        .bind(content)
        .bind(vec_to_blob(embedding))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if update_centroid {
            let new_centroid = similarity::update_centroid(&old_centroid, embedding, prior_count, role);
            sqlx::query("UPDATE branches SET centroid = ?, updated_at = ? WHERE id = ?")
                .bind(vec_to_blob(&new_centroid))
                .bind(now)
                .bind(branch_id)
                .execute(&mut *tx)
                .await?;
        } else {
            warn!("commit_message_with_centroid called without centroid update for branch {}", branch_id);
        }

        tx.commit().await?;

        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            branch_id: branch_id.to_string(),
            role,
            content: content.to_string(),
            embedding: embedding.to_vec(),
            created_at: now,
        })
    }
}

fn row_to_branch(row: &sqlx::sqlite::SqliteRow) -> DriftResult<Branch> {
    let drift_type_str: String = row.get("drift_type");
    let drift_type = DriftType::parse(&drift_type_str)
        .ok_or_else(|| DriftError::internal(format!("invalid drift_type {}", drift_type_str)))?;
    let centroid_blob: Vec<u8> = row.get("centroid");

    Ok(Branch {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        parent_branch_id: row.get("parent_branch_id"),
        summary: row.get("summary"),
        centroid: blob_to_vec(&centroid_blob),
        drift_type,
        depth: row.get::<i64, _>("depth") as u32,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
