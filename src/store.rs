//! Flag storage seen from the evaluation side.
//!
//! Stores hand out flags already scoped to one tenant; evaluation performs no
//! tenant checks of its own.
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::evaluation::{Flag, RuleLogic};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to read flags file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid flags file: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Flags of the project plus the tenant-level flags (no project).
    async fn project_flags(&self, tenant_id: Uuid, project_id: Uuid) -> Result<Vec<Flag>, StoreError>;

    /// `None` when the flag does not resolve within the tenant/project scope.
    async fn project_flag(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        flag_id: Uuid,
    ) -> Result<Option<Flag>, StoreError>;
}

fn in_scope(flag: &Flag, tenant_id: Uuid, project_id: Uuid) -> bool {
    flag.tenant_id == tenant_id && flag.project_id.map_or(true, |id| id == project_id)
}

// Database row for the flags table
#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    id: Uuid,
    tenant_id: Uuid,
    project_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    enabled: bool,
    rules: Option<Json<serde_json::Value>>,
    rule_logic: Option<String>,
}

impl From<FlagRow> for Flag {
    fn from(row: FlagRow) -> Self {
        let rule_logic = row
            .rule_logic
            .as_deref()
            .map(RuleLogic::from)
            .unwrap_or_default();

        // A flag whose rules cannot be read is served switched off. NULL is
        // not "no rules": that would enable the flag for everyone.
        let decoded = match row.rules {
            Some(Json(raw)) => serde_json::from_value(raw).map_err(|e| e.to_string()),
            None => Err("rules column is NULL".to_string()),
        };
        let (enabled, rules) = match decoded {
            Ok(rules) => (row.enabled, rules),
            Err(e) => {
                tracing::warn!(flag_id = %row.id, error = %e, "Undecodable rules, serving flag as disabled");
                (false, Vec::new())
            }
        };

        Flag {
            id: row.id,
            tenant_id: row.tenant_id,
            project_id: row.project_id,
            name: row.name,
            description: row.description,
            enabled,
            rules,
            rule_logic,
        }
    }
}

/// Postgres-backed store reading the `flags` table.
#[derive(Clone)]
pub struct PgFlagStore {
    db: PgPool,
}

impl PgFlagStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(db))
    }
}

#[async_trait]
impl FlagStore for PgFlagStore {
    async fn project_flags(&self, tenant_id: Uuid, project_id: Uuid) -> Result<Vec<Flag>, StoreError> {
        let rows: Vec<FlagRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, project_id, name, description, enabled, rules, rule_logic
            FROM flags
            WHERE tenant_id = $1 AND (project_id = $2 OR project_id IS NULL)
            "#,
        )
        .bind(tenant_id)
        .bind(project_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Flag::from).collect())
    }

    async fn project_flag(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        flag_id: Uuid,
    ) -> Result<Option<Flag>, StoreError> {
        let row: Option<FlagRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, project_id, name, description, enabled, rules, rule_logic
            FROM flags
            WHERE id = $1 AND tenant_id = $2 AND (project_id = $3 OR project_id IS NULL)
            "#,
        )
        .bind(flag_id)
        .bind(tenant_id)
        .bind(project_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Flag::from))
    }
}

/// Flags held in memory, e.g. loaded from a JSON snapshot.
#[derive(Default)]
pub struct InMemoryFlagStore {
    flags: RwLock<HashMap<Uuid, Flag>>,
}

impl InMemoryFlagStore {
    pub fn new(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self {
            flags: RwLock::new(flags.into_iter().map(|flag| (flag.id, flag)).collect()),
        }
    }

    /// Loads a JSON array of flags.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = tokio::fs::read(path).await?;
        let flags: Vec<Flag> = serde_json::from_slice(&raw)?;
        Ok(Self::new(flags))
    }

    pub async fn count(&self) -> usize {
        self.flags.read().await.len()
    }
}

#[async_trait]
impl FlagStore for InMemoryFlagStore {
    async fn project_flags(&self, tenant_id: Uuid, project_id: Uuid) -> Result<Vec<Flag>, StoreError> {
        let flags = self.flags.read().await;
        Ok(flags
            .values()
            .filter(|flag| in_scope(flag, tenant_id, project_id))
            .cloned()
            .collect())
    }

    async fn project_flag(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        flag_id: Uuid,
    ) -> Result<Option<Flag>, StoreError> {
        let flags = self.flags.read().await;
        Ok(flags
            .get(&flag_id)
            .filter(|flag| in_scope(flag, tenant_id, project_id))
            .cloned())
    }
}
