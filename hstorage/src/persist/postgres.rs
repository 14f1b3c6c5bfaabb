//! 基于 Postgres（sqlx）的状态持久化实现
//!
//! 每个集合对应一张表：
//!
//! ```sql
//! create table <collection>
//! (
//!     id        varchar(50) primary key,
//!     state     jsonb       not null,
//!     timestamp timestamptz not null
//! )
//! ```
//!
use crate::{
    config::DatabaseConfig,
    error::{StorageError, StorageResult as Result},
    persist::{AggregateState, StatePersister, is_valid_collection_name},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PostgresStatePersister {
    pool: PgPool,
}

impl PostgresStatePersister {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按数据库配置建立连接池
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!(max_connections = config.max_connections, "postgres pool connected");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 创建集合对应的表（已存在时不做任何事）
    pub async fn create_collection(&self, collection: &str) -> Result<()> {
        let table = table_name(collection)?;
        let sql = format!(
            "create table if not exists {table} \
             (id varchar(50) primary key, state jsonb not null, timestamp timestamptz not null)"
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(collection, "collection table created");
        Ok(())
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<()> {
        let table = table_name(collection)?;
        let sql = format!("drop table if exists {table}");
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(collection, "collection table dropped");
        Ok(())
    }
}

#[async_trait]
impl StatePersister for PostgresStatePersister {
    async fn upsert(&self, state: &AggregateState) -> Result<()> {
        let table = table_name(state.collection())?;
        let sql = format!(
            "insert into {table} (id, state, timestamp) values ($1, $2::jsonb, $3) \
             on conflict (id) do update set state = excluded.state, timestamp = excluded.timestamp"
        );
        let result = sqlx::query(&sql)
            .bind(state.id())
            .bind(state.content())
            .bind(state.timestamp())
            .execute(&self.pool)
            .await?;
        debug!(
            collection = state.collection(),
            id = state.id(),
            rows_affected = result.rows_affected(),
            "state row upserted"
        );
        Ok(())
    }

    async fn find(&self, collection: &str, id: &str) -> Result<Option<AggregateState>> {
        let table = table_name(collection)?;
        let sql = format!("select id, state::text as state, timestamp from {table} where id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let state = row.map(|row| map_row(collection, &row)).transpose()?;
        Ok(state)
    }
}

fn table_name(collection: &str) -> Result<String> {
    if !is_valid_collection_name(collection) {
        return Err(StorageError::Database {
            reason: format!("invalid collection name '{collection}'"),
            source: None,
        });
    }
    Ok(format!("\"{collection}\""))
}

fn map_row(collection: &str, row: &PgRow) -> std::result::Result<AggregateState, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let content: String = row.try_get("state")?;
    let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
    Ok(AggregateState::builder()
        .collection(collection)
        .id(id)
        .content(content)
        .timestamp(timestamp)
        .build())
}
