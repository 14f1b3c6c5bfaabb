//! 状态持久化（persist）
//!
//! 定义聚合状态行（`AggregateState`）与状态持久化协议（`StatePersister`），
//! 并提供内存实现与基于 sqlx 的 Postgres 实现（`infra-sqlx` 特性）。
//!
//! 该模块拥有物理表结构：每个集合一张表，列为 `id`、`state`、`timestamp`。
//!
mod aggregate_state;
mod in_memory;
#[cfg(feature = "infra-sqlx")]
mod postgres;
mod state_persister;

pub use aggregate_state::AggregateState;
pub use in_memory::InMemoryStatePersister;
#[cfg(feature = "infra-sqlx")]
pub use postgres::PostgresStatePersister;
pub use state_persister::StatePersister;

/// 默认集合（表）名
pub const DEFAULT_COLLECTION: &str = "entities";

/// 集合名需可直接作为 SQL 标识符：`[a-z_][a-z0-9_]*`，不超过 63 字节
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
