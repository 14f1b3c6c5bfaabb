//! 内存状态持久化实现
//!
//! 以 `(collection, id)` 为键保存状态行，适用于测试与演示；
//! 并发写同一标识时由 `DashMap` 分片锁决定先后，后写者胜。
//!
use crate::{
    error::StorageResult as Result,
    persist::{AggregateState, StatePersister},
};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryStatePersister {
    rows: DashMap<(String, String), AggregateState>,
}

impl InMemoryStatePersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部集合中的状态行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 指定集合中的全部状态行（按标识排序）
    pub fn rows(&self, collection: &str) -> Vec<AggregateState> {
        let mut rows: Vec<AggregateState> = self
            .rows
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }
}

#[async_trait]
impl StatePersister for InMemoryStatePersister {
    async fn upsert(&self, state: &AggregateState) -> Result<()> {
        self.rows.insert(
            (state.collection().to_string(), state.id().to_string()),
            state.clone(),
        );
        Ok(())
    }

    async fn find(&self, collection: &str, id: &str) -> Result<Option<AggregateState>> {
        Ok(self
            .rows
            .get(&(collection.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }
}
