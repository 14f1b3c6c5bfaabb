//! 状态持久化协议
//!
//! 以 `(collection, id)` 为键读写单条状态行；每次调用对应存储侧的一条语句，
//! 原子性由底层存储保证。
//!
use crate::{error::StorageResult as Result, persist::AggregateState};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait StatePersister: Send + Sync {
    /// 不存在则插入，存在则整体替换（后写者胜，不做版本校验）
    async fn upsert(&self, state: &AggregateState) -> Result<()>;

    /// 按标识读取状态行，不存在时返回 `None`
    async fn find(&self, collection: &str, id: &str) -> Result<Option<AggregateState>>;
}

#[async_trait]
impl<T> StatePersister for Arc<T>
where
    T: StatePersister + ?Sized,
{
    async fn upsert(&self, state: &AggregateState) -> Result<()> {
        (**self).upsert(state).await
    }

    async fn find(&self, collection: &str, id: &str) -> Result<Option<AggregateState>> {
        (**self).find(collection, id).await
    }
}
