//! 存储编排器（Storage）
//!
//! 对外提供 `save`/`load` 契约：
//! 1. 保存：经模型映射提取标识与类型标签 → 序列化（按需内嵌 `@type`）→ 取当前时刻 → 写入状态行；
//! 2. 加载：读取状态行 → 不存在则报错 → 依据标签解析具体类型 → 反序列化并转换为期望类型。
//!
//! 时间戳截断到微秒，任一持久化实现读回的时刻都与写入时一致。
//!
//! 每次调用只发出一条持久化语句，不加锁、不做版本校验；同一标识的并发保存以存储侧提交顺序为准。
//!
use crate::{
    aggregate::Aggregate,
    clock::{Clock, SystemClock},
    entity::ID_FIELD,
    error::{MappingError, StorageError, StorageResult as Result},
    mapping::{ModelMapping, TYPE_FIELD, TypeDescriptor},
    persist::{AggregateState, StatePersister},
};
use chrono::SubsecRound;
use serde_json::Value;
use std::{any::type_name, sync::Arc};
use tracing::debug;

/// 状态行时间戳保留的小数位数（微秒，与 `timestamptz` 一致）
pub const TIMESTAMP_PRECISION: u16 = 6;

pub struct Storage<P>
where
    P: StatePersister,
{
    mapping: Arc<ModelMapping>,
    persister: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<P> Storage<P>
where
    P: StatePersister,
{
    pub fn new(mapping: Arc<ModelMapping>, persister: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            mapping,
            persister,
            clock,
        }
    }

    pub fn with_system_clock(mapping: Arc<ModelMapping>, persister: Arc<P>) -> Self {
        Self::new(mapping, persister, Arc::new(SystemClock))
    }

    pub fn mapping(&self) -> &ModelMapping {
        &self.mapping
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// 保存聚合的完整状态（存在则整体覆盖）
    pub async fn save<A: Aggregate>(&self, aggregate: &A) -> Result<()> {
        let id = self.mapping.extract_identity(aggregate)?;
        let descriptor = self.mapping.descriptor_for::<A>()?;
        let content = encode_content(descriptor, aggregate)?;

        let state = AggregateState::builder()
            .collection(descriptor.collection())
            .id(id)
            .content(content)
            .timestamp(self.clock.now().trunc_subsecs(TIMESTAMP_PRECISION))
            .build();

        self.persister.upsert(&state).await?;

        debug!(
            collection = state.collection(),
            id = state.id(),
            tag = descriptor.tag(),
            "aggregate state saved"
        );
        Ok(())
    }

    /// 按标识加载聚合；`T` 可以是具体类型，也可以是多态层级根类型
    pub async fn load<T: 'static>(&self, id: &str) -> Result<T> {
        self.find::<T>(id)
            .await?
            .ok_or_else(|| StorageError::AggregateNotFound {
                id: id.to_string(),
                type_name: type_name::<T>(),
            })
    }

    /// 与 `load` 相同，但不存在时返回 `None`
    pub async fn find<T: 'static>(&self, id: &str) -> Result<Option<T>> {
        let collection = self.mapping.collection_for::<T>()?;

        let Some(state) = self.persister.find(collection, id).await? else {
            debug!(collection, id, expected = type_name::<T>(), "aggregate state not found");
            return Ok(None);
        };

        let aggregate = decode_content::<T>(&self.mapping, state.content())?;
        debug!(collection, id, "aggregate state loaded");
        Ok(Some(aggregate))
    }
}

impl<P> Clone for Storage<P>
where
    P: StatePersister,
{
    fn clone(&self) -> Self {
        Self {
            mapping: Arc::clone(&self.mapping),
            persister: Arc::clone(&self.persister),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// 序列化聚合：`id` 与声明字段按声明顺序，多态类型在末尾追加 `@type`
fn encode_content<A: Aggregate>(descriptor: &TypeDescriptor, aggregate: &A) -> Result<String> {
    let mut value = serde_json::to_value(aggregate)?;

    let missing_identity = MappingError::MissingIdentity {
        type_name: descriptor.type_name(),
        field: ID_FIELD,
    };
    let object = value.as_object_mut().ok_or(missing_identity.clone())?;
    if !object.contains_key(ID_FIELD) {
        return Err(missing_identity.into());
    }
    if object.contains_key(TYPE_FIELD) {
        return Err(MappingError::ReservedField {
            type_name: descriptor.type_name(),
            field: TYPE_FIELD,
        }
        .into());
    }
    if descriptor.is_polymorphic() {
        object.insert(
            TYPE_FIELD.to_string(),
            Value::String(descriptor.tag().to_string()),
        );
    }

    Ok(serde_json::to_string(&value)?)
}

/// 解析内容：取出 `@type`（若有），解析解码类型并转换为期望类型 `T`
fn decode_content<T: 'static>(mapping: &ModelMapping, content: &str) -> Result<T> {
    let mut value: Value = serde_json::from_str(content)?;

    let tag = match value.as_object_mut().and_then(|o| o.remove(TYPE_FIELD)) {
        Some(Value::String(tag)) => Some(tag),
        Some(other) => {
            return Err(MappingError::UnknownTypeTag {
                expected: type_name::<T>(),
                field: TYPE_FIELD,
                tag: other.to_string(),
            }
            .into());
        }
        None => None,
    };

    let descriptor = mapping.resolve_type::<T>(tag.as_deref())?;
    descriptor.decode_into::<T>(value)
}
