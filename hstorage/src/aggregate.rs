//! 聚合（Aggregate）抽象
//!
//! 聚合是以单条状态行持久化的领域对象：
//! - 通过 `Entity` 约束聚合具备标识；
//! - `TYPE` 为类型标签，用于多态加载时解析具体类型；
//! - `COLLECTION` 指定所在的集合（表），缺省时使用映射配置的默认集合。
//!
use crate::entity::Entity;
use serde::{Serialize, de::DeserializeOwned};

/// 聚合根接口
///
/// `Default` 用于在注册期探测类型的序列化形态，校验 `id` 字段约定。
pub trait Aggregate: Entity + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    const COLLECTION: Option<&'static str> = None;
}
