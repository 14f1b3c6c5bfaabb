//! 模型映射（类型注册表）
//!
//! 负责在“任意聚合对象”与“可重建的状态行”之间架桥：
//! - 注册期为每个类型建立类型标签、标识字段与所在集合的绑定（`MappingConfigurer`）；
//! - 保存期提取标识、给出类型标签（`ModelMapping::extract_identity` / `tag_for`）；
//! - 加载期根据内容中的 `@type` 标签解析出具体解码类型（`ModelMapping::resolve_type`）。
//!
//! 映射构建完成后不可变，可通过 `Arc` 在并发的保存/加载调用间只读共享。
//!
mod configurer;
mod type_descriptor;

pub use configurer::MappingConfigurer;
pub use type_descriptor::TypeDescriptor;

use crate::{aggregate::Aggregate, entity::ID_FIELD, error::MappingError};
use std::{
    any::{TypeId, type_name},
    collections::HashMap,
};
use tracing::warn;

/// 内容中内嵌类型标签的保留字段名
pub const TYPE_FIELD: &str = "@type";

type Result<T> = std::result::Result<T, MappingError>;

/// 多态层级的根类型
#[derive(Debug)]
pub(crate) struct Hierarchy {
    pub(crate) type_name: &'static str,
    pub(crate) collection: String,
}

#[derive(Debug)]
pub struct ModelMapping {
    descriptors: Vec<TypeDescriptor>,
    by_tag: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
    hierarchies: HashMap<TypeId, Hierarchy>,
    default_collection: String,
}

impl ModelMapping {
    pub(crate) fn new(
        descriptors: Vec<TypeDescriptor>,
        by_tag: HashMap<String, usize>,
        by_type: HashMap<TypeId, usize>,
        hierarchies: HashMap<TypeId, Hierarchy>,
        default_collection: String,
    ) -> Self {
        Self {
            descriptors,
            by_tag,
            by_type,
            hierarchies,
            default_collection,
        }
    }

    pub fn builder() -> MappingConfigurer {
        MappingConfigurer::new()
    }

    pub fn default_collection(&self) -> &str {
        &self.default_collection
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }

    /// `T` 是否为已注册的具体类型或多态层级根类型
    pub fn is_registered<T: 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.by_type.contains_key(&type_id) || self.hierarchies.contains_key(&type_id)
    }

    pub fn descriptor_for<T: 'static>(&self) -> Result<&TypeDescriptor> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| &self.descriptors[index])
            .ok_or(MappingError::UnregisteredType {
                type_name: type_name::<T>(),
                field: ID_FIELD,
            })
    }

    pub fn descriptor_by_tag(&self, tag: &str) -> Option<&TypeDescriptor> {
        self.by_tag.get(tag).map(|&index| &self.descriptors[index])
    }

    pub fn tag_for<T: 'static>(&self) -> Result<&str> {
        self.descriptor_for::<T>().map(TypeDescriptor::tag)
    }

    /// 提取聚合标识；类型必须已注册且标识非空
    pub fn extract_identity<A: Aggregate>(&self, aggregate: &A) -> Result<String> {
        let descriptor = self.descriptor_for::<A>().map_err(|_| MappingError::MissingIdentity {
            type_name: type_name::<A>(),
            field: ID_FIELD,
        })?;

        let identity = aggregate.identity();
        if identity.is_empty() {
            return Err(MappingError::EmptyIdentity {
                type_name: descriptor.type_name(),
                field: descriptor.identity_field(),
            });
        }
        Ok(identity)
    }

    /// 期望类型 `T` 所在的集合（具体类型或层级根类型）
    pub fn collection_for<T: 'static>(&self) -> Result<&str> {
        let type_id = TypeId::of::<T>();
        if let Some(&index) = self.by_type.get(&type_id) {
            return Ok(self.descriptors[index].collection());
        }
        self.hierarchies
            .get(&type_id)
            .map(|hierarchy| hierarchy.collection.as_str())
            .ok_or(MappingError::UnregisteredType {
                type_name: type_name::<T>(),
                field: ID_FIELD,
            })
    }

    /// 解析以期望类型 `T` 加载时的具体解码类型
    ///
    /// - 有标签：按标签查找，未知标签视为损坏或外来数据；
    /// - 无标签：按 `T` 本身解码，`T` 仅为层级根类型时无法确定具体类型。
    pub fn resolve_type<T: 'static>(&self, tag: Option<&str>) -> Result<&TypeDescriptor> {
        match tag {
            Some(tag) => self.descriptor_by_tag(tag).ok_or_else(|| {
                warn!(tag, expected = type_name::<T>(), "unknown type tag");
                MappingError::UnknownTypeTag {
                    expected: type_name::<T>(),
                    field: TYPE_FIELD,
                    tag: tag.to_string(),
                }
            }),
            None => {
                if self.by_type.contains_key(&TypeId::of::<T>()) {
                    return self.descriptor_for::<T>();
                }
                if self.hierarchies.contains_key(&TypeId::of::<T>()) {
                    return Err(MappingError::MissingTypeTag {
                        expected: type_name::<T>(),
                        field: TYPE_FIELD,
                    });
                }
                Err(MappingError::UnregisteredType {
                    type_name: type_name::<T>(),
                    field: ID_FIELD,
                })
            }
        }
    }
}
