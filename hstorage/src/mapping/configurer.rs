use crate::{
    aggregate::Aggregate,
    config::StorageConfig,
    entity::ID_FIELD,
    error::MappingConfigurationError,
    mapping::{
        Hierarchy, ModelMapping, TYPE_FIELD,
        type_descriptor::{TypeDescriptor, UpcastFn, upcast_into},
    },
    persist::{DEFAULT_COLLECTION, is_valid_collection_name},
};
use serde_json::Value;
use std::{
    any::{TypeId, type_name},
    collections::{HashMap, hash_map::Entry},
};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, MappingConfigurationError>;

/// 待注册的类型
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    collection: Option<&'static str>,
    probe: fn() -> serde_json::Result<Value>,
    describe: fn(String) -> TypeDescriptor,
}

/// 子类型 → 层级根类型的关联
struct SubtypeLink {
    base_id: TypeId,
    base_name: &'static str,
    subtype_id: TypeId,
    upcast: UpcastFn,
}

/// 模型映射配置器
///
/// 启动期显式列出所有可持久化类型，`configure` 一次性校验并构建不可变的 `ModelMapping`。
///
/// ```ignore
/// let mapping = MappingConfigurer::new()
///     .register::<Entity>()
///     .register_subtype::<Vehicle, Car>()
///     .register_subtype::<Vehicle, Truck>()
///     .configure()?;
/// ```
#[derive(Default)]
pub struct MappingConfigurer {
    default_collection: Option<String>,
    registrations: Vec<Registration>,
    links: Vec<SubtypeLink>,
}

impl MappingConfigurer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new().with_default_collection(config.default_collection.clone())
    }

    /// 未声明 `COLLECTION` 的类型所使用的集合
    pub fn with_default_collection(mut self, collection: impl Into<String>) -> Self {
        self.default_collection = Some(collection.into());
        self
    }

    /// 注册一个聚合类型；重复注册同一类型不产生影响
    pub fn register<A: Aggregate>(mut self) -> Self {
        let type_id = TypeId::of::<A>();
        if self.registrations.iter().all(|r| r.type_id != type_id) {
            self.registrations.push(Registration {
                type_id,
                type_name: type_name::<A>(),
                collection: A::COLLECTION,
                probe: probe::<A>,
                describe: TypeDescriptor::new::<A>,
            });
        }
        self
    }

    /// 注册子类型 `S` 并将其挂到以 `B` 为根的多态层级下
    ///
    /// `B` 通常是以各子类型为变体的枚举（或 trait object），也可以本身是已注册的聚合。
    /// 以 `B` 加载时按内容中的 `@type` 标签解码为 `S`，再经 `Into<B>` 转换。
    pub fn register_subtype<B, S>(self) -> Self
    where
        B: Send + 'static,
        S: Aggregate + Into<B>,
    {
        let mut this = self.register::<S>();
        let base_id = TypeId::of::<B>();
        let subtype_id = TypeId::of::<S>();
        if !this
            .links
            .iter()
            .any(|l| l.base_id == base_id && l.subtype_id == subtype_id)
        {
            this.links.push(SubtypeLink {
                base_id,
                base_name: type_name::<B>(),
                subtype_id,
                upcast: upcast_into::<B, S>,
            });
        }
        this
    }

    pub fn configure(self) -> Result<ModelMapping> {
        let default_collection = self
            .default_collection
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        if !is_valid_collection_name(&default_collection) {
            return Err(MappingConfigurationError::InvalidCollection {
                type_name: "<default>",
                collection: default_collection,
            });
        }

        let mut descriptors: Vec<TypeDescriptor> = Vec::with_capacity(self.registrations.len());
        let mut by_tag: HashMap<String, usize> = HashMap::new();
        let mut by_type: HashMap<TypeId, usize> = HashMap::new();

        for registration in &self.registrations {
            let collection = registration
                .collection
                .map(str::to_string)
                .unwrap_or_else(|| default_collection.clone());
            if !is_valid_collection_name(&collection) {
                return Err(MappingConfigurationError::InvalidCollection {
                    type_name: registration.type_name,
                    collection,
                });
            }

            verify_shape(registration)?;

            let descriptor = (registration.describe)(collection);
            if !is_valid_tag(descriptor.tag()) {
                return Err(MappingConfigurationError::InvalidTag {
                    type_name: registration.type_name,
                    tag: descriptor.tag().to_string(),
                });
            }

            match by_tag.entry(descriptor.tag().to_string()) {
                Entry::Occupied(existing) => {
                    return Err(MappingConfigurationError::DuplicateTag {
                        tag: descriptor.tag().to_string(),
                        first: descriptors[*existing.get()].type_name(),
                        second: registration.type_name,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(descriptors.len());
                }
            }

            debug!(
                type_name = descriptor.type_name(),
                tag = descriptor.tag(),
                collection = descriptor.collection(),
                "type registered"
            );
            by_type.insert(descriptor.type_id(), descriptors.len());
            descriptors.push(descriptor);
        }

        let mut hierarchies: HashMap<TypeId, Hierarchy> = HashMap::new();
        let mut owners: HashMap<TypeId, TypeId> = HashMap::new();
        for link in &self.links {
            let Some(&index) = by_type.get(&link.subtype_id) else {
                continue;
            };
            let subtype_owner = owner_of(&owners, link.subtype_id);
            let base_owner = owner_of(&owners, link.base_id);
            if subtype_owner != base_owner {
                owners.insert(subtype_owner, base_owner);
            }

            let descriptor = &mut descriptors[index];
            descriptor.add_upcast(link.base_id, link.upcast);
            join_hierarchy(
                &mut hierarchies,
                link.base_id,
                link.base_name,
                descriptor.collection(),
            )?;
        }

        // 层级根本身也是已注册聚合时，同样参与多态并须位于同一集合
        for (base_id, hierarchy) in &hierarchies {
            if let Some(&index) = by_type.get(base_id) {
                let descriptor = &mut descriptors[index];
                if descriptor.collection() != hierarchy.collection {
                    return Err(MappingConfigurationError::CollectionConflict {
                        base: hierarchy.type_name,
                        first: hierarchy.collection.clone(),
                        second: descriptor.collection().to_string(),
                    });
                }
                descriptor.mark_polymorphic();
            }
        }

        // 同一集合内的标识空间只能属于一个类型或一个多态层级
        let mut collection_owners: HashMap<&str, (TypeId, &'static str)> = HashMap::new();
        for descriptor in &descriptors {
            let owner = owner_of(&owners, descriptor.type_id());
            match collection_owners.entry(descriptor.collection()) {
                Entry::Occupied(existing) => {
                    let (first_owner, first) = *existing.get();
                    if first_owner != owner {
                        return Err(MappingConfigurationError::SharedCollection {
                            collection: descriptor.collection().to_string(),
                            first,
                            second: descriptor.type_name(),
                        });
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert((owner, descriptor.type_name()));
                }
            }
        }

        info!(
            types = descriptors.len(),
            hierarchies = hierarchies.len(),
            default_collection = %default_collection,
            "model mapping configured"
        );

        Ok(ModelMapping::new(
            descriptors,
            by_tag,
            by_type,
            hierarchies,
            default_collection,
        ))
    }
}

fn probe<A: Aggregate>() -> serde_json::Result<Value> {
    serde_json::to_value(A::default())
}

/// 以默认实例探测序列化形态：必须是包含 `id` 字段的对象，且不得声明保留字段 `@type`
fn verify_shape(registration: &Registration) -> Result<()> {
    let value = (registration.probe)().map_err(|err| MappingConfigurationError::ProbeFailed {
        type_name: registration.type_name,
        reason: err.to_string(),
    })?;

    let Some(object) = value.as_object() else {
        return Err(MappingConfigurationError::MissingIdentityField {
            type_name: registration.type_name,
            field: ID_FIELD,
        });
    };
    if !object.contains_key(ID_FIELD) {
        return Err(MappingConfigurationError::MissingIdentityField {
            type_name: registration.type_name,
            field: ID_FIELD,
        });
    }
    if object.contains_key(TYPE_FIELD) {
        return Err(MappingConfigurationError::ReservedField {
            type_name: registration.type_name,
            field: TYPE_FIELD,
        });
    }
    Ok(())
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag != TYPE_FIELD
        && !tag.starts_with('@')
        && tag.chars().all(|c| !c.is_whitespace() && !c.is_control())
}

/// 沿子类型 → 层级根的关联找到最终所属的根类型
fn owner_of(owners: &HashMap<TypeId, TypeId>, type_id: TypeId) -> TypeId {
    let mut current = type_id;
    while let Some(&next) = owners.get(&current) {
        current = next;
    }
    current
}

fn join_hierarchy(
    hierarchies: &mut HashMap<TypeId, Hierarchy>,
    base_id: TypeId,
    base_name: &'static str,
    collection: &str,
) -> Result<()> {
    match hierarchies.entry(base_id) {
        Entry::Occupied(existing) => {
            let hierarchy = existing.get();
            if hierarchy.collection != collection {
                return Err(MappingConfigurationError::CollectionConflict {
                    base: hierarchy.type_name,
                    first: hierarchy.collection.clone(),
                    second: collection.to_string(),
                });
            }
        }
        Entry::Vacant(slot) => {
            slot.insert(Hierarchy {
                type_name: base_name,
                collection: collection.to_string(),
            });
        }
    }
    Ok(())
}
