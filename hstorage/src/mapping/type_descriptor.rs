use crate::{
    aggregate::Aggregate,
    entity::ID_FIELD,
    error::{MappingError, StorageResult},
    mapping::TYPE_FIELD,
};
use serde_json::Value;
use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
};

/// 将内容解码为具体类型（类型擦除）
pub(crate) type DecodeFn = fn(Value) -> serde_json::Result<Box<dyn Any + Send>>;
/// 将具体类型转换为层级根类型（类型擦除）
pub(crate) type UpcastFn = fn(Box<dyn Any + Send>) -> Option<Box<dyn Any + Send>>;

/// 类型描述：类型标签 ↔ 具体类型，以及标识字段、所在集合与多态信息
///
/// 在映射构建时创建，之后不可变。
#[derive(Debug)]
pub struct TypeDescriptor {
    tag: String,
    type_id: TypeId,
    type_name: &'static str,
    collection: String,
    polymorphic: bool,
    decode: DecodeFn,
    upcasts: HashMap<TypeId, UpcastFn>,
}

impl TypeDescriptor {
    pub(crate) fn new<A: Aggregate>(collection: String) -> Self {
        Self {
            tag: A::TYPE.to_string(),
            type_id: TypeId::of::<A>(),
            type_name: type_name::<A>(),
            collection,
            polymorphic: false,
            decode: decode_as::<A>,
            upcasts: HashMap::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// 全限定类型名
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// 是否参与多态层级（参与时内容中会内嵌 `@type` 标签）
    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    pub fn identity_field(&self) -> &'static str {
        ID_FIELD
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn mark_polymorphic(&mut self) {
        self.polymorphic = true;
    }

    pub(crate) fn add_upcast(&mut self, base: TypeId, upcast: UpcastFn) {
        self.upcasts.insert(base, upcast);
        self.polymorphic = true;
    }

    /// 解码结果能否赋值给 `T`（即 `T` 为该类型本身或其层级根类型）
    pub fn is_assignable_to<T: 'static>(&self) -> bool {
        let expected = TypeId::of::<T>();
        expected == self.type_id || self.upcasts.contains_key(&expected)
    }

    /// 将内容解码为该描述对应的具体类型，并转换为期望类型 `T`
    pub fn decode_into<T: 'static>(&self, content: Value) -> StorageResult<T> {
        let not_assignable = || MappingError::NotAssignable {
            expected: type_name::<T>(),
            field: TYPE_FIELD,
            found: self.type_name,
        };

        if !self.is_assignable_to::<T>() {
            return Err(not_assignable().into());
        }

        let expected = TypeId::of::<T>();
        let decoded = (self.decode)(content)?;
        let decoded = if expected == self.type_id {
            decoded
        } else {
            let upcast = self.upcasts.get(&expected).ok_or_else(not_assignable)?;
            upcast(decoded).ok_or_else(not_assignable)?
        };

        let decoded = decoded.downcast::<T>().map_err(|_| not_assignable())?;
        Ok(*decoded)
    }
}

fn decode_as<A: Aggregate>(content: Value) -> serde_json::Result<Box<dyn Any + Send>> {
    let aggregate: A = serde_json::from_value(content)?;
    Ok(Box::new(aggregate))
}

pub(crate) fn upcast_into<B, S>(value: Box<dyn Any + Send>) -> Option<Box<dyn Any + Send>>
where
    B: Send + 'static,
    S: Into<B> + 'static,
{
    let subtype = value.downcast::<S>().ok()?;
    let base: B = (*subtype).into();
    Some(Box::new(base))
}
