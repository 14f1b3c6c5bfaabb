//! 存储层统一错误定义
//!
//! 按发生阶段划分为三类：
//! - `MappingConfigurationError`：启动期构建模型映射时的配置错误；
//! - `MappingError`：保存/加载期间的标识提取与类型解析错误；
//! - `StorageError`：面向调用方的统一错误，额外包含聚合不存在与持久化层错误。
//!
use thiserror::Error;

/// 模型映射构建期错误（启动期致命，不重试）
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingConfigurationError {
    #[error("Invalid type tag '{tag}' in type '{type_name}'!")]
    InvalidTag {
        type_name: &'static str,
        tag: String,
    },
    #[error("Duplicate type tag '{tag}' in types '{first}' and '{second}'!")]
    DuplicateTag {
        tag: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("Missing '{field}' field in type '{type_name}'!")]
    MissingIdentityField {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("Reserved '{field}' field declared in type '{type_name}'!")]
    ReservedField {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("Unable to probe type '{type_name}': {reason}")]
    ProbeFailed {
        type_name: &'static str,
        reason: String,
    },
    #[error("Invalid collection '{collection}' for type '{type_name}'!")]
    InvalidCollection {
        type_name: &'static str,
        collection: String,
    },
    #[error(
        "Conflicting collections '{first}' and '{second}' in hierarchy of type '{base}'!"
    )]
    CollectionConflict {
        base: &'static str,
        first: String,
        second: String,
    },
    #[error("Collection '{collection}' is shared by unrelated types '{first}' and '{second}'!")]
    SharedCollection {
        collection: String,
        first: &'static str,
        second: &'static str,
    },
}

/// 保存/加载期的映射错误，总是携带出错类型的全限定名
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Missing '{field}' field in type '{type_name}'!")]
    MissingIdentity {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("Empty '{field}' field in type '{type_name}'!")]
    EmptyIdentity {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("Type '{type_name}' is not registered in model mapping, no '{field}' field bound!")]
    UnregisteredType {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("Unknown '{field}' tag '{tag}' while loading type '{expected}'!")]
    UnknownTypeTag {
        expected: &'static str,
        field: &'static str,
        tag: String,
    },
    #[error("Missing '{field}' field while loading type '{expected}'!")]
    MissingTypeTag {
        expected: &'static str,
        field: &'static str,
    },
    #[error("Type '{found}' resolved from '{field}' is not assignable to type '{expected}'!")]
    NotAssignable {
        expected: &'static str,
        field: &'static str,
        found: &'static str,
    },
    #[error("Reserved '{field}' field declared in type '{type_name}'!")]
    ReservedField {
        type_name: &'static str,
        field: &'static str,
    },
}

/// 存储层统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    MappingConfiguration(#[from] MappingConfigurationError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("Aggregate '{id}' of type '{type_name}' does not exist!")]
    AggregateNotFound {
        id: String,
        type_name: &'static str,
    },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    /// `source` 保留底层驱动错误，调用方可下转型区分约束冲突与连接失败
    #[error("database error: {reason}")]
    Database {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl StorageError {
    /// 是否为聚合不存在（调用方通常需要单独处理）
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::AggregateNotFound { .. })
    }

    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            StorageError::Mapping(_) | StorageError::MappingConfiguration(_)
        )
    }
}

/// 统一 Result 类型别名
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database {
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for StorageError {
    fn from(err: toml::de::Error) -> Self {
        StorageError::Config {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Config {
            reason: err.to_string(),
        }
    }
}
