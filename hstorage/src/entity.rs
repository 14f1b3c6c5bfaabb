//! 实体（Entity）基础抽象
//!
//! 为可持久化对象提供统一的标识（Id）能力，取代按字段名反射读取标识的做法。
//!
use std::{fmt::Display, str::FromStr};

/// 约定的标识字段名
pub const ID_FIELD: &str = "id";

/// 具备唯一标识的实体抽象
pub trait Entity: Send + Sync {
    /// 实体标识类型，要求可解析、可显示与可克隆
    type Id: FromStr + Clone + Display;

    /// 获取实体标识
    fn id(&self) -> &Self::Id;

    /// 标识的文本形式，即状态行主键
    fn identity(&self) -> String {
        self.id().to_string()
    }
}
