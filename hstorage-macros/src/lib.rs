//! hstorage 过程宏
//!
//! - `#[entity]`：为结构体补齐 `id` 字段并实现 `hstorage::entity::Entity`
//! - `#[aggregate]`：在 `#[entity]` 基础上实现 `hstorage::aggregate::Aggregate`（类型标签与集合）
//!
mod aggregate;
mod attrs;
mod entity;
mod utils;

use proc_macro::TokenStream;

/// 实体宏
/// - 追加字段：`id: IdType`（若缺失）并置于字段最前，使序列化结果以 `id` 开头
/// - 自动为目标结构体实现 `::hstorage::entity::Entity`
/// - 支持参数：`#[entity(id = IdType, debug = true|false)]`，`id` 默认 `String`
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 聚合宏
/// - 包含 `#[entity]` 的全部行为
/// - 自动实现 `::hstorage::aggregate::Aggregate`
/// - 支持参数：`#[aggregate(id = IdType, tag = "...", collection = "...", debug = true|false)]`
///
/// ```ignore
/// #[aggregate(tag = "aggregate", collection = "test_aggregates")]
/// #[derive(Clone, PartialEq)]
/// struct TestAggregate {
///     name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn aggregate(attr: TokenStream, item: TokenStream) -> TokenStream {
    aggregate::expand(attr, item)
}
