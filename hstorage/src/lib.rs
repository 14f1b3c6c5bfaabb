//! 聚合状态存储基础库（hstorage）
//!
//! 将任意领域对象（聚合）以 JSON 状态行的形式持久化到关系表中，并按需重建：
//! - 聚合（`aggregate`）与实体（`entity`）抽象：标识与类型标签
//! - 模型映射（`mapping`）：类型注册、标识提取与多态类型解析
//! - 存储编排（`storage`）：`save` / `load` 契约
//! - 状态持久化（`persist`）：状态行与持久化协议，内存与 Postgres 实现
//! - 时钟（`clock`）、配置（`config`）与统一错误（`error`）
//!
//! 典型用法：
//! 1. 使用 `#[aggregate]` 宏（或手动实现 `Entity` + `Aggregate`）定义聚合；
//! 2. 通过 `MappingConfigurer` 在启动期注册所有可持久化类型；
//! 3. 选择 `StatePersister` 实现，构建 `Storage` 并调用 `save` / `load`。
//!
pub mod aggregate;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod persist;
pub mod storage;

// 允许在本 crate 内部通过 ::hstorage 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::hstorage 路径。
extern crate self as hstorage;
