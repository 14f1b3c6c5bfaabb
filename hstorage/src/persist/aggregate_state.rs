use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 聚合状态行：`(id, state, timestamp)`，按集合（表）归属
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct AggregateState {
    /// 所在集合（表名）
    #[builder(into)]
    collection: String,
    /// 聚合标识，集合内主键
    #[builder(into)]
    id: String,
    /// JSON 文本形式的聚合内容（可能内嵌 `@type` 标签）
    #[builder(into)]
    content: String,
    /// 写入时刻
    timestamp: DateTime<Utc>,
}

impl AggregateState {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
