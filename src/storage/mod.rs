//! 存储层
//!
//! 按实体划分的查询结构体,静态方法 + 连接池参数,
//! 全部使用运行时绑定的 `query`/`query_as` (构建期无数据库)。
//! 每次写入都是单行创建/更新,依赖数据库自身的原子性,
//! 不需要跨行事务: 审计/日志写入彼此独立。

pub mod api;
pub mod chat;
pub mod connections;
pub mod protocol;
pub mod read_check;
pub mod sessions;

pub use api::{ApiKeyQueries, ApiRequestQueries};
pub use chat::{ChatMessageQueries, ChatSessionQueries};
pub use connections::{AuthCodeQueries, ConnectionLogQueries, ConnectionQueries};
pub use protocol::{AutoLoginLogQueries, ProtocolConfigQueries, RefreshLogQueries};
pub use read_check::{
    ProcessLogQueries, ReadCheckConfigQueries, ReadCheckLogQueries, ReadCheckSessionQueries,
};
pub use sessions::{LoginLogQueries, LoginRecordQueries, QrSessionQueries, UserQueries};
