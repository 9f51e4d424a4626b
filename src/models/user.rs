use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 用户
///
/// 连接/会话/配置的归属主体。认证体系本身不在本服务内,
/// 这里只保留所有权与级联所需的最小身份。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// 用户名,全局唯一
    pub username: String,

    /// 是否启用
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 登录日志
///
/// 用户登录后台的审计记录,追加写入
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LoginLog {
    pub id: i64,
    pub user_id: i64,

    /// IP地址
    pub ip_address: String,

    /// 用户代理
    pub user_agent: String,

    /// 是否成功
    pub success: bool,

    /// 登录时间
    pub login_time: DateTime<Utc>,
}
