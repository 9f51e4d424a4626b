use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// API请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiRequestType {
    /// 获取Code
    GetCode,

    /// 获取所有WXID
    GetAllWxids,

    /// 阅读文章
    ReadArticle,

    /// 获取手机号
    GetMobile,

    /// 获取OpenID
    GetOpenid,
}

impl ApiRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiRequestType::GetCode => "get_code",
            ApiRequestType::GetAllWxids => "get_all_wxids",
            ApiRequestType::ReadArticle => "read_article",
            ApiRequestType::GetMobile => "get_mobile",
            ApiRequestType::GetOpenid => "get_openid",
        }
    }
}

/// API请求记录
///
/// 对外REST接口的审计日志,每次调用落一条。
/// user_id 可空: 密钥被删除后记录仍保留。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiRequest {
    pub id: i64,
    pub user_id: Option<i64>,
    pub request_type: String,

    /// 微信ID
    pub wxid: String,

    /// 应用ID
    pub appid: String,

    /// 请求数据
    pub request_data: serde_json::Value,

    /// 响应数据
    pub response_data: serde_json::Value,

    /// 是否成功
    pub success: bool,

    /// 错误信息
    pub error_message: String,

    /// 来源IP
    pub ip_address: String,

    /// 用户代理
    pub user_agent: String,

    pub created_at: DateTime<Utc>,
}

/// API密钥
///
/// 外部REST调用的凭证,权限为字符串列表,"all"为通配
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,

    /// 密钥名称
    pub name: String,

    /// 密钥本体,全局唯一
    pub key: String,

    /// 是否启用
    pub is_active: bool,

    /// 权限列表
    pub permissions: Json<Vec<String>>,

    /// 最后使用时间
    pub last_used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// 检查是否有指定权限
    ///
    /// 列表中包含该权限或包含"all"即通过
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == permission || p == "all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with_permissions(perms: &[&str]) -> ApiKey {
        ApiKey {
            id: 1,
            user_id: 1,
            name: "测试密钥".to_string(),
            key: "k".repeat(64),
            is_active: true,
            permissions: Json(perms.iter().map(|p| p.to_string()).collect()),
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_permission_exact() {
        let key = key_with_permissions(&["get_code", "read_article"]);
        assert!(key.has_permission("get_code"));
        assert!(!key.has_permission("get_mobile"));
    }

    #[test]
    fn test_has_permission_wildcard() {
        let key = key_with_permissions(&["all"]);
        assert!(key.has_permission("get_code"));
        assert!(key.has_permission("anything"));
    }

    #[test]
    fn test_empty_permissions() {
        let key = key_with_permissions(&[]);
        assert!(!key.has_permission("get_code"));
    }
}
