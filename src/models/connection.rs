use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 连接类型
///
/// 每种类型对应一种第三方协议服务,探测端点与成功判定各不相同。
/// 数据库中以原始字符串存储,未知字符串走默认探测分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// WeCharPadPro协议 (GET /health)
    WeCharPadPro,

    /// wechatx协议 (POST /api/Login/GetQR)
    WechatX,

    /// wechatx 861版本,端点与wechatx一致
    WechatX861,
}

impl ConnectionType {
    /// 数据库存储值
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::WeCharPadPro => "WeCharPadPro",
            ConnectionType::WechatX => "wechatx",
            ConnectionType::WechatX861 => "wechatx-861",
        }
    }

    /// 从存储值解析,未知值返回None (走默认探测分支)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WeCharPadPro" => Some(ConnectionType::WeCharPadPro),
            "wechatx" => Some(ConnectionType::WechatX),
            "wechatx-861" => Some(ConnectionType::WechatX861),
            _ => None,
        }
    }

    /// 是否属于wechatx系列 (wechatx / wechatx-861)
    ///
    /// 自动刷新的"仅刷新WeChat-X"过滤依据此判断
    pub fn is_wechatx_family(&self) -> bool {
        matches!(self, ConnectionType::WechatX | ConnectionType::WechatX861)
    }
}

/// 连接配置
///
/// 指向一台第三方协议服务器的存储配置。
/// 约束: (user_id, name) 唯一;删除连接级联删除其授权码与日志。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,

    /// 所属用户
    pub user_id: i64,

    /// 连接名称
    pub name: String,

    /// 接口地址
    pub url: String,

    /// 连接类型,保留原始字符串
    pub connection_type: String,

    /// 管理员密钥,可为空
    pub admin_key: String,

    /// 是否启用
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// 解析连接类型,未知类型返回None
    pub fn kind(&self) -> Option<ConnectionType> {
        ConnectionType::parse(&self.connection_type)
    }

    /// 去除尾部斜杠的基础地址,拼接端点路径时使用
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// 显示名称
    pub fn display_name(&self) -> String {
        format!("[{}] {} [{}]", self.connection_type, self.name, self.url)
    }
}

/// 连接日志类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionLogType {
    /// 登录
    Login,

    /// 查询
    Query,

    /// 生成授权码
    Generate,

    /// 错误
    Error,
}

impl ConnectionLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionLogType::Login => "login",
            ConnectionLogType::Query => "query",
            ConnectionLogType::Generate => "generate",
            ConnectionLogType::Error => "error",
        }
    }
}

/// 连接日志
///
/// 追加写入的审计记录,随连接级联删除
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConnectionLog {
    pub id: i64,
    pub connection_id: i64,
    pub log_type: String,
    pub message: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// 授权码
///
/// 注册在某个连接下的微信身份(wxid),登录/聊天/阅读检测的操作单位。
/// 约束: (connection_id, code) 唯一。
/// `is_online`/`last_query_success` 为三态: None表示从未检查过。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuthCode {
    pub id: i64,

    /// 所属连接
    pub connection_id: i64,

    /// 授权码/WXID
    pub code: String,

    /// 备注,自由文本,语义上是字符串列表 (JSON或逗号分隔)
    pub remark: String,

    /// 头像链接
    pub avatar_url: String,

    /// 微信昵称
    pub nickname: String,

    /// 最后查询是否成功
    pub last_query_success: Option<bool>,

    /// 最后查询时间
    pub last_query_time: Option<DateTime<Utc>>,

    /// 是否在线
    pub is_online: Option<bool>,

    /// 最后状态检查时间
    pub last_status_check_time: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthCode {
    /// 获取备注列表
    ///
    /// 三级回退,必须容忍任何历史遗留数据,永不报错:
    /// 1. JSON数组 -> 原样返回 (非字符串元素转为字符串)
    /// 2. JSON标量 -> 包装为单元素列表
    /// 3. 非JSON文本 -> 按逗号分割,去除空白,丢弃空段
    pub fn remark_list(&self) -> Vec<String> {
        if self.remark.is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<serde_json::Value>(&self.remark) {
            Ok(serde_json::Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Ok(serde_json::Value::String(s)) => vec![s],
            Ok(other) => vec![other.to_string()],
            Err(_) => self
                .remark
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    /// 设置备注列表,以JSON形式存储 (中文不转义)
    pub fn set_remark_list(&mut self, value: &[String]) {
        // serde_json 默认不转义非ASCII字符
        self.remark = serde_json::to_string(value).unwrap_or_default();
    }

    /// 显示用的备注
    ///
    /// 列表以", "连接;列表为空时回退到原始备注;仍为空则回退到code。
    /// 无论备注内容如何,永不panic。
    pub fn remark_display(&self) -> String {
        let remarks = self.remark_list();
        if !remarks.is_empty() {
            return remarks.join(", ");
        }
        if !self.remark.is_empty() {
            return self.remark.clone();
        }
        self.code.clone()
    }

    /// 在线状态显示
    pub fn status_display(&self) -> &'static str {
        match self.is_online {
            None => "未知",
            Some(true) => "在线",
            Some(false) => "离线",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_code_with_remark(remark: &str) -> AuthCode {
        let now = Utc::now();
        AuthCode {
            id: 1,
            connection_id: 1,
            code: "wxid_test".to_string(),
            remark: remark.to_string(),
            avatar_url: String::new(),
            nickname: String::new(),
            last_query_success: None,
            last_query_time: None,
            is_online: None,
            last_status_check_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_connection_type_roundtrip() {
        for t in [
            ConnectionType::WeCharPadPro,
            ConnectionType::WechatX,
            ConnectionType::WechatX861,
        ] {
            assert_eq!(ConnectionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ConnectionType::parse("unknown-protocol"), None);
    }

    #[test]
    fn test_wechatx_family() {
        assert!(!ConnectionType::WeCharPadPro.is_wechatx_family());
        assert!(ConnectionType::WechatX.is_wechatx_family());
        assert!(ConnectionType::WechatX861.is_wechatx_family());
    }

    #[test]
    fn test_remark_list_json_array() {
        let code = auth_code_with_remark(r#"["客户A","客户B"]"#);
        assert_eq!(code.remark_list(), vec!["客户A", "客户B"]);
    }

    #[test]
    fn test_remark_list_json_scalar() {
        let code = auth_code_with_remark(r#""单个备注""#);
        assert_eq!(code.remark_list(), vec!["单个备注"]);

        let code = auth_code_with_remark("42");
        assert_eq!(code.remark_list(), vec!["42"]);
    }

    #[test]
    fn test_remark_list_comma_fallback() {
        let code = auth_code_with_remark("a, b ,, c ");
        assert_eq!(code.remark_list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remark_list_empty() {
        let code = auth_code_with_remark("");
        assert!(code.remark_list().is_empty());
    }

    #[test]
    fn test_remark_roundtrip() {
        let mut code = auth_code_with_remark("");
        code.set_remark_list(&["a".to_string(), "b".to_string()]);
        assert_eq!(code.remark_list(), vec!["a", "b"]);

        // 中文不转义存储
        code.set_remark_list(&["备注".to_string()]);
        assert!(code.remark.contains("备注"));
    }

    #[test]
    fn test_remark_display_never_fails() {
        // 各种畸形内容都必须返回字符串
        for remark in ["", "{invalid json", r#"{"k":"v"}"#, "plain text", "[]"] {
            let code = auth_code_with_remark(remark);
            let _ = code.remark_display();
        }

        let code = auth_code_with_remark("");
        assert_eq!(code.remark_display(), "wxid_test");

        let code = auth_code_with_remark(r#"["a","b"]"#);
        assert_eq!(code.remark_display(), "a, b");

        // 非JSON文本按逗号分割后重新连接
        let code = auth_code_with_remark("a, b");
        assert_eq!(code.remark_display(), "a, b");
    }

    #[test]
    fn test_status_display() {
        let mut code = auth_code_with_remark("");
        assert_eq!(code.status_display(), "未知");
        code.is_online = Some(true);
        assert_eq!(code.status_display(), "在线");
        code.is_online = Some(false);
        assert_eq!(code.status_display(), "离线");
    }

    #[test]
    fn test_base_url_trims_slash() {
        let now = Utc::now();
        let conn = Connection {
            id: 1,
            user_id: 1,
            name: "test".to_string(),
            url: "http://127.0.0.1:8080/".to_string(),
            connection_type: "wechatx".to_string(),
            admin_key: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(conn.base_url(), "http://127.0.0.1:8080");
    }
}
