use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::models::{ApiError, AutoLoginResult, Connection, ConnectionType, QrSessionStatus};

/// 出站请求超时
///
/// 协议服务器可能整体失联,后台任务不允许被单个请求拖死
const REQUEST_TIMEOUT_SECS: u64 = 5;

/// 协议服务客户端
///
/// 唯一的协议服务器通信渠道。按连接类型分派端点与成功判定:
/// - WeCharPadPro: /health、/login/* 系列,管理密钥走query参数
/// - wechatx / wechatx-861: /api/Login/* 系列,JSON请求体
///
/// 所有方法只依赖传入的连接配置,客户端自身无状态,可跨任务共享。
pub struct ProtocolClient {
    http: reqwest::Client,
}

/// 协议服务的通用响应包装
///
/// wechatx系与WeCharPadPro都使用 {Code, Data, Text} 信封
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(rename = "Code")]
    code: i32,

    #[serde(rename = "Data")]
    data: Option<T>,

    #[serde(rename = "Text", default)]
    text: String,
}

/// 二维码签发响应数据
#[derive(Debug, Deserialize)]
struct QrIssueData {
    #[serde(rename = "Uuid")]
    uuid: String,

    #[serde(rename = "QrUrl", default)]
    qr_url: String,

    #[serde(rename = "QrBase64", default)]
    qr_base64: String,

    /// 有效期(秒),缺省240
    #[serde(rename = "ExpiredTime", default)]
    expired_time: Option<i64>,
}

/// 二维码状态检查响应数据
#[derive(Debug, Deserialize)]
struct QrCheckData {
    #[serde(rename = "Status")]
    status: i32,

    #[serde(rename = "Wxid", default)]
    wxid: Option<String>,

    #[serde(rename = "Nickname", default)]
    nickname: Option<String>,

    #[serde(rename = "HeadImgUrl", default)]
    head_img_url: Option<String>,
}

/// 在线状态响应数据
///
/// 两类协议的字段名不同,统一归并为bool
#[derive(Debug, Deserialize)]
struct OnlineStatusData {
    #[serde(rename = "Online", default)]
    online: Option<bool>,

    #[serde(rename = "LoginState", default)]
    login_state: Option<i32>,
}

/// 阅读量响应数据
#[derive(Debug, Deserialize)]
struct ReadCountData {
    #[serde(rename = "ReadNum")]
    read_num: i32,
}

/// 消息同步响应数据
#[derive(Debug, Deserialize)]
struct MsgSyncData {
    #[serde(rename = "AddMsgs", default)]
    add_msgs: Vec<WireMessage>,
}

/// 协议服务返回的单条消息
#[derive(Debug, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "NewMsgId")]
    pub new_msg_id: u64,

    #[serde(rename = "FromUserName")]
    pub from_user_name: String,

    #[serde(rename = "ToUserName")]
    pub to_user_name: String,

    #[serde(rename = "Content", default)]
    pub content: String,

    #[serde(rename = "PushContent", default)]
    pub push_content: String,

    #[serde(rename = "MsgType", default)]
    pub msg_type: i32,
}

impl WireMessage {
    /// 协议消息类型码转存储类别
    pub fn message_type(&self) -> &'static str {
        match self.msg_type {
            1 => "text",
            3 => "image",
            34 => "voice",
            43 => "video",
            49 => "file",
            _ => "other",
        }
    }
}

/// 二维码签发结果
#[derive(Debug)]
pub struct QrIssue {
    pub uuid: String,
    pub qr_code_url: String,
    pub qr_base64: String,
    pub expires_in: i64,
}

/// 二维码轮询结果
#[derive(Debug)]
pub struct QrPoll {
    pub status: QrSessionStatus,
    pub wxid: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

/// 自动登录尝试结果
///
/// 业务结果是枚举,协议调用失败才走Err分支
#[derive(Debug)]
pub struct AutoLoginAttempt {
    pub result: AutoLoginResult,
    pub message: String,
    pub response: Option<serde_json::Value>,
}

impl ProtocolClient {
    /// 创建新的客户端
    pub fn new() -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::NetworkFailed(format!("HTTP客户端初始化失败: {}", e)))?;

        Ok(Self { http })
    }

    /// 测试连接
    ///
    /// 按连接类型选择探测端点与成功判定:
    /// - WeCharPadPro: GET /health,仅200算成功
    /// - wechatx系: POST /api/Login/GetQR,能连上服务器就算成功,
    ///   返回错误状态码 (400/401/403/500) 同样视为可达
    /// - 未知类型: GET根路径,非5xx算成功
    ///
    /// 任何超时/连接错误/异常都吞掉并返回false,永不向调用方传播
    pub async fn test_connection(&self, conn: &Connection) -> bool {
        let base = conn.base_url();

        let result = match conn.kind() {
            Some(ConnectionType::WeCharPadPro) => self
                .http
                .get(format!("{}/health", base))
                .send()
                .await
                .map(|resp| resp.status().as_u16() == 200),
            Some(ConnectionType::WechatX) | Some(ConnectionType::WechatX861) => self
                .http
                .post(format!("{}/api/Login/GetQR", base))
                .header("accept", "application/json")
                .json(&json!({}))
                .send()
                .await
                .map(|resp| matches!(resp.status().as_u16(), 200 | 400 | 401 | 403 | 500)),
            None => self
                .http
                .get(format!("{}/", base))
                .send()
                .await
                .map(|resp| resp.status().as_u16() < 500),
        };

        match result {
            Ok(reachable) => reachable,
            Err(e) => {
                tracing::debug!(
                    connection = %conn.name,
                    url = %conn.url,
                    error = %e,
                    "连接探测失败"
                );
                false
            }
        }
    }

    /// 签发登录二维码
    pub async fn issue_qr(&self, conn: &Connection) -> Result<QrIssue, ApiError> {
        let base = conn.base_url();

        let response = match conn.kind() {
            Some(ConnectionType::WeCharPadPro) => {
                self.http
                    .get(format!("{}/login/GetLoginQrCodeNew", base))
                    .query(&[("key", conn.admin_key.as_str())])
                    .send()
                    .await?
            }
            _ => {
                self.http
                    .post(format!("{}/api/Login/GetQR", base))
                    .header("accept", "application/json")
                    .json(&json!({}))
                    .send()
                    .await?
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ApiError::HttpStatusError {
                status,
                message: "二维码签发接口返回异常状态".to_string(),
            });
        }

        let envelope: ApiEnvelope<QrIssueData> = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("二维码响应解析失败: {}", e))
        })?;

        if envelope.code != 200 {
            return Err(ApiError::QrCodeGenerationFailed(format!(
                "协议服务拒绝 (Code={}): {}",
                envelope.code, envelope.text
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse("二维码响应缺少Data字段".to_string()))?;

        tracing::info!(
            connection = %conn.name,
            uuid = %data.uuid,
            "二维码签发成功"
        );

        Ok(QrIssue {
            uuid: data.uuid,
            qr_code_url: data.qr_url,
            qr_base64: data.qr_base64,
            expires_in: data.expired_time.unwrap_or(240),
        })
    }

    /// 检查二维码扫描状态
    ///
    /// 协议状态码映射:
    /// 0=等待扫码, 1=已扫码, 2=已确认, 3=登录成功,
    /// -1=已过期, -2=已取消, 其余一律视为失败
    pub async fn check_qr(&self, conn: &Connection, uuid: &str) -> Result<QrPoll, ApiError> {
        let base = conn.base_url();

        let response = match conn.kind() {
            Some(ConnectionType::WeCharPadPro) => {
                self.http
                    .get(format!("{}/login/CheckLoginStatus", base))
                    .query(&[("key", conn.admin_key.as_str()), ("uuid", uuid)])
                    .send()
                    .await
            }
            _ => {
                self.http
                    .post(format!("{}/api/Login/CheckQR", base))
                    .header("accept", "application/json")
                    .json(&json!({ "Uuid": uuid }))
                    .send()
                    .await
            }
        }
        .map_err(|e| ApiError::PollingFailed(e.to_string()))?;

        let envelope: ApiEnvelope<QrCheckData> = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("状态检查响应解析失败: {}", e))
        })?;

        if envelope.code != 200 {
            return Err(ApiError::PollingFailed(format!(
                "协议服务返回 Code={}: {}",
                envelope.code, envelope.text
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse("状态检查响应缺少Data字段".to_string()))?;

        let status = match data.status {
            0 => QrSessionStatus::Pending,
            1 => QrSessionStatus::Scanned,
            2 => QrSessionStatus::Confirmed,
            3 => QrSessionStatus::Success,
            -1 => QrSessionStatus::Expired,
            -2 => QrSessionStatus::Cancelled,
            other => {
                tracing::warn!(uuid = %uuid, protocol_status = other, "未知的协议状态码");
                QrSessionStatus::Failed
            }
        };

        Ok(QrPoll {
            status,
            wxid: data.wxid.filter(|w| !w.is_empty()),
            nickname: data.nickname.filter(|n| !n.is_empty()),
            avatar_url: data.head_img_url.filter(|u| !u.is_empty()),
        })
    }

    /// 自动登录 (免扫码唤醒)
    ///
    /// Code语义: 200=成功, 300=需要重新扫码 (记为skipped), 其余为失败
    pub async fn auto_login(
        &self,
        conn: &Connection,
        wxid: &str,
    ) -> Result<AutoLoginAttempt, ApiError> {
        let base = conn.base_url();

        let response = match conn.kind() {
            Some(ConnectionType::WeCharPadPro) => {
                self.http
                    .post(format!("{}/login/WakeUpLogin", base))
                    .query(&[("key", conn.admin_key.as_str())])
                    .json(&json!({ "Wxid": wxid }))
                    .send()
                    .await?
            }
            _ => {
                self.http
                    .post(format!("{}/api/Login/TwiceAutoAuth", base))
                    .header("accept", "application/json")
                    .json(&json!({ "Wxid": wxid }))
                    .send()
                    .await?
            }
        };

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("自动登录响应解析失败: {}", e))
        })?;

        let code = payload.get("Code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let text = payload
            .get("Text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();

        let (result, message) = match code {
            200 => (AutoLoginResult::Success, "自动登录成功".to_string()),
            300 => (
                AutoLoginResult::Skipped,
                "需要扫码登录,跳过自动登录".to_string(),
            ),
            other => (
                AutoLoginResult::Failed,
                format!("自动登录失败 (Code={}): {}", other, text),
            ),
        };

        Ok(AutoLoginAttempt {
            result,
            message,
            response: Some(payload),
        })
    }

    /// 查询账号在线状态
    pub async fn query_online(&self, conn: &Connection, wxid: &str) -> Result<bool, ApiError> {
        let base = conn.base_url();

        let response = match conn.kind() {
            Some(ConnectionType::WeCharPadPro) => {
                self.http
                    .get(format!("{}/login/GetLoginStatus", base))
                    .query(&[("key", conn.admin_key.as_str()), ("wxid", wxid)])
                    .send()
                    .await?
            }
            _ => {
                self.http
                    .post(format!("{}/api/Login/GetLoginStatus", base))
                    .header("accept", "application/json")
                    .json(&json!({ "Wxid": wxid }))
                    .send()
                    .await?
            }
        };

        let envelope: ApiEnvelope<OnlineStatusData> = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("在线状态响应解析失败: {}", e))
        })?;

        if envelope.code != 200 {
            return Err(ApiError::InvalidResponse(format!(
                "在线状态查询失败 (Code={}): {}",
                envelope.code, envelope.text
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse("在线状态响应缺少Data字段".to_string()))?;

        Ok(data.online.unwrap_or(data.login_state == Some(1)))
    }

    /// 获取文章当前阅读量
    pub async fn fetch_read_count(
        &self,
        protocol_url: &str,
        article_url: &str,
    ) -> Result<i32, ApiError> {
        let base = protocol_url.trim_end_matches('/');

        let response = self
            .http
            .post(format!("{}/api/Article/ReadNum", base))
            .header("accept", "application/json")
            .json(&json!({ "Url": article_url }))
            .send()
            .await?;

        let envelope: ApiEnvelope<ReadCountData> = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("阅读量响应解析失败: {}", e))
        })?;

        if envelope.code != 200 {
            return Err(ApiError::InvalidResponse(format!(
                "阅读量查询失败 (Code={}): {}",
                envelope.code, envelope.text
            )));
        }

        envelope
            .data
            .map(|d| d.read_num)
            .ok_or_else(|| ApiError::InvalidResponse("阅读量响应缺少Data字段".to_string()))
    }

    /// 用指定账号阅读文章
    pub async fn read_article(
        &self,
        protocol_url: &str,
        wxid: &str,
        article_url: &str,
    ) -> Result<(), ApiError> {
        let base = protocol_url.trim_end_matches('/');

        let response = self
            .http
            .post(format!("{}/api/Article/Read", base))
            .header("accept", "application/json")
            .json(&json!({ "Wxid": wxid, "Url": article_url }))
            .send()
            .await?;

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("阅读请求响应解析失败: {}", e))
        })?;

        let code = payload.get("Code").and_then(|c| c.as_i64()).unwrap_or(-1);
        if code != 200 {
            let text = payload.get("Text").and_then(|t| t.as_str()).unwrap_or("");
            return Err(ApiError::InvalidResponse(format!(
                "阅读请求被拒绝 (Code={}): {}",
                code, text
            )));
        }

        Ok(())
    }

    /// 同步账号的新消息
    pub async fn sync_messages(
        &self,
        conn: &Connection,
        wxid: &str,
    ) -> Result<Vec<WireMessage>, ApiError> {
        let base = conn.base_url();

        let response = self
            .http
            .post(format!("{}/api/Msg/Sync", base))
            .header("accept", "application/json")
            .json(&json!({ "Wxid": wxid }))
            .send()
            .await?;

        let envelope: ApiEnvelope<MsgSyncData> = response.json().await.map_err(|e| {
            ApiError::JsonParseFailed(format!("消息同步响应解析失败: {}", e))
        })?;

        if envelope.code != 200 {
            return Err(ApiError::InvalidResponse(format!(
                "消息同步失败 (Code={}): {}",
                envelope.code, envelope.text
            )));
        }

        Ok(envelope.data.map(|d| d.add_msgs).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(ProtocolClient::new().is_ok());
    }

    #[test]
    fn test_wire_message_type_mapping() {
        let mut msg = WireMessage {
            new_msg_id: 1,
            from_user_name: "a".to_string(),
            to_user_name: "b".to_string(),
            content: String::new(),
            push_content: String::new(),
            msg_type: 1,
        };
        assert_eq!(msg.message_type(), "text");
        msg.msg_type = 3;
        assert_eq!(msg.message_type(), "image");
        msg.msg_type = 9999;
        assert_eq!(msg.message_type(), "other");
    }

    #[test]
    fn test_envelope_parsing() {
        let raw = r#"{"Code":200,"Data":{"Uuid":"u-1","QrUrl":"http://qr","QrBase64":"","ExpiredTime":180},"Text":""}"#;
        let envelope: ApiEnvelope<QrIssueData> = serde_json::from_str(raw).expect("信封必须可解析");
        assert_eq!(envelope.code, 200);
        let data = envelope.data.expect("Data字段存在");
        assert_eq!(data.uuid, "u-1");
        assert_eq!(data.expired_time, Some(180));
    }

    #[test]
    fn test_envelope_missing_data() {
        let raw = r#"{"Code":500,"Text":"内部错误"}"#;
        let envelope: ApiEnvelope<QrCheckData> = serde_json::from_str(raw).expect("信封必须可解析");
        assert_eq!(envelope.code, 500);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.text, "内部错误");
    }
}
