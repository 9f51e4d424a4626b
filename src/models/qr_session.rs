use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 二维码会话类型
///
/// 对应协议服务支持的不同登录设备形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// iPad登录
    Ipad,

    /// iPad备用登录
    IpadBackup,

    /// 车载登录
    Car,

    /// 861-iPad登录
    Ipad861,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Ipad => "ipad",
            SessionType::IpadBackup => "ipad_backup",
            SessionType::Car => "car",
            SessionType::Ipad861 => "861_ipad",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ipad" => Some(SessionType::Ipad),
            "ipad_backup" => Some(SessionType::IpadBackup),
            "car" => Some(SessionType::Car),
            "861_ipad" => Some(SessionType::Ipad861),
            _ => None,
        }
    }
}

/// 二维码会话状态
///
/// 状态转换流程:
/// pending -> scanned -> confirmed -> success
///     |          |           |
///     +----------+-----------+---> failed / expired / cancelled
///
/// pending是唯一初始状态;success/failed/expired/cancelled为终态。
/// 注意: `update_status` 不校验转换合法性,任何状态都可以被直接赋值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrSessionStatus {
    /// 等待扫码
    Pending,

    /// 已扫码,等待确认
    Scanned,

    /// 已确认
    Confirmed,

    /// 登录成功
    Success,

    /// 登录失败
    Failed,

    /// 已过期
    Expired,

    /// 已取消
    Cancelled,
}

impl QrSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrSessionStatus::Pending => "pending",
            QrSessionStatus::Scanned => "scanned",
            QrSessionStatus::Confirmed => "confirmed",
            QrSessionStatus::Success => "success",
            QrSessionStatus::Failed => "failed",
            QrSessionStatus::Expired => "expired",
            QrSessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QrSessionStatus::Pending),
            "scanned" => Some(QrSessionStatus::Scanned),
            "confirmed" => Some(QrSessionStatus::Confirmed),
            "success" => Some(QrSessionStatus::Success),
            "failed" => Some(QrSessionStatus::Failed),
            "expired" => Some(QrSessionStatus::Expired),
            "cancelled" => Some(QrSessionStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否为终态
    ///
    /// 一旦进入终态,不应再进行状态轮询
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QrSessionStatus::Success
                | QrSessionStatus::Failed
                | QrSessionStatus::Expired
                | QrSessionStatus::Cancelled
        )
    }
}

/// 二维码会话
///
/// 一次扫码登录尝试的全程记录,由UUID唯一标识。
///
/// 软过期语义: 过期是读取时的派生判断 (`is_expired`),不是自动的状态
/// 转换: 一个会话可能逻辑上已过期而存储状态仍为 pending/scanned。
/// 调用方在信任非终态状态之前必须先检查 `is_expired`。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QrCodeSession {
    pub id: i64,

    /// 所属用户
    pub user_id: i64,

    /// 所属连接
    pub connection_id: i64,

    /// 会话类型
    pub session_type: String,

    /// 会话UUID,全局唯一
    pub uuid: String,

    /// 二维码URL
    pub qr_code_url: String,

    /// 二维码Base64
    pub qr_base64: String,

    /// 当前状态
    pub status: String,

    /// 登录成功后回填的微信ID
    pub wxid: String,

    /// 登录成功后回填的昵称
    pub nickname: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// 过期时间
    pub expires_at: DateTime<Utc>,
}

impl QrCodeSession {
    /// 解析当前状态,数据损坏时返回None
    pub fn status(&self) -> Option<QrSessionStatus> {
        QrSessionStatus::parse(&self.status)
    }

    /// 是否已过期
    ///
    /// 仅依据时间判断,与存储状态无关 (软过期)
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        self.status().map(|s| s.is_terminal()).unwrap_or(false)
    }

    /// 更新状态 (仅内存,持久化由存储层负责)
    ///
    /// 无条件赋值,不校验转换合法性;wxid/nickname仅在提供时覆盖
    pub fn apply_status(
        &mut self,
        status: QrSessionStatus,
        wxid: Option<&str>,
        nickname: Option<&str>,
    ) {
        self.status = status.as_str().to_string();
        if let Some(wxid) = wxid {
            if !wxid.is_empty() {
                self.wxid = wxid.to_string();
            }
        }
        if let Some(nickname) = nickname {
            if !nickname.is_empty() {
                self.nickname = nickname.to_string();
            }
        }
        self.updated_at = Utc::now();
    }

    /// 距离过期的剩余秒数,负数表示已过期
    pub fn remaining_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

/// 登录类型
///
/// 会话类型之外多出 `auto`: 定时任务发起的唤醒登录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    Ipad,
    IpadBackup,
    Car,
    Ipad861,
    Auto,
}

impl LoginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::Ipad => "ipad",
            LoginType::IpadBackup => "ipad_backup",
            LoginType::Car => "car",
            LoginType::Ipad861 => "861_ipad",
            LoginType::Auto => "auto",
        }
    }
}

impl From<SessionType> for LoginType {
    fn from(t: SessionType) -> Self {
        match t {
            SessionType::Ipad => LoginType::Ipad,
            SessionType::IpadBackup => LoginType::IpadBackup,
            SessionType::Car => LoginType::Car,
            SessionType::Ipad861 => LoginType::Ipad861,
        }
    }
}

/// 登录记录
///
/// 每次登录尝试(扫码或自动)落一条,追加写入
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LoginRecord {
    pub id: i64,
    pub user_id: i64,
    pub connection_id: i64,
    pub login_type: String,
    pub wxid: String,
    pub nickname: String,
    pub success: bool,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_in(seconds: i64) -> QrCodeSession {
        let now = Utc::now();
        QrCodeSession {
            id: 1,
            user_id: 1,
            connection_id: 1,
            session_type: SessionType::Ipad.as_str().to_string(),
            uuid: "test-uuid".to_string(),
            qr_code_url: String::new(),
            qr_base64: String::new(),
            status: QrSessionStatus::Pending.as_str().to_string(),
            wxid: String::new(),
            nickname: String::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::seconds(seconds),
        }
    }

    #[test]
    fn test_initial_state() {
        let session = session_expiring_in(240);
        assert_eq!(session.status(), Some(QrSessionStatus::Pending));
        assert!(!session.is_expired());
        assert!(!session.is_terminal());
    }

    #[test]
    fn test_soft_expiry_ignores_status() {
        // 过期仅看时间: 存储状态是什么都不影响 is_expired
        for status in [
            QrSessionStatus::Pending,
            QrSessionStatus::Scanned,
            QrSessionStatus::Success,
        ] {
            let mut session = session_expiring_in(-10);
            session.status = status.as_str().to_string();
            assert!(session.is_expired());
        }

        let session = session_expiring_in(240);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_apply_status_unconditional() {
        // 任何状态都可以从任何状态设置,包括从终态"回退"
        let mut session = session_expiring_in(240);
        session.apply_status(QrSessionStatus::Success, Some("wxid_a"), Some("昵称"));
        assert_eq!(session.status(), Some(QrSessionStatus::Success));
        assert_eq!(session.wxid, "wxid_a");
        assert_eq!(session.nickname, "昵称");

        session.apply_status(QrSessionStatus::Pending, None, None);
        assert_eq!(session.status(), Some(QrSessionStatus::Pending));
        // 未提供时不清空已有回填
        assert_eq!(session.wxid, "wxid_a");
    }

    #[test]
    fn test_terminal_states() {
        for (status, terminal) in [
            (QrSessionStatus::Pending, false),
            (QrSessionStatus::Scanned, false),
            (QrSessionStatus::Confirmed, false),
            (QrSessionStatus::Success, true),
            (QrSessionStatus::Failed, true),
            (QrSessionStatus::Expired, true),
            (QrSessionStatus::Cancelled, true),
        ] {
            assert_eq!(status.is_terminal(), terminal, "{:?}", status);
        }
    }

    #[test]
    fn test_remaining_seconds_negative_when_expired() {
        let session = session_expiring_in(-5);
        assert!(session.remaining_seconds() < 0);
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [
            "pending",
            "scanned",
            "confirmed",
            "success",
            "failed",
            "expired",
            "cancelled",
        ] {
            let parsed = QrSessionStatus::parse(s).expect("已知状态必须可解析");
            assert_eq!(parsed.as_str(), s);
        }
        assert_eq!(QrSessionStatus::parse("bogus"), None);
    }
}
