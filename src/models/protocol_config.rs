use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::ProtocolDefaults;

/// 协议服务配置
///
/// 进程级单例 (pk=1),首次访问时惰性创建。
/// 定时维护任务在启动时读取一次间隔,各tick重读开关位。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub id: i64,

    /// 协议服务API的访问密码,可为空
    pub service_password: String,

    /// 是否启用定时自动刷新微信连接
    pub auto_refresh_enabled: bool,

    /// 刷新间隔(分钟)
    pub refresh_interval: i32,

    /// 是否只刷新wechatx系列的连接
    pub refresh_wechatx_only: bool,

    /// 是否启用定时自动登录
    pub auto_login_enabled: bool,

    /// 自动登录间隔(分钟),范围5-1440
    pub auto_login_interval: i32,

    /// 是否启用详细的调试日志输出
    pub enable_debug_log: bool,

    /// 日志保留天数,范围1-365
    pub log_retention_days: i32,

    /// 上次刷新时间
    pub last_refresh_time: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProtocolConfig {
    /// 自动登录间隔的合法范围(分钟)
    pub const AUTO_LOGIN_INTERVAL_RANGE: (i32, i32) = (5, 1440);

    /// 日志保留天数的合法范围
    pub const LOG_RETENTION_RANGE: (i32, i32) = (1, 365);

    /// 将各间隔值收敛到合法范围
    ///
    /// 刷新间隔的边界来自启动配置 (PROTOCOL_CONFIG.MIN/MAX_REFRESH_INTERVAL)
    pub fn clamp(&mut self, defaults: &ProtocolDefaults) {
        self.refresh_interval = self
            .refresh_interval
            .clamp(defaults.min_refresh_interval, defaults.max_refresh_interval);
        self.auto_login_interval = self
            .auto_login_interval
            .clamp(Self::AUTO_LOGIN_INTERVAL_RANGE.0, Self::AUTO_LOGIN_INTERVAL_RANGE.1);
        self.log_retention_days = self
            .log_retention_days
            .clamp(Self::LOG_RETENTION_RANGE.0, Self::LOG_RETENTION_RANGE.1);
    }
}

/// 刷新类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshType {
    /// 手动刷新
    Manual,

    /// 自动刷新
    Auto,
}

impl RefreshType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshType::Manual => "manual",
            RefreshType::Auto => "auto",
        }
    }
}

/// 刷新日志
///
/// 每轮刷新落一条,记录尝试/成功/失败数量
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RefreshLog {
    pub id: i64,
    pub refresh_type: String,

    /// 刷新连接数
    pub connection_count: i32,

    /// 成功数量
    pub success_count: i32,

    /// 失败数量
    pub failed_count: i32,

    /// 错误信息
    pub error_message: String,

    pub created_at: DateTime<Utc>,
}

/// 自动登录触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoLoginTrigger {
    /// 定时任务
    Scheduled,

    /// 手动触发
    Manual,
}

impl AutoLoginTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoLoginTrigger::Scheduled => "scheduled",
            AutoLoginTrigger::Manual => "manual",
        }
    }
}

/// 自动登录结果
///
/// 业务结果用枚举表达,不是异常:
/// 需要扫码的账号记 skipped,协议调用本身出错记 error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoLoginResult {
    /// 登录成功
    Success,

    /// 登录失败
    Failed,

    /// 跳过(需要二维码)
    Skipped,

    /// 执行错误
    Error,
}

impl AutoLoginResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoLoginResult::Success => "success",
            AutoLoginResult::Failed => "failed",
            AutoLoginResult::Skipped => "skipped",
            AutoLoginResult::Error => "error",
        }
    }
}

/// 自动登录日志
///
/// 每个账号的每次尝试落一条,带执行时长与原始响应
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutoLoginLog {
    pub id: i64,
    pub login_type: String,

    /// 微信ID
    pub wxid: String,

    /// 连接名称
    pub connection_name: String,

    /// 登录结果
    pub result: String,

    /// 详细信息
    pub message: String,

    /// API响应数据
    pub response_data: Option<serde_json::Value>,

    /// 执行时长(秒)
    pub duration: Option<f64>,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProtocolConfig {
        let now = Utc::now();
        ProtocolConfig {
            id: 1,
            service_password: String::new(),
            auto_refresh_enabled: false,
            refresh_interval: 120,
            refresh_wechatx_only: false,
            auto_login_enabled: false,
            auto_login_interval: 60,
            enable_debug_log: false,
            log_retention_days: 14,
            last_refresh_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_clamp_intervals() {
        let defaults = ProtocolDefaults {
            default_refresh_interval: 120,
            min_refresh_interval: 10,
            max_refresh_interval: 1440,
            default_refresh_wechatx_only: false,
        };

        let mut cfg = config();
        cfg.refresh_interval = 1;
        cfg.auto_login_interval = 9999;
        cfg.log_retention_days = 0;
        cfg.clamp(&defaults);

        assert_eq!(cfg.refresh_interval, 10);
        assert_eq!(cfg.auto_login_interval, 1440);
        assert_eq!(cfg.log_retention_days, 1);
    }

    #[test]
    fn test_clamp_keeps_valid_values() {
        let defaults = ProtocolDefaults {
            default_refresh_interval: 120,
            min_refresh_interval: 10,
            max_refresh_interval: 1440,
            default_refresh_wechatx_only: false,
        };

        let mut cfg = config();
        cfg.clamp(&defaults);
        assert_eq!(cfg.refresh_interval, 120);
        assert_eq!(cfg.auto_login_interval, 60);
        assert_eq!(cfg.log_retention_days, 14);
    }
}
