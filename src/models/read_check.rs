use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// 阅读过检配置
///
/// 一个目标协议地址 + 一组轮换使用的wxid。
/// 约束: (user_id, protocol_url) 唯一。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReadCheckConfig {
    pub id: i64,
    pub user_id: i64,

    /// 协议地址
    pub protocol_url: String,

    /// 微信ID列表
    pub wxids: Json<Vec<String>>,

    /// 是否启用
    pub is_active: bool,

    /// 总检测次数
    pub total_checks: i32,

    /// 成功检测次数
    pub success_checks: i32,

    /// 失败检测次数
    pub failed_checks: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReadCheckConfig {
    /// 微信ID数量
    pub fn wxid_count(&self) -> usize {
        self.wxids.len()
    }

    /// 成功率,百分比保留两位小数
    ///
    /// 总次数为0时返回0
    pub fn success_rate(&self) -> f64 {
        if self.total_checks == 0 {
            return 0.0;
        }
        let rate = self.success_checks as f64 / self.total_checks as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }

    /// 增加检测次数 (仅内存,持久化由存储层负责)
    pub fn increment_check_count(&mut self, success: bool) {
        self.total_checks += 1;
        if success {
            self.success_checks += 1;
        } else {
            self.failed_checks += 1;
        }
    }
}

/// 阅读过检日志
///
/// 单个账号的一次过检结果
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReadCheckLog {
    pub id: i64,
    pub config_id: i64,

    /// 检查的URL
    pub url: String,

    /// 微信ID
    pub wxid: String,

    /// 检查前阅读量
    pub read_count_before: Option<i32>,

    /// 检查后阅读量
    pub read_count_after: Option<i32>,

    /// 是否增加
    pub increased: bool,

    /// 是否成功
    pub success: bool,

    /// 错误信息
    pub error_message: String,

    pub created_at: DateTime<Utc>,
}

/// 检测会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadCheckStatus {
    /// 检测中
    Running,

    /// 已完成
    Completed,

    /// 检测失败
    Failed,
}

impl ReadCheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadCheckStatus::Running => "running",
            ReadCheckStatus::Completed => "completed",
            ReadCheckStatus::Failed => "failed",
        }
    }
}

/// 检测结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadCheckResult {
    /// 发现阅读量变化
    Increased,

    /// 未发现阅读量变化
    NoChange,

    /// 检测出错
    Error,
}

impl ReadCheckResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadCheckResult::Increased => "increased",
            ReadCheckResult::NoChange => "no_change",
            ReadCheckResult::Error => "error",
        }
    }
}

/// 阅读链接检测会话
///
/// 一次完整检测运行的状态与统计。
/// status转换: running -> {completed, failed};
/// completed_at 在终态转换时设置且仅设置一次。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReadCheckSession {
    pub id: i64,
    pub user_id: i64,

    /// 检测链接
    pub url: String,

    /// 状态
    pub status: String,

    /// 检测结果
    pub result: Option<String>,

    /// 总账号数
    pub total_accounts: i32,

    /// 成功检测账号数
    pub successful_accounts: i32,

    /// 失败账号数
    pub failed_accounts: i32,

    /// 初始阅读量
    pub initial_read_count: Option<i32>,

    /// 最终阅读量
    pub final_read_count: Option<i32>,

    /// 增加的阅读量
    pub increased_count: i32,

    /// 开始时间
    pub started_at: DateTime<Utc>,

    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReadCheckSession {
    /// 检测持续时间(秒),未完成时返回None
    pub fn duration_seconds(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

/// 检测流程日志类型
///
/// 每个离散步骤一个标签,形成可回放的运行时间线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessLogType {
    /// 开始检测
    Start,

    /// 目标文章
    TargetUrl,

    /// 使用协议
    Protocol,

    /// 检测账号
    Account,

    /// 第一次阅读量
    FirstRead,

    /// 第二次阅读量
    SecondRead,

    /// 阅读量变化
    ReadChange,

    /// 警告
    Warning,

    /// 错误
    Error,

    /// 检测完成
    Complete,
}

impl ProcessLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessLogType::Start => "start",
            ProcessLogType::TargetUrl => "target_url",
            ProcessLogType::Protocol => "protocol",
            ProcessLogType::Account => "account",
            ProcessLogType::FirstRead => "first_read",
            ProcessLogType::SecondRead => "second_read",
            ProcessLogType::ReadChange => "read_change",
            ProcessLogType::Warning => "warning",
            ProcessLogType::Error => "error",
            ProcessLogType::Complete => "complete",
        }
    }

    /// 日志类型对应的图标,前端时间线展示用
    pub fn icon(&self) -> &'static str {
        match self {
            ProcessLogType::Start => "🚀",
            ProcessLogType::TargetUrl => "🔗",
            ProcessLogType::Protocol => "📡",
            ProcessLogType::Account => "👤",
            ProcessLogType::FirstRead | ProcessLogType::SecondRead => "📊",
            ProcessLogType::ReadChange => "🎉",
            ProcessLogType::Warning => "⚠️",
            ProcessLogType::Error => "❌",
            ProcessLogType::Complete => "✅",
        }
    }
}

/// 检测流程日志
///
/// 追加写入,读取按 created_at 升序回放
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReadCheckProcessLog {
    pub id: i64,
    pub session_id: i64,
    pub log_type: String,
    pub message: String,

    /// 相关微信ID,可为空
    pub wxid: String,

    /// 相关协议地址,可为空
    pub protocol_url: String,

    /// 阅读量
    pub read_count: Option<i32>,

    /// 之前阅读量
    pub previous_read_count: Option<i32>,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReadCheckConfig {
        let now = Utc::now();
        ReadCheckConfig {
            id: 1,
            user_id: 1,
            protocol_url: "http://127.0.0.1:8080".to_string(),
            wxids: Json(vec!["wxid_1".to_string(), "wxid_2".to_string()]),
            is_active: true,
            total_checks: 0,
            success_checks: 0,
            failed_checks: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_increment_check_count_success() {
        let mut cfg = config();
        cfg.increment_check_count(true);
        assert_eq!(cfg.total_checks, 1);
        assert_eq!(cfg.success_checks, 1);
        assert_eq!(cfg.failed_checks, 0);
    }

    #[test]
    fn test_increment_check_count_failure() {
        let mut cfg = config();
        cfg.increment_check_count(false);
        assert_eq!(cfg.total_checks, 1);
        assert_eq!(cfg.success_checks, 0);
        assert_eq!(cfg.failed_checks, 1);
    }

    #[test]
    fn test_success_rate_zero_when_no_checks() {
        assert_eq!(config().success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate_rounding() {
        let mut cfg = config();
        cfg.total_checks = 3;
        cfg.success_checks = 1;
        // 1/3 = 33.333...% -> 保留两位小数
        assert_eq!(cfg.success_rate(), 33.33);

        cfg.total_checks = 2;
        cfg.success_checks = 1;
        assert_eq!(cfg.success_rate(), 50.0);
    }

    #[test]
    fn test_wxid_count() {
        assert_eq!(config().wxid_count(), 2);
    }

    #[test]
    fn test_duration_seconds() {
        let now = Utc::now();
        let mut session = ReadCheckSession {
            id: 1,
            user_id: 1,
            url: "https://mp.weixin.qq.com/s/abc".to_string(),
            status: ReadCheckStatus::Running.as_str().to_string(),
            result: None,
            total_accounts: 0,
            successful_accounts: 0,
            failed_accounts: 0,
            initial_read_count: None,
            final_read_count: None,
            increased_count: 0,
            started_at: now,
            completed_at: None,
        };
        assert!(session.duration_seconds().is_none());

        session.completed_at = Some(now + chrono::Duration::milliseconds(1500));
        assert_eq!(session.duration_seconds(), Some(1.5));
    }
}
