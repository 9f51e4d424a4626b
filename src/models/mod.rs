//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (协议调用、存储、应用级错误)
//! - connection: 连接配置与授权码 (健康探测目标、备注编码)
//! - qr_session: 二维码会话状态机与登录记录
//! - chat: 聊天消息与会话镜像
//! - protocol_config: 协议配置单例与维护任务日志
//! - read_check: 阅读过检配置、会话与流程时间线
//! - api_key: 外部API凭证与请求审计
//! - user: 归属主体与登录审计

pub mod api_key;
pub mod chat;
pub mod connection;
pub mod errors;
pub mod protocol_config;
pub mod qr_session;
pub mod read_check;
pub mod user;

// 重导出常用类型,简化外部引用
pub use api_key::{ApiKey, ApiRequest, ApiRequestType};
pub use chat::{ChatMessage, ChatSession};
pub use connection::{AuthCode, Connection, ConnectionLog, ConnectionLogType, ConnectionType};
pub use errors::{ApiError, AppError, StorageError};
pub use protocol_config::{
    AutoLoginLog, AutoLoginResult, AutoLoginTrigger, ProtocolConfig, RefreshLog, RefreshType,
};
pub use qr_session::{LoginRecord, LoginType, QrCodeSession, QrSessionStatus, SessionType};
pub use read_check::{
    ProcessLogType, ReadCheckConfig, ReadCheckLog, ReadCheckProcessLog, ReadCheckResult,
    ReadCheckSession, ReadCheckStatus,
};
pub use user::{LoginLog, User};
