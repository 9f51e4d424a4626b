use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 协议服务调用相关错误
///
/// 处理与第三方协议服务器交互时的各种失败场景。
/// 每个错误都包含足够的上下文信息,帮助调试和恢复。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ApiError {
    /// 网络请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断
    /// - 协议服务器不可达
    /// - DNS解析失败
    #[error("网络请求失败: {0}")]
    NetworkFailed(String),

    /// 二维码生成失败
    ///
    /// 协议服务返回了非预期的响应或拒绝了请求
    #[error("二维码生成失败: {0}")]
    QrCodeGenerationFailed(String),

    /// 轮询状态检查失败
    ///
    /// 检查二维码扫描状态时出错
    #[error("轮询失败: {0}")]
    PollingFailed(String),

    /// 响应格式无效
    ///
    /// 协议服务返回的数据格式不符合预期
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    /// JSON解析失败
    #[error("响应数据解析失败: {0}")]
    JsonParseFailed(String),

    /// HTTP状态码错误
    ///
    /// 协议服务返回了非预期状态码
    #[error("HTTP错误 {status}: {message}")]
    HttpStatusError { status: u16, message: String },

    /// 登录失败
    ///
    /// 协议服务明确拒绝了登录请求
    #[error("登录失败: {0}")]
    LoginFailed(String),
}

/// 数据库存储相关错误
///
/// 处理与PostgreSQL交互时的失败场景
#[derive(Debug, Error)]
pub enum StorageError {
    /// 数据库操作失败
    #[error("数据库操作失败: {0}")]
    Database(String),

    /// 记录未找到
    #[error("记录未找到: {0}")]
    NotFound(String),

    /// 序列化/反序列化失败
    ///
    /// 将数据转换为JSON或从JSON解析失败
    #[error("数据序列化失败: {0}")]
    Serialization(String),
}

/// 应用级错误
///
/// 服务层统一的错误出口,聚合协议调用与存储两类失败
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 实现从reqwest::Error到ApiError的转换
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::NetworkFailed("请求超时".to_string())
        } else if err.is_connect() {
            ApiError::NetworkFailed("无法连接到服务器".to_string())
        } else {
            ApiError::NetworkFailed(err.to_string())
        }
    }
}

/// 实现从sqlx::Error到StorageError的转换
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound("查询结果为空".to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}

/// 实现从serde_json::Error到相关错误的转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonParseFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.into())
    }
}
