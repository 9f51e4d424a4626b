//! 工具模块
//!
//! - logger: tracing日志系统初始化

pub mod logger;
