//! 服务层模块
//!
//! 包含所有业务逻辑服务:
//! - `protocol_client`: 协议服务客户端,按连接类型分派端点
//! - `login_service`: 扫码登录会话生命周期
//! - `chat_service`: 聊天消息镜像与会话维护
//! - `refresh_service`: 连接刷新与自动登录
//! - `read_check_service`: 阅读量过检流程
//! - `api_key_service`: 外部API凭证校验与审计
//! - `scheduler`: 周期维护任务的启动与取消
//!
//! # 服务架构
//!
//! ```text
//! ┌────────────────────┐   ┌──────────────┐
//! │     Scheduler      │   │  外部调用方   │
//! └─────────┬──────────┘   └──────┬───────┘
//!           │                     │
//!           ▼                     ▼
//! ┌──────────────────────────────────────────┐
//! │              Services Layer              │
//! │  RefreshService  LoginService  Chat/...  │
//! │         │              │          │      │
//! │  ┌──────▼──────────────▼──────────▼───┐  │
//! │  │          ProtocolClient            │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//!           │                     │
//!           ▼                     ▼
//!      PostgreSQL            协议服务器
//! ```

pub mod api_key_service;
pub mod chat_service;
pub mod login_service;
pub mod protocol_client;
pub mod read_check_service;
pub mod refresh_service;
pub mod scheduler;

// 重导出常用类型,简化外部引用
pub use api_key_service::ApiKeyService;
pub use chat_service::ChatService;
pub use login_service::LoginService;
pub use protocol_client::ProtocolClient;
pub use read_check_service::ReadCheckService;
pub use refresh_service::RefreshService;
pub use scheduler::Scheduler;
