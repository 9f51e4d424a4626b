use std::sync::Arc;

use crate::database::DatabaseManager;
use crate::models::ApiError;
use crate::services::{
    ApiKeyService, ChatService, LoginService, ProtocolClient, ReadCheckService, RefreshService,
};

/// 应用全局状态
///
/// 每个字段代表应用核心能力的单一来源:
/// - db: 数据持久化
/// - protocol: 唯一的协议服务器通信渠道
/// - login/chat/refresh/read_check: 各业务流程的协调者
/// - api_keys: 外部调用的凭证与审计
pub struct AppState {
    /// 数据库管理器: 唯一的数据存储入口
    pub db: DatabaseManager,

    /// 协议客户端,跨服务共享
    pub protocol: Arc<ProtocolClient>,

    /// 扫码登录服务
    pub login: Arc<LoginService>,

    /// 聊天镜像服务
    pub chat: Arc<ChatService>,

    /// 连接刷新与自动登录服务
    pub refresh: Arc<RefreshService>,

    /// 阅读过检服务
    pub read_check: Arc<ReadCheckService>,

    /// API凭证服务
    pub api_keys: Arc<ApiKeyService>,
}

impl AppState {
    /// 初始化应用状态
    ///
    /// 协议客户端初始化失败将导致整个应用无法启动:
    /// 没有通信渠道的状态等同于无用
    pub fn new(db: DatabaseManager) -> Result<Self, ApiError> {
        let protocol = Arc::new(ProtocolClient::new()?);
        let pool = db.pool().clone();

        let login = Arc::new(LoginService::new(pool.clone(), Arc::clone(&protocol)));
        let chat = Arc::new(ChatService::new(pool.clone(), Arc::clone(&protocol)));
        let refresh = Arc::new(RefreshService::new(pool.clone(), Arc::clone(&protocol)));
        let read_check = Arc::new(ReadCheckService::new(pool.clone(), Arc::clone(&protocol)));
        let api_keys = Arc::new(ApiKeyService::new(pool));

        tracing::info!("AppState initialized");

        Ok(Self {
            db,
            protocol,
            login,
            chat,
            refresh,
            read_check,
            api_keys,
        })
    }
}
