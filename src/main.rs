use std::sync::Arc;

use wechat_admin::config::AppConfig;
use wechat_admin::database::DatabaseManager;
use wechat_admin::services::Scheduler;
use wechat_admin::state::AppState;
use wechat_admin::utils::logger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 先加载配置再初始化日志,.env里可能带着RUST_LOG
    let config = AppConfig::from_env();
    logger::init()?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "微信协议后台管理服务启动中"
    );

    // 数据库: 连接 -> 建表 -> 健康检查
    let db = DatabaseManager::new(&config.database).await?;
    db.migrate().await?;
    db.health_check().await?;

    let state = AppState::new(db)?;

    // 定时维护任务: 启动失败只打日志,不阻止服务运行
    let mut scheduler = Scheduler::new();
    scheduler
        .start(
            state.db.pool().clone(),
            config.protocol.clone(),
            Arc::clone(&state.refresh),
        )
        .await;

    tracing::info!("服务已就绪,Ctrl-C退出");

    // 等待退出信号,取消维护任务后关闭连接池
    tokio::signal::ctrl_c().await?;
    tracing::info!("收到退出信号,开始关闭");

    scheduler.shutdown().await;
    state.db.close().await;

    tracing::info!("服务已退出");
    Ok(())
}
