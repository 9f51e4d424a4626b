use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ProtocolDefaults;
use crate::database::DbPool;
use crate::models::{AutoLoginTrigger, RefreshType, StorageError};
use crate::services::refresh_service::RefreshService;
use crate::storage::{
    ApiRequestQueries, AutoLoginLogQueries, ConnectionLogQueries, LoginLogQueries,
    LoginRecordQueries, ProtocolConfigQueries, QrSessionQueries, RefreshLogQueries,
};

/// 日志清理的运行周期: 每天一次
const CLEANUP_PERIOD_SECS: u64 = 24 * 60 * 60;

/// 清理任务首跑延迟,避开启动高峰
const CLEANUP_INITIAL_DELAY_SECS: u64 = 300;

/// 定时维护调度器
///
/// 启动时读取协议配置单例,按需拉起三类周期任务:
/// - 自动刷新: 每refresh_interval分钟刷新一轮连接
/// - 自动登录: 每auto_login_interval分钟对离线账号唤醒一轮
/// - 日志清理: 无条件启动,每天删除超过保留期的日志
///
/// 每个任务持有根令牌的子令牌,`shutdown` 取消并等待全部退出:
/// 进程退出不再是唯一的停止手段。
/// 任务之间只共享配置行,互不协调;单次tick失败只记录日志,
/// 等待下一个tick。
pub struct Scheduler {
    root: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// 启动维护任务
    ///
    /// 配置读取失败时打日志后放弃启动定时任务,绝不让进程启动失败
    pub async fn start(
        &mut self,
        pool: DbPool,
        defaults: ProtocolDefaults,
        refresh: Arc<RefreshService>,
    ) {
        let config = match ProtocolConfigQueries::get_or_create(&pool, &defaults).await {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "读取协议配置失败,定时维护任务未启动");
                return;
            }
        };

        if config.auto_refresh_enabled {
            self.spawn_refresh_job(
                pool.clone(),
                defaults.clone(),
                Arc::clone(&refresh),
                config.refresh_interval,
            );
            tracing::info!(
                interval_minutes = config.refresh_interval,
                wechatx_only = config.refresh_wechatx_only,
                "自动刷新任务已启动"
            );
        }

        if config.auto_login_enabled {
            self.spawn_auto_login_job(
                pool.clone(),
                defaults.clone(),
                Arc::clone(&refresh),
                config.auto_login_interval,
            );
            tracing::info!(
                interval_minutes = config.auto_login_interval,
                "自动登录任务已启动"
            );
        }

        self.spawn_cleanup_job(pool, defaults);
        tracing::info!(
            retention_days = config.log_retention_days,
            "自动日志清理任务已启动"
        );
    }

    /// 自动刷新任务
    ///
    /// 间隔在启动时固定;开关位每个tick重读,关掉后任务空转不再刷新
    fn spawn_refresh_job(
        &mut self,
        pool: DbPool,
        defaults: ProtocolDefaults,
        refresh: Arc<RefreshService>,
        interval_minutes: i32,
    ) {
        let token = self.root.child_token();
        let period = Duration::from_secs(interval_minutes.max(1) as u64 * 60);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("自动刷新任务收到取消信号,退出");
                        break;
                    }
                    _ = ticker.tick() => {
                        let config = match ProtocolConfigQueries::get_or_create(&pool, &defaults).await {
                            Ok(config) => config,
                            Err(e) => {
                                tracing::error!(error = %e, "自动刷新: 读取配置失败,跳过本轮");
                                continue;
                            }
                        };

                        if !config.auto_refresh_enabled {
                            tracing::debug!("自动刷新已关闭,跳过本轮");
                            continue;
                        }

                        match refresh
                            .refresh_connections(RefreshType::Auto, config.refresh_wechatx_only)
                            .await
                        {
                            Ok(log) => tracing::info!(
                                attempted = log.connection_count,
                                success = log.success_count,
                                failed = log.failed_count,
                                "自动刷新完成"
                            ),
                            Err(e) => tracing::error!(error = %e, "自动刷新执行失败"),
                        }
                    }
                }
            }
        });

        self.handles.push(handle);
    }

    /// 自动登录任务
    fn spawn_auto_login_job(
        &mut self,
        pool: DbPool,
        defaults: ProtocolDefaults,
        refresh: Arc<RefreshService>,
        interval_minutes: i32,
    ) {
        let token = self.root.child_token();
        let period = Duration::from_secs(interval_minutes.max(1) as u64 * 60);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("自动登录任务收到取消信号,退出");
                        break;
                    }
                    _ = ticker.tick() => {
                        let config = match ProtocolConfigQueries::get_or_create(&pool, &defaults).await {
                            Ok(config) => config,
                            Err(e) => {
                                tracing::error!(error = %e, "自动登录: 读取配置失败,跳过本轮");
                                continue;
                            }
                        };

                        if !config.auto_login_enabled {
                            tracing::debug!("自动登录已关闭,跳过本轮");
                            continue;
                        }

                        if let Err(e) = refresh.auto_login_sweep(AutoLoginTrigger::Scheduled).await {
                            tracing::error!(error = %e, "自动登录执行失败");
                        }
                    }
                }
            }
        });

        self.handles.push(handle);
    }

    /// 日志清理任务,无条件运行
    fn spawn_cleanup_job(&mut self, pool: DbPool, defaults: ProtocolDefaults) {
        let token = self.root.child_token();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(
                Instant::now() + Duration::from_secs(CLEANUP_INITIAL_DELAY_SECS),
                Duration::from_secs(CLEANUP_PERIOD_SECS),
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("日志清理任务收到取消信号,退出");
                        break;
                    }
                    _ = ticker.tick() => {
                        let retention_days = match ProtocolConfigQueries::get_or_create(&pool, &defaults).await {
                            Ok(config) => config.log_retention_days,
                            Err(e) => {
                                tracing::error!(error = %e, "日志清理: 读取配置失败,跳过本轮");
                                continue;
                            }
                        };

                        match purge_old_logs(&pool, retention_days).await {
                            Ok(deleted) => tracing::info!(
                                retention_days = retention_days,
                                deleted = deleted,
                                "日志清理完成"
                            ),
                            Err(e) => tracing::error!(error = %e, "日志清理执行失败"),
                        }
                    }
                }
            }
        });

        self.handles.push(handle);
    }

    /// 停止全部维护任务并等待退出
    pub async fn shutdown(self) {
        tracing::info!("正在停止定时维护任务...");
        self.root.cancel();

        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "维护任务退出异常");
            }
        }

        tracing::info!("定时维护任务已全部停止");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// 删除所有日志表中早于保留期的行,返回删除总数
async fn purge_old_logs(pool: &DbPool, retention_days: i32) -> Result<u64, StorageError> {
    let cutoff = Utc::now() - ChronoDuration::days(retention_days as i64);
    let mut total = 0u64;

    total += ConnectionLogQueries::delete_older_than(pool, cutoff).await?;
    total += LoginLogQueries::delete_older_than(pool, cutoff).await?;
    total += LoginRecordQueries::delete_older_than(pool, cutoff).await?;
    total += QrSessionQueries::delete_older_than(pool, cutoff).await?;
    total += RefreshLogQueries::delete_older_than(pool, cutoff).await?;
    total += AutoLoginLogQueries::delete_older_than(pool, cutoff).await?;
    total += ApiRequestQueries::delete_older_than(pool, cutoff).await?;

    Ok(total)
}
