use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use sqlx::PgPool;

use crate::models::{
    AppError, AutoLoginResult, AutoLoginTrigger, Connection, ConnectionLogType, LoginType,
    RefreshLog, RefreshType,
};
use crate::services::protocol_client::ProtocolClient;
use crate::storage::{
    AuthCodeQueries, AutoLoginLogQueries, ConnectionLogQueries, ConnectionQueries,
    LoginRecordQueries, ProtocolConfigQueries, RefreshLogQueries,
};

/// 连接刷新与自动登录服务
///
/// 定时维护的两条主路径:
/// - 刷新: 探测所有启用连接,顺带刷新其授权码的在线状态
/// - 自动登录: 对离线授权码发起免扫码唤醒
///
/// 单次失败只记录,不重试不退避,下个tick自然再来一轮。
pub struct RefreshService {
    pool: PgPool,
    protocol: Arc<ProtocolClient>,
}

/// 单个连接的刷新结果
struct ConnectionRefreshOutcome {
    connection_name: String,
    reachable: bool,
}

impl RefreshService {
    pub fn new(pool: PgPool, protocol: Arc<ProtocolClient>) -> Self {
        Self { pool, protocol }
    }

    /// 刷新一轮连接
    ///
    /// 并发探测所有候选连接,每轮落一条刷新日志,
    /// 汇总 尝试/成功/失败 数量。`wechatx_only` 只保留wechatx系连接。
    pub async fn refresh_connections(
        &self,
        refresh_type: RefreshType,
        wechatx_only: bool,
    ) -> Result<RefreshLog, AppError> {
        let connections = ConnectionQueries::list_active(&self.pool).await?;

        let candidates: Vec<Connection> = connections
            .into_iter()
            .filter(|c| {
                !wechatx_only || c.kind().map(|k| k.is_wechatx_family()).unwrap_or(false)
            })
            .collect();

        let attempted = candidates.len() as i32;

        tracing::info!(
            refresh_type = refresh_type.as_str(),
            connection_count = attempted,
            wechatx_only = wechatx_only,
            "开始刷新连接"
        );

        let outcomes = join_all(
            candidates
                .iter()
                .map(|conn| self.refresh_one_connection(conn)),
        )
        .await;

        let mut success_count = 0i32;
        let mut failed_count = 0i32;
        for outcome in &outcomes {
            if outcome.reachable {
                success_count += 1;
            } else {
                failed_count += 1;
                tracing::warn!(connection = %outcome.connection_name, "连接探测失败");
            }
        }

        let log = RefreshLogQueries::append(
            &self.pool,
            refresh_type,
            attempted,
            success_count,
            failed_count,
            "",
        )
        .await?;
        ProtocolConfigQueries::touch_last_refresh(&self.pool).await?;

        tracing::info!(
            refresh_type = refresh_type.as_str(),
            success = success_count,
            failed = failed_count,
            "连接刷新完成"
        );

        Ok(log)
    }

    /// 探测单个连接并刷新其授权码状态
    ///
    /// 探测结果无论成败都追加一条 query 类型的连接日志;
    /// 只有探测成功才继续查授权码在线状态,失败时不再打扰对端
    async fn refresh_one_connection(&self, conn: &Connection) -> ConnectionRefreshOutcome {
        let reachable = self.protocol.test_connection(conn).await;

        let message = if reachable {
            format!("连接测试成功: {}", conn.display_name())
        } else {
            format!("连接测试失败: {}", conn.display_name())
        };

        if let Err(e) =
            ConnectionLogQueries::append(&self.pool, conn.id, ConnectionLogType::Query, &message, reachable)
                .await
        {
            tracing::error!(connection = %conn.name, error = %e, "连接日志写入失败");
        }

        if reachable {
            if let Err(e) = self.refresh_auth_codes(conn).await {
                tracing::error!(connection = %conn.name, error = %e, "授权码状态刷新失败");
            }
        }

        ConnectionRefreshOutcome {
            connection_name: conn.name.clone(),
            reachable,
        }
    }

    /// 刷新连接下所有授权码的在线状态
    async fn refresh_auth_codes(&self, conn: &Connection) -> Result<(), AppError> {
        let codes = AuthCodeQueries::list_by_connection(&self.pool, conn.id).await?;

        for code in codes {
            match self.protocol.query_online(conn, &code.code).await {
                Ok(online) => {
                    AuthCodeQueries::update_online_status(&self.pool, code.id, Some(online))
                        .await?;
                    AuthCodeQueries::update_query_result(&self.pool, code.id, true).await?;
                }
                Err(e) => {
                    tracing::debug!(wxid = %code.code, error = %e, "在线状态查询失败");
                    AuthCodeQueries::update_query_result(&self.pool, code.id, false).await?;
                }
            }
        }

        Ok(())
    }

    /// 自动登录一轮
    ///
    /// 遍历离线/未知状态的授权码,逐个尝试免扫码唤醒。
    /// 每次尝试落一条自动登录日志,结果为枚举:
    /// success / failed / skipped(需要二维码) / error(调用异常)
    pub async fn auto_login_sweep(&self, trigger: AutoLoginTrigger) -> Result<(), AppError> {
        let codes = AuthCodeQueries::list_offline(&self.pool).await?;

        tracing::info!(
            trigger = trigger.as_str(),
            candidate_count = codes.len(),
            "开始自动登录"
        );

        for code in codes {
            let conn = match ConnectionQueries::get_by_id(&self.pool, code.connection_id).await? {
                Some(conn) => conn,
                None => continue,
            };

            let started = Instant::now();
            let attempt = self.protocol.auto_login(&conn, &code.code).await;
            let duration = started.elapsed().as_secs_f64();

            let (result, message, response) = match attempt {
                Ok(outcome) => (outcome.result, outcome.message, outcome.response),
                Err(e) => (AutoLoginResult::Error, format!("执行错误: {}", e), None),
            };

            AutoLoginLogQueries::append(
                &self.pool,
                trigger,
                &code.code,
                &conn.name,
                result,
                &message,
                response,
                Some(duration),
            )
            .await?;

            match result {
                AutoLoginResult::Success => {
                    AuthCodeQueries::update_online_status(&self.pool, code.id, Some(true)).await?;
                    LoginRecordQueries::append(
                        &self.pool,
                        conn.user_id,
                        conn.id,
                        LoginType::Auto,
                        &code.code,
                        &code.nickname,
                        true,
                        "",
                    )
                    .await?;
                    tracing::info!(wxid = %code.code, duration = duration, "自动登录成功");
                }
                AutoLoginResult::Skipped => {
                    tracing::info!(wxid = %code.code, "需要扫码,跳过自动登录");
                }
                AutoLoginResult::Failed | AutoLoginResult::Error => {
                    tracing::warn!(wxid = %code.code, message = %message, "自动登录未成功");
                }
            }
        }

        Ok(())
    }
}
