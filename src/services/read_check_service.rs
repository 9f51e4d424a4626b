use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sqlx::PgPool;

use crate::models::{
    AppError, ProcessLogType, ReadCheckResult, ReadCheckSession, ReadCheckStatus, StorageError,
};
use crate::services::protocol_client::ProtocolClient;
use crate::storage::{
    ProcessLogQueries, ReadCheckConfigQueries, ReadCheckLogQueries, ReadCheckSessionQueries,
};

/// 账号之间的随机间隔范围(秒),连续快速阅读容易触发风控
const ACCOUNT_DELAY_RANGE: (u64, u64) = (1, 3);

/// 阅读过检服务
///
/// 一次检测运行: 记录初始阅读量 -> 轮换配置的wxid逐个发起阅读
/// -> 记录第二次阅读量 -> 按差值分类结果。
/// 每个离散步骤追加一条流程日志,形成可回放的时间线。
pub struct ReadCheckService {
    pool: PgPool,
    protocol: Arc<ProtocolClient>,
}

impl ReadCheckService {
    pub fn new(pool: PgPool, protocol: Arc<ProtocolClient>) -> Self {
        Self { pool, protocol }
    }

    /// 执行一次检测
    ///
    /// 会话状态 running -> {completed, failed};completed_at 仅在
    /// 终态转换时设置一次。检测"成功"定义为阅读量确实增加。
    pub async fn run(&self, config_id: i64, article_url: &str) -> Result<ReadCheckSession, AppError> {
        let config = ReadCheckConfigQueries::get_by_id(&self.pool, config_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("过检配置 {} 不存在", config_id)))?;

        let wxids: Vec<String> = config.wxids.0.clone();
        let session = ReadCheckSessionQueries::create(
            &self.pool,
            config.user_id,
            article_url,
            wxids.len() as i32,
        )
        .await?;

        tracing::info!(
            session_id = session.id,
            config_id = config.id,
            account_count = wxids.len(),
            "开始阅读检测"
        );

        self.log_step(session.id, ProcessLogType::Start, "开始检测", "", "")
            .await?;
        self.log_step(
            session.id,
            ProcessLogType::TargetUrl,
            &format!("目标文章: {}", article_url),
            "",
            "",
        )
        .await?;
        self.log_step(
            session.id,
            ProcessLogType::Protocol,
            &format!("使用协议: {}", config.protocol_url),
            "",
            &config.protocol_url,
        )
        .await?;

        // 第一次阅读量观测,取不到直接终止为failed
        let initial = match self
            .protocol
            .fetch_read_count(&config.protocol_url, article_url)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                return self
                    .fail_session(&config, session.id, &format!("获取初始阅读量失败: {}", e))
                    .await;
            }
        };

        ProcessLogQueries::append(
            &self.pool,
            session.id,
            ProcessLogType::FirstRead,
            &format!("第一次阅读量: {}", initial),
            "",
            "",
            Some(initial),
            None,
        )
        .await?;

        // 轮换账号发起阅读
        let mut successful_accounts = 0i32;
        let mut failed_accounts = 0i32;

        for wxid in &wxids {
            self.log_step(
                session.id,
                ProcessLogType::Account,
                &format!("使用账号 {} 发起阅读", wxid),
                wxid,
                &config.protocol_url,
            )
            .await?;

            let read_result = self
                .protocol
                .read_article(&config.protocol_url, wxid, article_url)
                .await;

            let (success, error_message) = match &read_result {
                Ok(()) => {
                    successful_accounts += 1;
                    (true, String::new())
                }
                Err(e) => {
                    failed_accounts += 1;
                    (false, e.to_string())
                }
            };

            ReadCheckLogQueries::append(
                &self.pool,
                config.id,
                article_url,
                wxid,
                Some(initial),
                None,
                false,
                success,
                &error_message,
            )
            .await?;

            if let Err(e) = read_result {
                self.log_step(
                    session.id,
                    ProcessLogType::Warning,
                    &format!("账号 {} 阅读失败: {}", wxid, e),
                    wxid,
                    &config.protocol_url,
                )
                .await?;
            }

            // 账号之间随机停顿。rng不跨await持有
            let delay = {
                let mut rng = rand::thread_rng();
                rng.gen_range(ACCOUNT_DELAY_RANGE.0..=ACCOUNT_DELAY_RANGE.1)
            };
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        // 第二次阅读量观测
        let second = match self
            .protocol
            .fetch_read_count(&config.protocol_url, article_url)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                ReadCheckSessionQueries::update_counts(
                    &self.pool,
                    session.id,
                    successful_accounts,
                    failed_accounts,
                    Some(initial),
                    None,
                    0,
                )
                .await?;
                return self
                    .fail_session(&config, session.id, &format!("获取第二次阅读量失败: {}", e))
                    .await;
            }
        };

        ProcessLogQueries::append(
            &self.pool,
            session.id,
            ProcessLogType::SecondRead,
            &format!("第二次阅读量: {}", second),
            "",
            "",
            Some(second),
            Some(initial),
        )
        .await?;

        let increased = second - initial;
        let result = if increased > 0 {
            ProcessLogQueries::append(
                &self.pool,
                session.id,
                ProcessLogType::ReadChange,
                &format!("检测到阅读量增加 {} ({} -> {})", increased, initial, second),
                "",
                "",
                Some(second),
                Some(initial),
            )
            .await?;
            ReadCheckResult::Increased
        } else {
            self.log_step(
                session.id,
                ProcessLogType::Warning,
                "未检测到阅读量变化",
                "",
                "",
            )
            .await?;
            ReadCheckResult::NoChange
        };

        ReadCheckSessionQueries::update_counts(
            &self.pool,
            session.id,
            successful_accounts,
            failed_accounts,
            Some(initial),
            Some(second),
            increased.max(0),
        )
        .await?;

        self.log_step(session.id, ProcessLogType::Complete, "检测完成", "", "")
            .await?;

        let finished = ReadCheckSessionQueries::finish(
            &self.pool,
            session.id,
            ReadCheckStatus::Completed,
            result,
        )
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("会话 {} 已不在运行态", session.id)))?;

        // 过检成功 = 阅读量确实增加
        ReadCheckConfigQueries::increment_check_count(
            &self.pool,
            config.id,
            result == ReadCheckResult::Increased,
        )
        .await?;

        tracing::info!(
            session_id = session.id,
            result = result.as_str(),
            initial = initial,
            second = second,
            "阅读检测完成"
        );

        Ok(finished)
    }

    /// 以error结果终止会话
    async fn fail_session(
        &self,
        config: &crate::models::ReadCheckConfig,
        session_id: i64,
        message: &str,
    ) -> Result<ReadCheckSession, AppError> {
        tracing::warn!(session_id = session_id, message = %message, "阅读检测出错");

        self.log_step(session_id, ProcessLogType::Error, message, "", "")
            .await?;

        let finished = ReadCheckSessionQueries::finish(
            &self.pool,
            session_id,
            ReadCheckStatus::Failed,
            ReadCheckResult::Error,
        )
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("会话 {} 已不在运行态", session_id)))?;

        ReadCheckConfigQueries::increment_check_count(&self.pool, config.id, false).await?;

        Ok(finished)
    }

    /// 追加一条不带阅读量的流程日志
    async fn log_step(
        &self,
        session_id: i64,
        log_type: ProcessLogType,
        message: &str,
        wxid: &str,
        protocol_url: &str,
    ) -> Result<(), AppError> {
        ProcessLogQueries::append(
            &self.pool,
            session_id,
            log_type,
            message,
            wxid,
            protocol_url,
            None,
            None,
        )
        .await?;
        Ok(())
    }
}
