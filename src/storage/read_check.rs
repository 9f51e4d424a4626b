use sqlx::PgPool;

use crate::models::{
    ProcessLogType, ReadCheckConfig, ReadCheckLog, ReadCheckProcessLog, ReadCheckResult,
    ReadCheckSession, ReadCheckStatus, StorageError,
};

/// 阅读过检配置查询操作
pub struct ReadCheckConfigQueries;

impl ReadCheckConfigQueries {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        protocol_url: &str,
        wxids: &[String],
    ) -> Result<ReadCheckConfig, StorageError> {
        let config = sqlx::query_as::<_, ReadCheckConfig>(
            r#"
            INSERT INTO read_check_config (user_id, protocol_url, wxids)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(protocol_url)
        .bind(serde_json::to_value(wxids)?)
        .fetch_one(pool)
        .await?;
        Ok(config)
    }

    pub async fn get_by_id(
        pool: &PgPool,
        id: i64,
    ) -> Result<Option<ReadCheckConfig>, StorageError> {
        let config =
            sqlx::query_as::<_, ReadCheckConfig>("SELECT * FROM read_check_config WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(config)
    }

    /// 增加检测次数,单条UPDATE保证计数原子性
    pub async fn increment_check_count(
        pool: &PgPool,
        id: i64,
        success: bool,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE read_check_config
            SET total_checks = total_checks + 1,
                success_checks = success_checks + CASE WHEN $2 THEN 1 ELSE 0 END,
                failed_checks = failed_checks + CASE WHEN $2 THEN 0 ELSE 1 END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(success)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// 阅读过检日志查询操作 (单账号结果)
pub struct ReadCheckLogQueries;

impl ReadCheckLogQueries {
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        pool: &PgPool,
        config_id: i64,
        url: &str,
        wxid: &str,
        read_count_before: Option<i32>,
        read_count_after: Option<i32>,
        increased: bool,
        success: bool,
        error_message: &str,
    ) -> Result<ReadCheckLog, StorageError> {
        let log = sqlx::query_as::<_, ReadCheckLog>(
            r#"
            INSERT INTO read_check_log
                (config_id, url, wxid, read_count_before, read_count_after,
                 increased, success, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(config_id)
        .bind(url)
        .bind(wxid)
        .bind(read_count_before)
        .bind(read_count_after)
        .bind(increased)
        .bind(success)
        .bind(error_message)
        .fetch_one(pool)
        .await?;
        Ok(log)
    }
}

/// 检测会话查询操作
pub struct ReadCheckSessionQueries;

impl ReadCheckSessionQueries {
    /// 创建会话,初始状态running
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        url: &str,
        total_accounts: i32,
    ) -> Result<ReadCheckSession, StorageError> {
        let session = sqlx::query_as::<_, ReadCheckSession>(
            r#"
            INSERT INTO read_check_session (user_id, url, total_accounts)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(url)
        .bind(total_accounts)
        .fetch_one(pool)
        .await?;
        Ok(session)
    }

    /// 更新阅读量观测值与账号计数
    pub async fn update_counts(
        pool: &PgPool,
        id: i64,
        successful_accounts: i32,
        failed_accounts: i32,
        initial_read_count: Option<i32>,
        final_read_count: Option<i32>,
        increased_count: i32,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE read_check_session
            SET successful_accounts = $2,
                failed_accounts = $3,
                initial_read_count = $4,
                final_read_count = $5,
                increased_count = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(successful_accounts)
        .bind(failed_accounts)
        .bind(initial_read_count)
        .bind(final_read_count)
        .bind(increased_count)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 终态转换: running -> {completed, failed}
    ///
    /// completed_at 只在首次终态转换时设置 (WHERE completed_at IS NULL)
    pub async fn finish(
        pool: &PgPool,
        id: i64,
        status: ReadCheckStatus,
        result: ReadCheckResult,
    ) -> Result<Option<ReadCheckSession>, StorageError> {
        let session = sqlx::query_as::<_, ReadCheckSession>(
            r#"
            UPDATE read_check_session
            SET status = $2, result = $3, completed_at = NOW()
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(result.as_str())
        .fetch_optional(pool)
        .await?;
        Ok(session)
    }
}

/// 检测流程日志查询操作
pub struct ProcessLogQueries;

impl ProcessLogQueries {
    /// 追加一条流程日志
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        pool: &PgPool,
        session_id: i64,
        log_type: ProcessLogType,
        message: &str,
        wxid: &str,
        protocol_url: &str,
        read_count: Option<i32>,
        previous_read_count: Option<i32>,
    ) -> Result<ReadCheckProcessLog, StorageError> {
        let log = sqlx::query_as::<_, ReadCheckProcessLog>(
            r#"
            INSERT INTO read_check_process_log
                (session_id, log_type, message, wxid, protocol_url,
                 read_count, previous_read_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(log_type.as_str())
        .bind(message)
        .bind(wxid)
        .bind(protocol_url)
        .bind(read_count)
        .bind(previous_read_count)
        .fetch_one(pool)
        .await?;
        Ok(log)
    }

    /// 按时间升序回放会话的流程日志
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: i64,
    ) -> Result<Vec<ReadCheckProcessLog>, StorageError> {
        let logs = sqlx::query_as::<_, ReadCheckProcessLog>(
            r#"
            SELECT * FROM read_check_process_log
            WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(pool)
        .await?;
        Ok(logs)
    }
}
