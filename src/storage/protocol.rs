use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::config::ProtocolDefaults;
use crate::models::{
    AutoLoginLog, AutoLoginResult, AutoLoginTrigger, ProtocolConfig, RefreshLog, RefreshType,
    StorageError,
};

/// 协议配置查询操作
///
/// 配置是pk=1的单例行,首次访问时惰性创建
pub struct ProtocolConfigQueries;

impl ProtocolConfigQueries {
    /// 获取配置实例,不存在则按启动默认值创建
    pub async fn get_or_create(
        pool: &PgPool,
        defaults: &ProtocolDefaults,
    ) -> Result<ProtocolConfig, StorageError> {
        let mut config = sqlx::query_as::<_, ProtocolConfig>(
            r#"
            INSERT INTO protocol_config
                (id, refresh_interval, refresh_wechatx_only)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET id = protocol_config.id
            RETURNING *
            "#,
        )
        .bind(defaults.default_refresh_interval)
        .bind(defaults.default_refresh_wechatx_only)
        .fetch_one(pool)
        .await?;

        // 历史数据可能越界,读取时收敛
        config.clamp(defaults);
        Ok(config)
    }

    /// 记录一次刷新完成时间
    pub async fn touch_last_refresh(pool: &PgPool) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE protocol_config SET last_refresh_time = NOW(), updated_at = NOW() WHERE id = 1",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// 刷新日志查询操作
pub struct RefreshLogQueries;

impl RefreshLogQueries {
    pub async fn append(
        pool: &PgPool,
        refresh_type: RefreshType,
        connection_count: i32,
        success_count: i32,
        failed_count: i32,
        error_message: &str,
    ) -> Result<RefreshLog, StorageError> {
        let log = sqlx::query_as::<_, RefreshLog>(
            r#"
            INSERT INTO protocol_refresh_log
                (refresh_type, connection_count, success_count, failed_count, error_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(refresh_type.as_str())
        .bind(connection_count)
        .bind(success_count)
        .bind(failed_count)
        .bind(error_message)
        .fetch_one(pool)
        .await?;
        Ok(log)
    }

    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM protocol_refresh_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// 自动登录日志查询操作
pub struct AutoLoginLogQueries;

impl AutoLoginLogQueries {
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        pool: &PgPool,
        trigger: AutoLoginTrigger,
        wxid: &str,
        connection_name: &str,
        result: AutoLoginResult,
        message: &str,
        response_data: Option<serde_json::Value>,
        duration: Option<f64>,
    ) -> Result<AutoLoginLog, StorageError> {
        let log = sqlx::query_as::<_, AutoLoginLog>(
            r#"
            INSERT INTO protocol_auto_login_log
                (login_type, wxid, connection_name, result, message, response_data, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(trigger.as_str())
        .bind(wxid)
        .bind(connection_name)
        .bind(result.as_str())
        .bind(message)
        .bind(response_data)
        .bind(duration)
        .fetch_one(pool)
        .await?;
        Ok(log)
    }

    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM protocol_auto_login_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
