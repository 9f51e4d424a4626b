use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{ApiKey, ApiRequest, ApiRequestType, StorageError};

/// API密钥查询操作
pub struct ApiKeyQueries;

impl ApiKeyQueries {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        name: &str,
        key: &str,
        permissions: &[String],
    ) -> Result<ApiKey, StorageError> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_key (user_id, name, key, permissions)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(key)
        .bind(serde_json::to_value(permissions)?)
        .fetch_one(pool)
        .await?;
        Ok(api_key)
    }

    /// 查找启用中的密钥
    pub async fn find_active(pool: &PgPool, key: &str) -> Result<Option<ApiKey>, StorageError> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_key WHERE key = $1 AND is_active = TRUE",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(api_key)
    }

    /// 更新最后使用时间
    pub async fn touch_last_used(pool: &PgPool, id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE api_key SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// API请求审计查询操作
pub struct ApiRequestQueries;

impl ApiRequestQueries {
    /// 追加一条请求审计
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        pool: &PgPool,
        user_id: Option<i64>,
        request_type: ApiRequestType,
        wxid: &str,
        appid: &str,
        request_data: serde_json::Value,
        response_data: serde_json::Value,
        success: bool,
        error_message: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<ApiRequest, StorageError> {
        let request = sqlx::query_as::<_, ApiRequest>(
            r#"
            INSERT INTO api_request
                (user_id, request_type, wxid, appid, request_data, response_data,
                 success, error_message, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request_type.as_str())
        .bind(wxid)
        .bind(appid)
        .bind(request_data)
        .bind(response_data)
        .bind(success)
        .bind(error_message)
        .bind(ip_address)
        .bind(user_agent)
        .fetch_one(pool)
        .await?;
        Ok(request)
    }

    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM api_request WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
