use sqlx::PgPool;

use crate::models::{ApiKey, ApiRequestType, AppError};
use crate::storage::{ApiKeyQueries, ApiRequestQueries};

/// API凭证服务
///
/// 对外REST层的鉴权与审计落库。路由本身不在本服务内,
/// 这里只负责: 密钥校验 + 每次调用一条审计记录。
pub struct ApiKeyService {
    pool: PgPool,
}

impl ApiKeyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 校验密钥并检查权限
    ///
    /// 通过校验的密钥顺带刷新最后使用时间。
    /// 返回None表示: 密钥不存在、已停用或权限不足。
    pub async fn verify(
        &self,
        key: &str,
        permission: &str,
    ) -> Result<Option<ApiKey>, AppError> {
        let api_key = match ApiKeyQueries::find_active(&self.pool, key).await? {
            Some(api_key) => api_key,
            None => return Ok(None),
        };

        if !api_key.has_permission(permission) {
            tracing::warn!(
                key_name = %api_key.name,
                permission = permission,
                "API密钥权限不足"
            );
            return Ok(None);
        }

        ApiKeyQueries::touch_last_used(&self.pool, api_key.id).await?;
        Ok(Some(api_key))
    }

    /// 记录一次API调用
    #[allow(clippy::too_many_arguments)]
    pub async fn record_request(
        &self,
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
    ) -> Result<(), AppError> {
        ApiRequestQueries::append(
            &self.pool,
            user_id,
            request_type,
            wxid,
            appid,
            request_data,
            response_data,
            success,
            error_message,
            ip_address,
            user_agent,
        )
        .await?;
        Ok(())
    }
}
