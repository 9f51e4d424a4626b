use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{
    LoginLog, LoginRecord, LoginType, QrCodeSession, QrSessionStatus, SessionType, StorageError,
    User,
};

/// 用户查询操作
pub struct UserQueries;

impl UserQueries {
    pub async fn create(pool: &PgPool, username: &str) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username) VALUES ($1) RETURNING *",
        )
        .bind(username)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    pub async fn get_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }
}

/// 登录日志查询操作 (后台用户登录审计)
pub struct LoginLogQueries;

impl LoginLogQueries {
    pub async fn append(
        pool: &PgPool,
        user_id: i64,
        ip_address: &str,
        user_agent: &str,
        success: bool,
    ) -> Result<LoginLog, StorageError> {
        let log = sqlx::query_as::<_, LoginLog>(
            r#"
            INSERT INTO login_log (user_id, ip_address, user_agent, success)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(success)
        .fetch_one(pool)
        .await?;
        Ok(log)
    }

    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM login_log WHERE login_time < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// 二维码会话查询操作
pub struct QrSessionQueries;

impl QrSessionQueries {
    /// 创建会话,初始状态固定为pending
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        connection_id: i64,
        session_type: SessionType,
        uuid: &str,
        qr_code_url: &str,
        qr_base64: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<QrCodeSession, StorageError> {
        let session = sqlx::query_as::<_, QrCodeSession>(
            r#"
            INSERT INTO qr_code_session
                (user_id, connection_id, session_type, uuid, qr_code_url, qr_base64, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(connection_id)
        .bind(session_type.as_str())
        .bind(uuid)
        .bind(qr_code_url)
        .bind(qr_base64)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    pub async fn get_by_uuid(
        pool: &PgPool,
        uuid: &str,
    ) -> Result<Option<QrCodeSession>, StorageError> {
        let session =
            sqlx::query_as::<_, QrCodeSession>("SELECT * FROM qr_code_session WHERE uuid = $1")
                .bind(uuid)
                .fetch_optional(pool)
                .await?;
        Ok(session)
    }

    /// 更新状态并立即持久化
    ///
    /// 无条件赋值,不校验转换合法性;wxid/nickname仅在非空时覆盖。
    /// 返回更新后的会话。
    pub async fn update_status(
        pool: &PgPool,
        uuid: &str,
        status: QrSessionStatus,
        wxid: Option<&str>,
        nickname: Option<&str>,
    ) -> Result<QrCodeSession, StorageError> {
        let session = sqlx::query_as::<_, QrCodeSession>(
            r#"
            UPDATE qr_code_session
            SET status = $2,
                wxid = COALESCE(NULLIF($3, ''), wxid),
                nickname = COALESCE(NULLIF($4, ''), nickname),
                updated_at = NOW()
            WHERE uuid = $1
            RETURNING *
            "#,
        )
        .bind(uuid)
        .bind(status.as_str())
        .bind(wxid.unwrap_or(""))
        .bind(nickname.unwrap_or(""))
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// 删除早于截止时间的会话记录
    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM qr_code_session WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// 登录记录查询操作
pub struct LoginRecordQueries;

impl LoginRecordQueries {
    pub async fn append(
        pool: &PgPool,
        user_id: i64,
        connection_id: i64,
        login_type: LoginType,
        wxid: &str,
        nickname: &str,
        success: bool,
        error_message: &str,
    ) -> Result<LoginRecord, StorageError> {
        let record = sqlx::query_as::<_, LoginRecord>(
            r#"
            INSERT INTO wechat_login_record
                (user_id, connection_id, login_type, wxid, nickname, success, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(connection_id)
        .bind(login_type.as_str())
        .bind(wxid)
        .bind(nickname)
        .bind(success)
        .bind(error_message)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM wechat_login_record WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
