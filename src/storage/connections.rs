use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{AuthCode, Connection, ConnectionLog, ConnectionLogType, StorageError};

/// 连接查询操作
pub struct ConnectionQueries;

impl ConnectionQueries {
    /// 创建连接
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        name: &str,
        url: &str,
        connection_type: &str,
        admin_key: &str,
    ) -> Result<Connection, StorageError> {
        let conn = sqlx::query_as::<_, Connection>(
            r#"
            INSERT INTO connection (user_id, name, url, connection_type, admin_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(url)
        .bind(connection_type)
        .bind(admin_key)
        .fetch_one(pool)
        .await?;

        Ok(conn)
    }

    /// 根据ID获取连接
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<Connection>, StorageError> {
        let conn = sqlx::query_as::<_, Connection>("SELECT * FROM connection WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(conn)
    }

    /// 列出所有启用的连接
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Connection>, StorageError> {
        let conns = sqlx::query_as::<_, Connection>(
            "SELECT * FROM connection WHERE is_active = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(conns)
    }

    /// 列出用户的连接
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Connection>, StorageError> {
        let conns = sqlx::query_as::<_, Connection>(
            "SELECT * FROM connection WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(conns)
    }

    /// 删除连接,级联删除授权码/日志/聊天数据
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM connection WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// 授权码查询操作
pub struct AuthCodeQueries;

impl AuthCodeQueries {
    /// 创建授权码
    pub async fn create(
        pool: &PgPool,
        connection_id: i64,
        code: &str,
        remark: &str,
    ) -> Result<AuthCode, StorageError> {
        let auth_code = sqlx::query_as::<_, AuthCode>(
            r#"
            INSERT INTO auth_code (connection_id, code, remark)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(code)
        .bind(remark)
        .fetch_one(pool)
        .await?;

        Ok(auth_code)
    }

    /// 根据ID获取授权码
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<AuthCode>, StorageError> {
        let code = sqlx::query_as::<_, AuthCode>("SELECT * FROM auth_code WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(code)
    }

    /// 根据连接与wxid获取授权码
    pub async fn get_by_code(
        pool: &PgPool,
        connection_id: i64,
        code: &str,
    ) -> Result<Option<AuthCode>, StorageError> {
        let auth_code = sqlx::query_as::<_, AuthCode>(
            "SELECT * FROM auth_code WHERE connection_id = $1 AND code = $2",
        )
        .bind(connection_id)
        .bind(code)
        .fetch_optional(pool)
        .await?;
        Ok(auth_code)
    }

    /// 列出连接下的授权码
    pub async fn list_by_connection(
        pool: &PgPool,
        connection_id: i64,
    ) -> Result<Vec<AuthCode>, StorageError> {
        let codes = sqlx::query_as::<_, AuthCode>(
            "SELECT * FROM auth_code WHERE connection_id = $1 ORDER BY created_at DESC",
        )
        .bind(connection_id)
        .fetch_all(pool)
        .await?;
        Ok(codes)
    }

    /// 列出所有离线或状态未知的授权码 (自动登录候选)
    ///
    /// 只考虑启用中的连接
    pub async fn list_offline(pool: &PgPool) -> Result<Vec<AuthCode>, StorageError> {
        let codes = sqlx::query_as::<_, AuthCode>(
            r#"
            SELECT a.* FROM auth_code a
            JOIN connection c ON c.id = a.connection_id
            WHERE c.is_active = TRUE
              AND (a.is_online = FALSE OR a.is_online IS NULL)
            ORDER BY a.id
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(codes)
    }

    /// 更新在线状态与检查时间
    pub async fn update_online_status(
        pool: &PgPool,
        id: i64,
        is_online: Option<bool>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE auth_code
            SET is_online = $2, last_status_check_time = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(is_online)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 更新最后查询结果
    pub async fn update_query_result(
        pool: &PgPool,
        id: i64,
        success: bool,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE auth_code
            SET last_query_success = $2, last_query_time = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(success)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 更新备注 (已编码的原始文本)
    pub async fn update_remark(pool: &PgPool, id: i64, remark: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE auth_code SET remark = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(remark)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 登录成功后回填昵称/头像
    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        nickname: &str,
        avatar_url: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE auth_code
            SET nickname = $2, avatar_url = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(nickname)
        .bind(avatar_url)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// 连接日志查询操作
pub struct ConnectionLogQueries;

impl ConnectionLogQueries {
    /// 追加一条连接日志
    pub async fn append(
        pool: &PgPool,
        connection_id: i64,
        log_type: ConnectionLogType,
        message: &str,
        success: bool,
    ) -> Result<ConnectionLog, StorageError> {
        let log = sqlx::query_as::<_, ConnectionLog>(
            r#"
            INSERT INTO connection_log (connection_id, log_type, message, success)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(log_type.as_str())
        .bind(message)
        .bind(success)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// 列出连接的日志,新的在前
    pub async fn list_by_connection(
        pool: &PgPool,
        connection_id: i64,
        limit: i64,
    ) -> Result<Vec<ConnectionLog>, StorageError> {
        let logs = sqlx::query_as::<_, ConnectionLog>(
            r#"
            SELECT * FROM connection_log
            WHERE connection_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(connection_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(logs)
    }

    /// 删除早于截止时间的日志,返回删除行数
    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM connection_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
