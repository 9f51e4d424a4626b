use sqlx::PgPool;

use crate::models::{ChatMessage, ChatSession, StorageError};

/// 聊天消息查询操作
pub struct ChatMessageQueries;

impl ChatMessageQueries {
    /// 插入一条消息
    ///
    /// (auth_code_id, message_id) 冲突时静默跳过,返回None: 重复同步幂等
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &PgPool,
        auth_code_id: i64,
        message_id: &str,
        from_user: &str,
        to_user: &str,
        content: &str,
        push_content: &str,
        message_type: &str,
        is_from_self: bool,
    ) -> Result<Option<ChatMessage>, StorageError> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_message
                (auth_code_id, message_id, from_user, to_user, content,
                 push_content, message_type, is_from_self)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (auth_code_id, message_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(auth_code_id)
        .bind(message_id)
        .bind(from_user)
        .bind(to_user)
        .bind(content)
        .bind(push_content)
        .bind(message_type)
        .bind(is_from_self)
        .fetch_optional(pool)
        .await?;

        Ok(message)
    }

    /// 列出与某个聊天对象的消息,按时间升序
    pub async fn list_by_partner(
        pool: &PgPool,
        auth_code_id: i64,
        partner_id: &str,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_message
            WHERE auth_code_id = $1 AND (from_user = $2 OR to_user = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(auth_code_id)
        .bind(partner_id)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }
}

/// 聊天会话查询操作
pub struct ChatSessionQueries;

impl ChatSessionQueries {
    /// 收到/发出一条消息后更新会话
    ///
    /// 不存在则创建;已存在则刷新最后消息与活动时间。
    /// 收到的消息 (非自己发送) 未读数+1,自己发送不计未读。
    pub async fn upsert_on_message(
        pool: &PgPool,
        auth_code_id: i64,
        partner_id: &str,
        partner_name: &str,
        last_message_id: i64,
        inbound: bool,
    ) -> Result<ChatSession, StorageError> {
        let session = sqlx::query_as::<_, ChatSession>(
            r#"
            INSERT INTO chat_session
                (auth_code_id, partner_id, partner_name, last_message_id,
                 last_activity, unread_count)
            VALUES ($1, $2, $3, $4, NOW(), CASE WHEN $5 THEN 1 ELSE 0 END)
            ON CONFLICT (auth_code_id, partner_id) DO UPDATE
            SET partner_name = COALESCE(NULLIF(EXCLUDED.partner_name, ''), chat_session.partner_name),
                last_message_id = EXCLUDED.last_message_id,
                last_activity = NOW(),
                unread_count = chat_session.unread_count + CASE WHEN $5 THEN 1 ELSE 0 END
            RETURNING *
            "#,
        )
        .bind(auth_code_id)
        .bind(partner_id)
        .bind(partner_name)
        .bind(last_message_id)
        .bind(inbound)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// 将会话标记为已读
    pub async fn mark_read(
        pool: &PgPool,
        auth_code_id: i64,
        partner_id: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE chat_session SET unread_count = 0 WHERE auth_code_id = $1 AND partner_id = $2",
        )
        .bind(auth_code_id)
        .bind(partner_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 列出授权码下的会话,按最后活动时间降序
    pub async fn list_by_auth_code(
        pool: &PgPool,
        auth_code_id: i64,
    ) -> Result<Vec<ChatSession>, StorageError> {
        let sessions = sqlx::query_as::<_, ChatSession>(
            r#"
            SELECT * FROM chat_session
            WHERE auth_code_id = $1
            ORDER BY last_activity DESC
            "#,
        )
        .bind(auth_code_id)
        .fetch_all(pool)
        .await?;
        Ok(sessions)
    }
}
