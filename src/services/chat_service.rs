use std::sync::Arc;

use sqlx::PgPool;

use crate::models::{AppError, ChatMessage, ChatSession, StorageError};
use crate::services::protocol_client::ProtocolClient;
use crate::storage::{AuthCodeQueries, ChatMessageQueries, ChatSessionQueries, ConnectionQueries};

/// 聊天镜像服务
///
/// 从协议服务拉取消息,维护本地的消息与会话镜像。
/// 同一条消息 (NewMsgId) 重复同步是幂等的。
pub struct ChatService {
    pool: PgPool,
    protocol: Arc<ProtocolClient>,
}

impl ChatService {
    pub fn new(pool: PgPool, protocol: Arc<ProtocolClient>) -> Self {
        Self { pool, protocol }
    }

    /// 同步授权码的新消息
    ///
    /// 返回本次新入库的消息数。已存在的消息静默跳过,
    /// 收到的消息会累加对应会话的未读数。
    pub async fn sync_messages(&self, auth_code_id: i64) -> Result<usize, AppError> {
        let auth_code = AuthCodeQueries::get_by_id(&self.pool, auth_code_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("授权码 {} 不存在", auth_code_id)))?;

        let conn = ConnectionQueries::get_by_id(&self.pool, auth_code.connection_id)
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!("连接 {} 不存在", auth_code.connection_id))
            })?;

        let wire_messages = self.protocol.sync_messages(&conn, &auth_code.code).await?;
        let total = wire_messages.len();
        let mut inserted = 0usize;

        for wire in wire_messages {
            let is_from_self = wire.from_user_name == auth_code.code;

            let message = ChatMessageQueries::insert(
                &self.pool,
                auth_code.id,
                &wire.new_msg_id.to_string(),
                &wire.from_user_name,
                &wire.to_user_name,
                &wire.content,
                &wire.push_content,
                wire.message_type(),
                is_from_self,
            )
            .await?;

            // None表示重复消息,会话状态不动
            if let Some(message) = message {
                ChatSessionQueries::upsert_on_message(
                    &self.pool,
                    auth_code.id,
                    message.chat_partner(),
                    "",
                    message.id,
                    !is_from_self,
                )
                .await?;
                inserted += 1;
            }
        }

        tracing::info!(
            wxid = %auth_code.code,
            received = total,
            inserted = inserted,
            "消息同步完成"
        );

        Ok(inserted)
    }

    /// 列出与某聊天对象的消息,按时间升序
    pub async fn list_messages(
        &self,
        auth_code_id: i64,
        partner_id: &str,
    ) -> Result<Vec<ChatMessage>, AppError> {
        Ok(ChatMessageQueries::list_by_partner(&self.pool, auth_code_id, partner_id).await?)
    }

    /// 列出授权码的会话,按最后活动降序
    pub async fn list_sessions(&self, auth_code_id: i64) -> Result<Vec<ChatSession>, AppError> {
        Ok(ChatSessionQueries::list_by_auth_code(&self.pool, auth_code_id).await?)
    }

    /// 将会话标记为已读
    pub async fn mark_session_read(
        &self,
        auth_code_id: i64,
        partner_id: &str,
    ) -> Result<(), AppError> {
        ChatSessionQueries::mark_read(&self.pool, auth_code_id, partner_id).await?;
        Ok(())
    }
}
