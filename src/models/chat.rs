use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 聊天消息记录
///
/// 从协议服务同步的消息镜像。
/// 约束: (auth_code_id, message_id) 唯一,重复同步幂等;
/// 列表读取按 created_at 升序。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,

    /// 所属授权码
    pub auth_code_id: i64,

    /// 消息ID,协议返回的NewMsgId
    pub message_id: String,

    /// 发送者 (FromUserName)
    pub from_user: String,

    /// 接收者 (ToUserName)
    pub to_user: String,

    /// 消息内容
    pub content: String,

    /// 推送内容,发送者昵称等
    pub push_content: String,

    /// 消息类型: text, image, file等
    pub message_type: String,

    /// 是否为自己发送
    pub is_from_self: bool,

    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// 获取聊天对象
    ///
    /// 自己发送的消息对象是接收者,否则是发送者
    pub fn chat_partner(&self) -> &str {
        if self.is_from_self {
            &self.to_user
        } else {
            &self.from_user
        }
    }

    /// 显示名称
    pub fn display_name(&self) -> &str {
        if self.is_from_self {
            "我"
        } else if !self.push_content.is_empty() {
            &self.push_content
        } else {
            &self.from_user
        }
    }
}

/// 聊天会话
///
/// 按聊天对象聚合的会话线程。
/// 约束: (auth_code_id, partner_id) 唯一;
/// last_message_id 为可空回引,消息删除时置空而非级联。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub auth_code_id: i64,

    /// 聊天对象ID
    pub partner_id: String,

    /// 聊天对象名称
    pub partner_name: String,

    /// 最后一条消息
    pub last_message_id: Option<i64>,

    /// 最后活动时间
    pub last_activity: DateTime<Utc>,

    /// 未读消息数
    pub unread_count: i32,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(is_from_self: bool, push_content: &str) -> ChatMessage {
        ChatMessage {
            id: 1,
            auth_code_id: 1,
            message_id: "10001".to_string(),
            from_user: "wxid_friend".to_string(),
            to_user: "wxid_self".to_string(),
            content: "你好".to_string(),
            push_content: push_content.to_string(),
            message_type: "text".to_string(),
            is_from_self,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_chat_partner() {
        // 收到的消息: 对象是发送者
        assert_eq!(message(false, "").chat_partner(), "wxid_friend");
        // 发出的消息: 对象是接收者
        assert_eq!(message(true, "").chat_partner(), "wxid_self");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(message(true, "").display_name(), "我");
        assert_eq!(message(false, "老张 : 你好").display_name(), "老张 : 你好");
        assert_eq!(message(false, "").display_name(), "wxid_friend");
    }
}
