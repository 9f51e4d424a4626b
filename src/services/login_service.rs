use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    AppError, ConnectionLogType, LoginType, QrCodeSession, QrSessionStatus, SessionType,
    StorageError,
};
use crate::services::protocol_client::ProtocolClient;
use crate::storage::{
    AuthCodeQueries, ConnectionLogQueries, ConnectionQueries, LoginRecordQueries, QrSessionQueries,
};

/// 扫码登录服务
///
/// 管理二维码会话的完整生命周期: 签发 -> 轮询 -> 终态。
///
/// 软过期约定: 本服务不会因为时间到了就改写存储状态,
/// `is_expired` 是调用方读取时的派生判断。只有协议服务明确
/// 返回"已过期"时才落库为 expired。
pub struct LoginService {
    pool: PgPool,
    protocol: Arc<ProtocolClient>,
}

impl LoginService {
    pub fn new(pool: PgPool, protocol: Arc<ProtocolClient>) -> Self {
        Self { pool, protocol }
    }

    /// 发起扫码登录会话
    ///
    /// 调用协议服务签发二维码,以pending状态落库。
    /// 协议未返回有效期时按240秒计算。
    pub async fn start_session(
        &self,
        user_id: i64,
        connection_id: i64,
        session_type: SessionType,
    ) -> Result<QrCodeSession, AppError> {
        let conn = ConnectionQueries::get_by_id(&self.pool, connection_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("连接 {} 不存在", connection_id)))?;

        let issue = match self.protocol.issue_qr(&conn).await {
            Ok(issue) => issue,
            Err(e) => {
                ConnectionLogQueries::append(
                    &self.pool,
                    conn.id,
                    ConnectionLogType::Error,
                    &format!("二维码签发失败: {}", e),
                    false,
                )
                .await?;
                return Err(e.into());
            }
        };

        // 协议返回的Uuid可能跨服务器重复,本地再加一层UUID保证全局唯一
        let uuid = if issue.uuid.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}-{}", issue.uuid, Uuid::new_v4().simple())
        };

        let expires_at = Utc::now() + Duration::seconds(issue.expires_in);

        let session = QrSessionQueries::create(
            &self.pool,
            user_id,
            connection_id,
            session_type,
            &uuid,
            &issue.qr_code_url,
            &issue.qr_base64,
            expires_at,
        )
        .await?;

        ConnectionLogQueries::append(
            &self.pool,
            conn.id,
            ConnectionLogType::Login,
            &format!("签发登录二维码, 会话 {}", session.uuid),
            true,
        )
        .await?;

        tracing::info!(
            uuid = %session.uuid,
            connection = %conn.name,
            session_type = %session.session_type,
            expires_in = issue.expires_in,
            "扫码登录会话已创建"
        );

        Ok(session)
    }

    /// 轮询会话状态
    ///
    /// 向协议服务查询一次并无条件落库。终态会话直接返回;
    /// 已过期但状态仍为非终态的会话跳过协议调用,原样返回,
    /// 由调用方检查 `is_expired`。
    pub async fn poll_session(&self, uuid: &str) -> Result<QrCodeSession, AppError> {
        let session = QrSessionQueries::get_by_uuid(&self.pool, uuid)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("会话 {} 不存在", uuid)))?;

        if session.is_terminal() {
            return Ok(session);
        }

        if session.is_expired() {
            tracing::debug!(uuid = %uuid, status = %session.status, "会话已过期,跳过轮询");
            return Ok(session);
        }

        let conn = ConnectionQueries::get_by_id(&self.pool, session.connection_id)
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!("连接 {} 不存在", session.connection_id))
            })?;

        // 协议服务的Uuid是本地uuid去掉追加后缀的部分
        let protocol_uuid = session.uuid.rsplit_once('-').map_or(uuid, |(head, _)| head);

        let poll = self.protocol.check_qr(&conn, protocol_uuid).await?;

        let updated = QrSessionQueries::update_status(
            &self.pool,
            uuid,
            poll.status,
            poll.wxid.as_deref(),
            poll.nickname.as_deref(),
        )
        .await?;

        match poll.status {
            QrSessionStatus::Success => {
                self.register_login(&updated, poll.avatar_url.as_deref(), &conn.name)
                    .await?;
            }
            QrSessionStatus::Failed | QrSessionStatus::Expired | QrSessionStatus::Cancelled => {
                LoginRecordQueries::append(
                    &self.pool,
                    updated.user_id,
                    updated.connection_id,
                    session_login_type(&updated),
                    &updated.wxid,
                    &updated.nickname,
                    false,
                    &format!("登录未完成: {}", updated.status),
                )
                .await?;
            }
            _ => {}
        }

        Ok(updated)
    }

    /// 取消会话
    ///
    /// 无条件置为cancelled,即使会话已处于其他终态
    pub async fn cancel_session(&self, uuid: &str) -> Result<QrCodeSession, AppError> {
        let session =
            QrSessionQueries::update_status(&self.pool, uuid, QrSessionStatus::Cancelled, None, None)
                .await?;

        tracing::info!(uuid = %uuid, "扫码登录会话已取消");
        Ok(session)
    }

    /// 登录成功后的登记
    ///
    /// 注册/回填授权码,更新在线状态,落登录记录与连接日志
    async fn register_login(
        &self,
        session: &QrCodeSession,
        avatar_url: Option<&str>,
        connection_name: &str,
    ) -> Result<(), AppError> {
        let auth_code = match AuthCodeQueries::get_by_code(
            &self.pool,
            session.connection_id,
            &session.wxid,
        )
        .await?
        {
            Some(code) => code,
            None => {
                AuthCodeQueries::create(&self.pool, session.connection_id, &session.wxid, "")
                    .await?
            }
        };

        AuthCodeQueries::update_profile(
            &self.pool,
            auth_code.id,
            &session.nickname,
            avatar_url.unwrap_or(""),
        )
        .await?;
        AuthCodeQueries::update_online_status(&self.pool, auth_code.id, Some(true)).await?;

        LoginRecordQueries::append(
            &self.pool,
            session.user_id,
            session.connection_id,
            session_login_type(session),
            &session.wxid,
            &session.nickname,
            true,
            "",
        )
        .await?;

        ConnectionLogQueries::append(
            &self.pool,
            session.connection_id,
            ConnectionLogType::Login,
            &format!("{} 扫码登录成功", session.wxid),
            true,
        )
        .await?;

        tracing::info!(
            uuid = %session.uuid,
            wxid = %session.wxid,
            connection = %connection_name,
            "扫码登录成功,授权码已登记"
        );

        Ok(())
    }
}

/// 会话类型映射为登录记录类型,损坏数据按ipad处理
fn session_login_type(session: &QrCodeSession) -> LoginType {
    SessionType::parse(&session.session_type)
        .map(LoginType::from)
        .unwrap_or(LoginType::Ipad)
}
