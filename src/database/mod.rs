/**
 * PostgreSQL数据库模块
 *
 * 连接池管理与表结构初始化。所有实体都是关系表,
 * 审计/日志行随父实体级联删除。
 */

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::config::DatabaseConfig;

/// 数据库连接池
pub type DbPool = Pool<Postgres>;

/// 数据库管理器
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: DbPool,
}

impl DatabaseManager {
    /// 创建新的数据库管理器实例
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "正在连接PostgreSQL数据库: {}",
            config.url.split('@').last().unwrap_or(&config.url)
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        info!(
            "PostgreSQL数据库连接池创建成功，最大连接数: {}",
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// 运行数据库迁移
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        info!("开始运行数据库迁移...");
        self.create_tables_if_not_exists().await?;
        info!("数据库迁移完成");
        Ok(())
    }

    /// 创建表结构（如果不存在）
    async fn create_tables_if_not_exists(&self) -> Result<(), sqlx::Error> {
        // 用户与登录审计
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(150) NOT NULL UNIQUE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS login_log (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                ip_address VARCHAR(45) NOT NULL,
                user_agent TEXT NOT NULL DEFAULT '',
                success BOOLEAN NOT NULL DEFAULT TRUE,
                login_time TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 连接与授权码
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS connection (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name VARCHAR(100) NOT NULL,
                url TEXT NOT NULL,
                connection_type VARCHAR(20) NOT NULL DEFAULT 'WeCharPadPro',
                admin_key VARCHAR(200) NOT NULL DEFAULT '',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (user_id, name)
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_code (
                id BIGSERIAL PRIMARY KEY,
                connection_id BIGINT NOT NULL REFERENCES connection(id) ON DELETE CASCADE,
                code VARCHAR(200) NOT NULL,
                remark TEXT NOT NULL DEFAULT '',
                avatar_url TEXT NOT NULL DEFAULT '',
                nickname VARCHAR(100) NOT NULL DEFAULT '',
                last_query_success BOOLEAN,
                last_query_time TIMESTAMP WITH TIME ZONE,
                is_online BOOLEAN,
                last_status_check_time TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (connection_id, code)
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS connection_log (
                id BIGSERIAL PRIMARY KEY,
                connection_id BIGINT NOT NULL REFERENCES connection(id) ON DELETE CASCADE,
                log_type VARCHAR(20) NOT NULL,
                message TEXT NOT NULL,
                success BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 二维码会话与登录记录
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS qr_code_session (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                connection_id BIGINT NOT NULL REFERENCES connection(id) ON DELETE CASCADE,
                session_type VARCHAR(20) NOT NULL,
                uuid VARCHAR(100) NOT NULL UNIQUE,
                qr_code_url TEXT NOT NULL DEFAULT '',
                qr_base64 TEXT NOT NULL DEFAULT '',
                status VARCHAR(20) NOT NULL DEFAULT 'pending' CHECK (
                    status IN ('pending', 'scanned', 'confirmed', 'success',
                               'failed', 'expired', 'cancelled')
                ),
                wxid VARCHAR(100) NOT NULL DEFAULT '',
                nickname VARCHAR(100) NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wechat_login_record (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                connection_id BIGINT NOT NULL REFERENCES connection(id) ON DELETE CASCADE,
                login_type VARCHAR(20) NOT NULL,
                wxid VARCHAR(100) NOT NULL,
                nickname VARCHAR(100) NOT NULL DEFAULT '',
                success BOOLEAN NOT NULL DEFAULT TRUE,
                error_message TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 聊天镜像
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_message (
                id BIGSERIAL PRIMARY KEY,
                auth_code_id BIGINT NOT NULL REFERENCES auth_code(id) ON DELETE CASCADE,
                message_id VARCHAR(100) NOT NULL,
                from_user VARCHAR(100) NOT NULL,
                to_user VARCHAR(100) NOT NULL,
                content TEXT NOT NULL,
                push_content VARCHAR(200) NOT NULL DEFAULT '',
                message_type VARCHAR(20) NOT NULL DEFAULT 'text',
                is_from_self BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (auth_code_id, message_id)
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_session (
                id BIGSERIAL PRIMARY KEY,
                auth_code_id BIGINT NOT NULL REFERENCES auth_code(id) ON DELETE CASCADE,
                partner_id VARCHAR(100) NOT NULL,
                partner_name VARCHAR(100) NOT NULL DEFAULT '',
                last_message_id BIGINT REFERENCES chat_message(id) ON DELETE SET NULL,
                last_activity TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                unread_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (auth_code_id, partner_id)
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 协议配置单例与维护日志
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS protocol_config (
                id BIGINT PRIMARY KEY,
                service_password VARCHAR(100) NOT NULL DEFAULT '',
                auto_refresh_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                refresh_interval INTEGER NOT NULL DEFAULT 120,
                refresh_wechatx_only BOOLEAN NOT NULL DEFAULT FALSE,
                auto_login_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                auto_login_interval INTEGER NOT NULL DEFAULT 60,
                enable_debug_log BOOLEAN NOT NULL DEFAULT FALSE,
                log_retention_days INTEGER NOT NULL DEFAULT 14,
                last_refresh_time TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS protocol_refresh_log (
                id BIGSERIAL PRIMARY KEY,
                refresh_type VARCHAR(10) NOT NULL,
                connection_count INTEGER NOT NULL DEFAULT 0,
                success_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS protocol_auto_login_log (
                id BIGSERIAL PRIMARY KEY,
                login_type VARCHAR(10) NOT NULL,
                wxid VARCHAR(200) NOT NULL,
                connection_name VARCHAR(100) NOT NULL,
                result VARCHAR(10) NOT NULL CHECK (
                    result IN ('success', 'failed', 'skipped', 'error')
                ),
                message TEXT NOT NULL DEFAULT '',
                response_data JSONB,
                duration DOUBLE PRECISION,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 阅读过检
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS read_check_config (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                protocol_url TEXT NOT NULL,
                wxids JSONB NOT NULL DEFAULT '[]',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                total_checks INTEGER NOT NULL DEFAULT 0,
                success_checks INTEGER NOT NULL DEFAULT 0,
                failed_checks INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (user_id, protocol_url)
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS read_check_log (
                id BIGSERIAL PRIMARY KEY,
                config_id BIGINT NOT NULL REFERENCES read_check_config(id) ON DELETE CASCADE,
                url TEXT NOT NULL,
                wxid VARCHAR(100) NOT NULL,
                read_count_before INTEGER,
                read_count_after INTEGER,
                increased BOOLEAN NOT NULL DEFAULT FALSE,
                success BOOLEAN NOT NULL DEFAULT TRUE,
                error_message TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS read_check_session (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                url TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'running' CHECK (
                    status IN ('running', 'completed', 'failed')
                ),
                result VARCHAR(20) CHECK (
                    result IS NULL OR result IN ('increased', 'no_change', 'error')
                ),
                total_accounts INTEGER NOT NULL DEFAULT 0,
                successful_accounts INTEGER NOT NULL DEFAULT 0,
                failed_accounts INTEGER NOT NULL DEFAULT 0,
                initial_read_count INTEGER,
                final_read_count INTEGER,
                increased_count INTEGER NOT NULL DEFAULT 0,
                started_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                completed_at TIMESTAMP WITH TIME ZONE
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS read_check_process_log (
                id BIGSERIAL PRIMARY KEY,
                session_id BIGINT NOT NULL REFERENCES read_check_session(id) ON DELETE CASCADE,
                log_type VARCHAR(20) NOT NULL,
                message TEXT NOT NULL,
                wxid VARCHAR(100) NOT NULL DEFAULT '',
                protocol_url TEXT NOT NULL DEFAULT '',
                read_count INTEGER,
                previous_read_count INTEGER,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 外部API凭证与审计
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_key (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name VARCHAR(100) NOT NULL,
                key VARCHAR(64) NOT NULL UNIQUE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                permissions JSONB NOT NULL DEFAULT '[]',
                last_used_at TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_request (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
                request_type VARCHAR(20) NOT NULL,
                wxid VARCHAR(100) NOT NULL DEFAULT '',
                appid VARCHAR(100) NOT NULL DEFAULT '',
                request_data JSONB NOT NULL DEFAULT '{}',
                response_data JSONB NOT NULL DEFAULT '{}',
                success BOOLEAN NOT NULL DEFAULT TRUE,
                error_message TEXT NOT NULL DEFAULT '',
                ip_address VARCHAR(45) NOT NULL,
                user_agent TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        // 创建索引
        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_auth_code_connection ON auth_code(connection_id)",
            "CREATE INDEX IF NOT EXISTS idx_connection_log_created ON connection_log(connection_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_qr_session_status ON qr_code_session(status)",
            "CREATE INDEX IF NOT EXISTS idx_chat_message_code_created ON chat_message(auth_code_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_chat_message_users ON chat_message(from_user, to_user)",
            "CREATE INDEX IF NOT EXISTS idx_chat_session_activity ON chat_session(auth_code_id, last_activity DESC)",
            "CREATE INDEX IF NOT EXISTS idx_refresh_log_created ON protocol_refresh_log(created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_auto_login_log_created ON protocol_auto_login_log(created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_process_log_session ON read_check_process_log(session_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_api_request_created ON api_request(created_at DESC)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(self.pool()).await?;
        }

        info!("数据库表结构创建完成");
        Ok(())
    }

    /// 测试数据库连接
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        let result: i64 = sqlx::query_scalar("SELECT 1").fetch_one(self.pool()).await?;

        if result == 1 {
            info!("数据库连接健康检查通过");
            Ok(())
        } else {
            Err(sqlx::Error::RowNotFound)
        }
    }

    /// 关闭数据库连接池
    pub async fn close(&self) {
        info!("正在关闭数据库连接池...");
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}
