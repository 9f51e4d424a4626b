//! 连接健康探测契约测试
//!
//! 在环回地址上模拟各类协议服务器,验证 test_connection 的
//! 按类型判定表:
//! - WeCharPadPro: 仅健康端点200算成功
//! - wechatx系: 任何可达响应都算成功,包括错误状态码
//! - 未知类型: 非5xx算成功
//! - 超时/拒绝连接/任何异常: 一律false,不向外抛错

mod common;

use chrono::Utc;
use wechat_admin::models::Connection;
use wechat_admin::services::ProtocolClient;

fn connection(url: &str, connection_type: &str) -> Connection {
    let now = Utc::now();
    Connection {
        id: 1,
        user_id: 1,
        name: "探测测试".to_string(),
        url: url.to_string(),
        connection_type: connection_type.to_string(),
        admin_key: String::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_wecharpadpro_health_200_is_connected() {
    let base = common::spawn_status_server(200).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    assert!(client.test_connection(&connection(&base, "WeCharPadPro")).await);
}

#[tokio::test]
async fn test_wecharpadpro_non_200_is_failure() {
    let client = ProtocolClient::new().expect("客户端初始化失败");

    for status in [301, 404, 500] {
        let base = common::spawn_status_server(status).await;
        assert!(
            !client.test_connection(&connection(&base, "WeCharPadPro")).await,
            "健康端点返回{}不应算成功",
            status
        );
    }
}

#[tokio::test]
async fn test_wechatx_error_statuses_count_as_connected() {
    let client = ProtocolClient::new().expect("客户端初始化失败");

    // 能连上服务器就算成功,即使对端返回错误
    for status in [200, 400, 401, 403, 500] {
        let base = common::spawn_status_server(status).await;
        for connection_type in ["wechatx", "wechatx-861"] {
            assert!(
                client.test_connection(&connection(&base, connection_type)).await,
                "{} 返回{}应算可达",
                connection_type,
                status
            );
        }
    }
}

#[tokio::test]
async fn test_wechatx_unexpected_status_is_failure() {
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let base = common::spawn_status_server(302).await;
    assert!(!client.test_connection(&connection(&base, "wechatx")).await);
}

#[tokio::test]
async fn test_unknown_type_root_probe() {
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let base = common::spawn_status_server(404).await;
    assert!(client.test_connection(&connection(&base, "unknown-protocol")).await);

    let base = common::spawn_status_server(503).await;
    assert!(!client.test_connection(&connection(&base, "unknown-protocol")).await);
}

#[tokio::test]
async fn test_connection_refused_is_failure() {
    let client = ProtocolClient::new().expect("客户端初始化失败");
    let base = common::refused_addr().await;

    assert!(!client.test_connection(&connection(&base, "WeCharPadPro")).await);
    assert!(!client.test_connection(&connection(&base, "wechatx")).await);
}

#[tokio::test]
async fn test_timeout_is_failure() {
    // 对端收下连接但永不回复,5秒超时后判失败
    let client = ProtocolClient::new().expect("客户端初始化失败");
    let base = common::spawn_silent_server().await;

    assert!(!client.test_connection(&connection(&base, "WeCharPadPro")).await);
}
