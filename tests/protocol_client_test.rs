//! 协议客户端契约测试
//!
//! 模拟wechatx风格的协议服务器,验证各端点的请求/响应解析
//! 与状态映射。

mod common;

use chrono::Utc;
use wechat_admin::models::{AutoLoginResult, Connection, QrSessionStatus};
use wechat_admin::services::ProtocolClient;

const ROUTES: &[(&str, &str)] = &[
    (
        "/api/Login/GetQR",
        r#"{"Code":200,"Data":{"Uuid":"mock-qr-1","QrUrl":"http://qr.example/1","QrBase64":"ZmFrZQ==","ExpiredTime":180},"Text":""}"#,
    ),
    (
        "/api/Login/CheckQR",
        r#"{"Code":200,"Data":{"Status":1},"Text":""}"#,
    ),
    (
        "/api/Login/TwiceAutoAuth",
        r#"{"Code":300,"Text":"需要扫码"}"#,
    ),
    (
        "/api/Login/GetLoginStatus",
        r#"{"Code":200,"Data":{"Online":true},"Text":""}"#,
    ),
    (
        "/api/Article/ReadNum",
        r#"{"Code":200,"Data":{"ReadNum":42},"Text":""}"#,
    ),
    (
        "/api/Msg/Sync",
        r#"{"Code":200,"Data":{"AddMsgs":[
            {"NewMsgId":900001,"FromUserName":"wxid_friend","ToUserName":"wxid_self","Content":"你好","PushContent":"老张 : 你好","MsgType":1},
            {"NewMsgId":900002,"FromUserName":"wxid_self","ToUserName":"wxid_friend","Content":"[图片]","PushContent":"","MsgType":3}
        ]},"Text":""}"#,
    ),
];

fn wechatx_connection(url: &str) -> Connection {
    let now = Utc::now();
    Connection {
        id: 1,
        user_id: 1,
        name: "契约测试".to_string(),
        url: url.to_string(),
        connection_type: "wechatx".to_string(),
        admin_key: String::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_issue_qr_parses_envelope() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let issue = client
        .issue_qr(&wechatx_connection(&base))
        .await
        .expect("二维码签发应成功");

    assert_eq!(issue.uuid, "mock-qr-1");
    assert_eq!(issue.qr_code_url, "http://qr.example/1");
    assert_eq!(issue.qr_base64, "ZmFrZQ==");
    assert_eq!(issue.expires_in, 180);
}

#[tokio::test]
async fn test_check_qr_maps_status() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let poll = client
        .check_qr(&wechatx_connection(&base), "mock-qr-1")
        .await
        .expect("状态检查应成功");

    assert_eq!(poll.status, QrSessionStatus::Scanned);
    assert!(poll.wxid.is_none());
}

#[tokio::test]
async fn test_auto_login_code_300_is_skipped() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let attempt = client
        .auto_login(&wechatx_connection(&base), "wxid_offline")
        .await
        .expect("自动登录调用应成功");

    assert_eq!(attempt.result, AutoLoginResult::Skipped);
    assert!(attempt.response.is_some());
}

#[tokio::test]
async fn test_query_online() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let online = client
        .query_online(&wechatx_connection(&base), "wxid_a")
        .await
        .expect("在线状态查询应成功");

    assert!(online);
}

#[tokio::test]
async fn test_fetch_read_count() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let count = client
        .fetch_read_count(&base, "https://mp.weixin.qq.com/s/abc")
        .await
        .expect("阅读量查询应成功");

    assert_eq!(count, 42);
}

#[tokio::test]
async fn test_sync_messages() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    let messages = client
        .sync_messages(&wechatx_connection(&base), "wxid_self")
        .await
        .expect("消息同步应成功");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].new_msg_id, 900001);
    assert_eq!(messages[0].message_type(), "text");
    assert_eq!(messages[1].message_type(), "image");
}

#[tokio::test]
async fn test_unknown_route_is_error() {
    let base = common::spawn_json_server(ROUTES).await;
    let client = ProtocolClient::new().expect("客户端初始化失败");

    // 未配置的路径返回 {"Code":404},应报业务错误而非panic
    let result = client
        .read_article(&format!("{}/missing", base), "wxid_a", "https://mp.weixin.qq.com/s/abc")
        .await;
    assert!(result.is_err());
}
