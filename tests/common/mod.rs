//! 集成测试公共工具
//!
//! 在环回地址上起一个极简HTTP服务,模拟协议服务器。
//! 只解析请求行与头部,按路径返回预置响应,足够驱动
//! reqwest客户端走完真实的网络路径。

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// 读取HTTP请求直到头部结束,返回请求行中的路径
async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buf.len() > 64 * 1024 {
            break;
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let request_line = text.lines().next()?;
    let path = request_line.split_whitespace().nth(1)?;
    // 丢弃query部分,路由只看路径
    Some(path.split('?').next().unwrap_or(path).to_string())
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} MOCK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// 起一个对任何请求都返回固定状态码的服务,返回base_url
pub async fn spawn_status_server(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("测试端口绑定失败");
    let addr = listener.local_addr().expect("获取监听地址失败");

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request_path(&mut stream).await;
                write_response(&mut stream, status, "{}").await;
            });
        }
    });

    format!("http://{}", addr)
}

/// 起一个按路径返回预置JSON的服务,未命中的路径返回404
pub async fn spawn_json_server(routes: &'static [(&'static str, &'static str)]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("测试端口绑定失败");
    let addr = listener.local_addr().expect("获取监听地址失败");

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let path = read_request_path(&mut stream).await.unwrap_or_default();
                match routes.iter().find(|(p, _)| *p == path) {
                    Some((_, body)) => write_response(&mut stream, 200, body).await,
                    None => write_response(&mut stream, 404, r#"{"Code":404}"#).await,
                }
            });
        }
    });

    format!("http://{}", addr)
}

/// 起一个只接受连接、永不响应的服务,用于验证客户端超时
pub async fn spawn_silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("测试端口绑定失败");
    let addr = listener.local_addr().expect("获取监听地址失败");

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            // 持有连接不回复,让客户端自己超时
            held.push(stream);
        }
    });

    format!("http://{}", addr)
}

/// 返回一个刚刚释放的本地地址,连接它必然被拒绝
pub async fn refused_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("测试端口绑定失败");
    let addr = listener.local_addr().expect("获取监听地址失败");
    drop(listener);
    format!("http://{}", addr)
}
