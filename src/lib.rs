//! 微信协议账号后台管理服务
//!
//! 核心能力:
//! - 连接管理: 对接第三方协议服务(WeCharPadPro/wechatx),健康探测
//! - 授权码管理: wxid注册、在线状态追踪、备注编码
//! - 扫码登录: 二维码会话状态机与登录记录
//! - 聊天镜像: 从协议服务拉取消息,维护会话与未读数
//! - 定时维护: 自动刷新、自动登录、日志清理(可取消的后台任务)
//! - 阅读检测: 轮换wxid探测文章阅读量变化

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use config::AppConfig;
pub use state::AppState;
