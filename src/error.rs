//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，命令行入口的所有失败路径都汇总到这里。
//! 图片链路内部使用更细的 `IntakeError`，通过 `From` 自动上转。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 实现 `Serialize` 将错误序列化为字符串，便于以 JSON 输出给调用方。

use serde::Serialize;

use crate::image_intake::IntakeError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片接收流水线错误（校验 / 解码 / 压缩 / 槽位）
    #[error("{0}")]
    Intake(#[from] IntakeError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 结果序列化错误
    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 命令行参数或配置文件错误
    #[error("参数错误: {0}")]
    Usage(String),
}

impl AppError {
    /// 面向终端的单行描述；图片链路错误带上错误码与阶段。
    pub fn describe(&self) -> String {
        match self {
            Self::Intake(err) => err.describe(),
            other => other.to_string(),
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
