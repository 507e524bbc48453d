//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图片接收链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 注意：超出体积预算不是错误，而是压缩结果上的标记，由编排层按策略处理。

/// 图片接收链路统一错误类型。
///
/// 单个文件的错误只影响该文件；批次级错误（并发批次、取消、配置）才会返回给调用方。
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("不是图片：{0}")]
    NotAnImage(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("图片数量已达上限：最多 {max} 张")]
    SlotLimitReached { max: usize },

    #[error("已有图片批次正在处理中")]
    BatchInProgress,

    #[error("图片处理已取消")]
    Cancelled,

    #[error("配置无效：{0}")]
    InvalidConfig(String),
}

impl IntakeError {
    /// 稳定错误码，供前端或日志检索使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnImage(_) => "E_NOT_IMAGE",
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::SlotLimitReached { .. } => "E_SLOT_LIMIT",
            Self::BatchInProgress => "E_BATCH_IN_PROGRESS",
            Self::Cancelled => "E_CANCELLED",
            Self::InvalidConfig(_) => "E_INVALID_CONFIG",
        }
    }

    /// 出错阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NotAnImage(_) => "validate",
            Self::Decode(_) | Self::ResourceLimit(_) => "decode",
            Self::Encode(_) => "encode",
            Self::SlotLimitReached { .. } => "slots",
            Self::BatchInProgress | Self::Cancelled => "batch",
            Self::InvalidConfig(_) => "config",
        }
    }

    /// 带错误码与阶段的单行描述，用于跳过明细与命令行输出。
    pub fn describe(&self) -> String {
        format!("[{}@{}] {}", self.code(), self.stage(), self)
    }
}
