//! # 图片接收模块（image_intake）
//!
//! ## 设计思路
//!
//! 用户在发布商品时选择的照片往往是手机原图，体积远超上传限制。
//! 该模块在客户端侧把每张图压到固定体积预算以内，并维护有上限的图片槽位。
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `validator`：按声明类型拒绝非图片输入
//! - `decoder`：解码为像素表面 + 资源上限
//! - `probe`：测量编码结果是否在预算内
//! - `encoder`：可替换的渲染/编码后端（默认 `fast_image_resize` + JPEG）
//! - `compressor`：有界压缩搜索（先降质量，再缩尺寸）
//! - `slots`：有上限的有序槽位，0 号为封面
//! - `handler`：编排单个批次
//! - `service`：槽位唯一所有者，串行化批次、取消、配置更新
//! - `config/error/source/report`：配置、错误、数据模型、批次报告
//!
//! ## 新同事快速上手
//!
//! ```text
//! 商品表单（选择文件）
//!    ↓
//! service.rs（批次互斥、取消标志）
//!    ↓
//! handler.rs（截断到空闲槽位数，逐文件派发阻塞任务，按输入顺序收集）
//!    ├─ validator.rs（声明类型校验）
//!    ├─ probe.rs（预算内直接原样接收）
//!    ├─ decoder.rs（解码 + 像素/内存上限）
//!    └─ compressor.rs（渲染 → 编码 → 探测 循环，encoder.rs 提供后端）
//!    ↓
//! slots.rs（按输入顺序追加）+ IntakeReport 返回给表单
//! ```

mod compressor;
mod config;
mod decoder;
mod encoder;
mod error;
mod handler;
mod probe;
mod report;
mod service;
mod slots;
mod source;
mod validator;

#[cfg(test)]
mod test_support;

pub use compressor::{AttemptRecord, CompressionEngine, CompressionOutcome};
pub use decoder::decode_surface;
pub use config::{IntakeConfig, OverBudgetPolicy, ResizeFilter};
pub use encoder::{JpegCanvas, RenderBackend, RenderedFrame};
pub use error::IntakeError;
pub use handler::IntakeHandler;
pub use probe::{BudgetProbe, ProbeReading};
pub use report::{IntakeReport, OverBudgetWarning, SkipReason, SkippedInput};
pub use service::IntakeService;
pub use slots::ImageSlotList;
pub use source::{AcceptedImage, BitmapSurface, EncodedCandidate, ImageOrigin, RawInput};
