//! # 商品图片接收工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              商品发布表单（范围之外的调用方）            │
//! │   选择文件 ── 删除图片 ── 提交商品（images: data URL）   │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Vec<RawInput> / IntakeReport / ImageSlotList
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕              本库 (Rust)                         │
//! │                                                          │
//! │  ┌─ error ──────── AppError (二进制入口的统一错误)        │
//! │  │                                                       │
//! │  └─ image_intake   校验·解码·预算压缩·槽位               │
//! │      ├─ service    槽位唯一所有者 + 批次互斥 + 取消      │
//! │      ├─ handler    批次编排（按输入顺序收集）            │
//! │      └─ compressor 有界压缩搜索                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`image_intake`] | 将用户选择的照片压到体积预算内并维护图片槽位 |

pub mod error;
pub mod image_intake;
