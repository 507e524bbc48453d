//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `IntakeHandler` 只负责流程编排与配置管理，不持有槽位列表。
//! 每个文件的处理链路固定为：
//! 1. 校验声明类型
//! 2. 已在预算内：原样接收，不解码、不编码
//! 3. 超出预算：解码 → 压缩搜索 → 按策略接收或跳过
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<IntakeConfig>>` 支持运行时更新。
//! - 单个批次使用“同一配置快照”，避免处理中途配置漂移。
//! - 每个文件在独立的阻塞任务上处理，按输入顺序 await，结果顺序与完成顺序无关。
//! - 所有结果收齐后才统一追加到槽位，取消时不追加任何图片。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::compressor::CompressionEngine;
use super::decoder::decode_surface;
use super::encoder::{JpegCanvas, RenderBackend};
use super::probe::BudgetProbe;
use super::report::{IntakeReport, OverBudgetWarning, SkipReason};
use super::slots::ImageSlotList;
use super::source::{AcceptedImage, RawInput};
use super::validator::validate_input;
use super::{IntakeConfig, IntakeError, OverBudgetPolicy};

/// 单个文件的处理结果。
enum FileOutcome {
    Accepted(AcceptedImage),
    Skipped(SkipReason, String),
    Cancelled,
}

/// 图片接收编排器。
pub struct IntakeHandler {
    config: Arc<RwLock<IntakeConfig>>,
    backend: Option<Arc<dyn RenderBackend>>,
}

impl IntakeHandler {
    /// 使用默认 JPEG 后端创建编排器。
    pub fn new(config: IntakeConfig) -> Result<Self, IntakeError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            backend: None,
        })
    }

    /// 使用自定义渲染/编码后端创建编排器。
    pub fn with_backend(config: IntakeConfig, backend: Arc<dyn RenderBackend>) -> Result<Self, IntakeError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            backend: Some(backend),
        })
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<IntakeConfig, IntakeError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| IntakeError::InvalidConfig("配置读取锁已中毒".to_string()))
    }

    /// 校验并替换配置，下一个批次生效。
    pub fn update_config(&self, config: IntakeConfig) -> Result<(), IntakeError> {
        config.validate()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| IntakeError::InvalidConfig("配置写入锁已中毒".to_string()))?;
        *current = config;

        log::info!(
            "⚙️ 已更新图片接收配置（max_images={}, ceiling={}, attempts={}, policy={:?}）",
            current.max_images,
            current.byte_ceiling,
            current.max_attempts,
            current.over_budget_policy
        );

        Ok(())
    }

    fn backend_for(&self, config: &IntakeConfig) -> Arc<dyn RenderBackend> {
        match &self.backend {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(JpegCanvas::new(config.resize_filter)),
        }
    }

    /// 处理一次选择中的全部文件，并把接收的图片按输入顺序追加到 `slots`。
    ///
    /// 超出空闲槽位的文件不处理，计入 `truncated`。
    /// 取消时返回 `Cancelled`，`slots` 保持不变。
    pub async fn process_batch(
        &self,
        inputs: Vec<RawInput>,
        slots: &mut ImageSlotList,
        cancel: &Arc<AtomicBool>,
    ) -> Result<IntakeReport, IntakeError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let total = inputs.len();
        let free = slots.free_slots();
        let truncated = total.saturating_sub(free);
        if truncated > 0 {
            log::warn!(
                "⚠️ 最多 {} 张图片，本次选择 {} 张，仅处理前 {} 张",
                slots.max_images(),
                total,
                free
            );
        }

        let backend = self.backend_for(&config);
        let mut tasks = Vec::with_capacity(total.min(free));
        for (index, raw) in inputs.into_iter().take(free).enumerate() {
            let config = config.clone();
            let backend = Arc::clone(&backend);
            let cancel = Arc::clone(cancel);
            tasks.push((
                index,
                tokio::task::spawn_blocking(move || process_file(index, raw, &config, backend.as_ref(), &cancel)),
            ));
        }

        let mut report = IntakeReport {
            truncated,
            ..IntakeReport::default()
        };
        let mut accepted = Vec::with_capacity(tasks.len());
        let mut cancelled = false;

        for (index, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => FileOutcome::Skipped(SkipReason::CompressFailed, format!("处理任务异常：{}", err)),
            };

            match outcome {
                FileOutcome::Accepted(image) => {
                    if image.is_over_budget() {
                        report.warnings.push(OverBudgetWarning {
                            index,
                            bytes: image.byte_len(),
                            ceiling: config.byte_ceiling,
                        });
                    }
                    accepted.push(image);
                }
                FileOutcome::Skipped(reason, detail) => report.skip(index, reason, detail),
                FileOutcome::Cancelled => cancelled = true,
            }
        }

        if cancelled || cancel.load(Ordering::SeqCst) {
            log::info!("🛑 图片批次已取消，槽位保持不变");
            return Err(IntakeError::Cancelled);
        }

        for image in accepted {
            slots.append(image)?;
            report.accepted += 1;
        }

        log::info!(
            "✅ 图片批次处理完成 - accepted={} skipped={} truncated={} warnings={} total={}ms",
            report.accepted,
            report.skipped.len(),
            report.truncated,
            report.warnings.len(),
            total_start.elapsed().as_millis()
        );

        Ok(report)
    }
}

/// 处理单个文件：校验 → 直通 / 解码 + 压缩。
fn process_file(
    index: usize,
    raw: RawInput,
    config: &IntakeConfig,
    backend: &dyn RenderBackend,
    cancel: &AtomicBool,
) -> FileOutcome {
    if cancel.load(Ordering::SeqCst) {
        return FileOutcome::Cancelled;
    }

    let label = raw.label(index);
    if let Err(err) = validate_input(&raw) {
        log::warn!("🚫 {} 不是图片，跳过：{}", label, err);
        return FileOutcome::Skipped(SkipReason::NotAnImage, err.describe());
    }

    let reading = BudgetProbe::new(config.byte_ceiling).measure_len(raw.len());
    if reading.within_budget {
        log::debug!("📎 {} 已在预算内（{} 字节），原样接收", label, reading.bytes);
        return FileOutcome::Accepted(AcceptedImage::pass_through(raw));
    }

    log::info!(
        "⚙️ {} 超出预算：{:.2} MB（上限 {:.2} MB），开始压缩",
        label,
        reading.bytes as f64 / 1024.0 / 1024.0,
        config.byte_ceiling as f64 / 1024.0 / 1024.0
    );

    let media_type = raw.media_type().unwrap_or_default().to_string();

    let decode_start = Instant::now();
    let surface = match decode_surface(&raw, config) {
        Ok(surface) => surface,
        Err(err) => {
            log::warn!("❌ {} 解码失败，跳过：{}", label, err);
            return FileOutcome::Skipped(SkipReason::CompressFailed, err.describe());
        }
    };
    let decode_elapsed = decode_start.elapsed();
    drop(raw);

    let compress_start = Instant::now();
    let engine = CompressionEngine::new(config, backend);
    let outcome = match engine.compress(surface, &media_type, || cancel.load(Ordering::SeqCst)) {
        Ok(outcome) => outcome,
        Err(IntakeError::Cancelled) => return FileOutcome::Cancelled,
        Err(err) => {
            log::warn!("❌ {} 压缩失败，跳过：{}", label, err);
            return FileOutcome::Skipped(SkipReason::CompressFailed, err.describe());
        }
    };

    log::info!(
        "✅ {} 压缩完成 - attempts={} bytes={} within_budget={} decode={}ms compress={}ms",
        label,
        outcome.attempts(),
        outcome.candidate.len(),
        outcome.within_budget,
        decode_elapsed.as_millis(),
        compress_start.elapsed().as_millis()
    );

    if outcome.within_budget {
        return FileOutcome::Accepted(outcome.into_accepted());
    }

    match config.over_budget_policy {
        OverBudgetPolicy::AcceptWithWarning => FileOutcome::Accepted(outcome.into_accepted()),
        OverBudgetPolicy::Reject => FileOutcome::Skipped(
            SkipReason::OverBudget,
            format!(
                "压缩 {} 次后仍为 {} 字节（上限 {}）",
                outcome.attempts(),
                outcome.candidate.len(),
                config.byte_ceiling
            ),
        ),
    }
}
