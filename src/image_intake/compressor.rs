//! # 压缩搜索模块
//!
//! ## 设计思路
//!
//! 在固定的尝试次数内做有界搜索：先降质量（保留构图），质量降到下限后仍超标时
//! 再逐次缩小尺寸（留给超高分辨率相机原图这类顽固情况）。
//!
//! ## 实现思路
//!
//! 1. `q = quality_start`，尺寸为自然尺寸
//! 2. 每次尝试：序号超过 `dimension_shrink_start_attempt` 时按比例缩小宽高
//! 3. 渲染（尺寸不变时复用上一帧）→ 编码 → 探测体积，达标立即返回
//! 4. 未达标则 `q = max(q - step, floor)` 继续
//! 5. 用尽次数时返回最后一个候选，并标记为超预算
//!
//! 引擎本身不决定是否丢弃超预算结果，交给编排层按策略处理。

use super::encoder::{RenderBackend, RenderedFrame};
use super::probe::BudgetProbe;
use super::source::{AcceptedImage, BitmapSurface, EncodedCandidate, ImageOrigin};
use super::validator::normalize_media_type;
use super::{IntakeConfig, IntakeError};

/// 透明像素合成时使用的背景色。
const ALPHA_BACKGROUND: [u8; 3] = [255, 255, 255];

/// 单次尝试的记录。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub quality: f32,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

/// 一次压缩搜索的结果。
#[derive(Debug)]
pub struct CompressionOutcome {
    pub candidate: EncodedCandidate,
    pub within_budget: bool,
    pub trace: Vec<AttemptRecord>,
}

impl CompressionOutcome {
    pub fn attempts(&self) -> u32 {
        self.trace.len() as u32
    }

    /// 转为可交付图片，超预算时带标记。
    pub fn into_accepted(self) -> AcceptedImage {
        let last = self.trace.last().copied();
        let origin = match last {
            Some(record) => ImageOrigin::Compressed {
                attempts: self.trace.len() as u32,
                quality: record.quality,
                width: record.width,
                height: record.height,
            },
            None => ImageOrigin::PassThrough,
        };
        AcceptedImage::compressed(self.candidate, origin, !self.within_budget)
    }
}

/// 有界压缩搜索引擎。
pub struct CompressionEngine<'a> {
    config: &'a IntakeConfig,
    backend: &'a dyn RenderBackend,
}

impl<'a> CompressionEngine<'a> {
    pub fn new(config: &'a IntakeConfig, backend: &'a dyn RenderBackend) -> Self {
        Self { config, backend }
    }

    /// 对表面执行压缩搜索。
    ///
    /// `is_cancelled` 在每次尝试前检查；表面在本调用结束时释放。
    pub fn compress<C>(
        &self,
        mut surface: BitmapSurface,
        source_media_type: &str,
        is_cancelled: C,
    ) -> Result<CompressionOutcome, IntakeError>
    where
        C: Fn() -> bool,
    {
        let output_mime = self.backend.output_format().to_mime_type();
        let source_mime = normalize_media_type(source_media_type).unwrap_or_default();

        if surface.has_alpha() {
            log::warn!(
                "⚠️ 源图 {} 带透明通道，转为 {} 时将合成到白色背景",
                source_mime,
                output_mime
            );
            surface.flatten_alpha(ALPHA_BACKGROUND);
        } else if source_mime != output_mime {
            log::debug!("🔁 格式转换：{} -> {}", source_mime, output_mime);
        }

        let probe = BudgetProbe::new(self.config.byte_ceiling);
        let (mut width, mut height) = (surface.width(), surface.height());
        let mut quality = self.config.quality_start;
        let mut frame: Option<RenderedFrame> = None;
        let mut trace = Vec::with_capacity(self.config.max_attempts as usize);
        let mut last_candidate: Option<EncodedCandidate> = None;

        for attempt in 0..self.config.max_attempts {
            if is_cancelled() {
                return Err(IntakeError::Cancelled);
            }

            if attempt > self.config.dimension_shrink_start_attempt {
                let shrunk = shrink_dimensions(width, height, self.config.dimension_shrink_factor);
                if shrunk != (width, height) {
                    (width, height) = shrunk;
                    frame = None;
                }
            }

            let current = match frame.take() {
                Some(existing) => existing,
                None => self.backend.render(&surface, width, height)?,
            };
            let candidate = self.backend.encode(&current, quality)?;
            frame = Some(current);

            let reading = probe.measure(&candidate);
            trace.push(AttemptRecord {
                attempt,
                quality,
                width,
                height,
                bytes: reading.bytes,
            });

            log::debug!(
                "🔧 压缩尝试 {}/{} - q={:.2} 尺寸: {}x{} 体积: {} 字节（上限 {}）",
                attempt + 1,
                self.config.max_attempts,
                quality,
                width,
                height,
                reading.bytes,
                probe.ceiling()
            );

            if reading.within_budget {
                return Ok(CompressionOutcome {
                    candidate,
                    within_budget: true,
                    trace,
                });
            }

            last_candidate = Some(candidate);
            quality = (quality - self.config.quality_step).max(self.config.quality_floor);
        }

        let candidate = last_candidate
            .ok_or_else(|| IntakeError::Encode("压缩搜索未产生任何候选结果".to_string()))?;

        log::warn!(
            "⚠️ 压缩尝试用尽仍超出预算：{} 字节（上限 {}），返回最佳结果",
            candidate.len(),
            probe.ceiling()
        );

        Ok(CompressionOutcome {
            candidate,
            within_budget: false,
            trace,
        })
    }
}

/// 按比例缩小尺寸，结果至少为 1，且不会放大。
fn shrink_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let scale = |value: u32| -> u32 { ((value as f32 * factor).round() as u32).clamp(1, value.max(1)) };
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_intake::encoder::JpegCanvas;
    use crate::image_intake::test_support::{opaque_surface, SizeModelBackend};
    use image::{ImageFormat, Rgba, RgbaImage};
    use proptest::prelude::*;

    fn qualities(outcome: &CompressionOutcome) -> Vec<f32> {
        outcome.trace.iter().map(|record| record.quality).collect()
    }

    #[test]
    fn first_attempt_within_budget_returns_immediately() {
        let config = IntakeConfig {
            byte_ceiling: 10_000,
            ..IntakeConfig::default()
        };
        let backend = SizeModelBackend::new(1.0);
        let engine = CompressionEngine::new(&config, &backend);

        let outcome = engine
            .compress(opaque_surface(100, 100), "image/jpeg", || false)
            .expect("compress should succeed");

        assert!(outcome.within_budget);
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.candidate.len(), 9_200);
    }

    #[test]
    fn quality_descends_before_dimensions() {
        let config = IntakeConfig {
            byte_ceiling: 6_000,
            ..IntakeConfig::default()
        };
        let backend = SizeModelBackend::new(1.0);
        let engine = CompressionEngine::new(&config, &backend);

        let outcome = engine
            .compress(opaque_surface(100, 100), "image/jpeg", || false)
            .expect("compress should succeed");

        assert!(outcome.within_budget);
        assert_eq!(outcome.attempts(), 5);
        let last = outcome.trace.last().expect("trace should not be empty");
        assert!((last.quality - 0.52).abs() < 1e-4);
        assert_eq!((last.width, last.height), (100, 100));
        assert_eq!(backend.renders.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn dimensions_shrink_only_after_threshold() {
        let config = IntakeConfig {
            byte_ceiling: 2_000,
            ..IntakeConfig::default()
        };
        let backend = SizeModelBackend::new(1.0);
        let engine = CompressionEngine::new(&config, &backend);

        let outcome = engine
            .compress(opaque_surface(100, 100), "image/jpeg", || false)
            .expect("compress should succeed");

        assert!(outcome.within_budget);
        assert_eq!(outcome.attempts(), 9);
        for record in &outcome.trace[..7] {
            assert_eq!((record.width, record.height), (100, 100));
        }
        assert_eq!((outcome.trace[7].width, outcome.trace[7].height), (85, 85));
        assert_eq!((outcome.trace[8].width, outcome.trace[8].height), (72, 72));
        assert!((outcome.trace[8].quality - 0.35).abs() < 1e-6);
    }

    #[test]
    fn exhaustion_returns_last_candidate_flagged() {
        let config = IntakeConfig {
            byte_ceiling: 10,
            ..IntakeConfig::default()
        };
        let backend = SizeModelBackend::new(1.0);
        let engine = CompressionEngine::new(&config, &backend);

        let outcome = engine
            .compress(opaque_surface(100, 100), "image/jpeg", || false)
            .expect("exhaustion is not an error");

        assert!(!outcome.within_budget);
        assert_eq!(outcome.attempts(), 12);
        let last = *outcome.trace.last().expect("trace should not be empty");
        assert_eq!((last.width, last.height), (44, 44));
        assert_eq!(outcome.candidate.len(), last.bytes);

        let accepted = outcome.into_accepted();
        assert!(accepted.is_over_budget());
        assert!(matches!(
            accepted.origin(),
            ImageOrigin::Compressed { attempts: 12, width: 44, height: 44, .. }
        ));
    }

    #[test]
    fn cancellation_stops_before_encoding() {
        let config = IntakeConfig::default();
        let backend = SizeModelBackend::new(1.0);
        let engine = CompressionEngine::new(&config, &backend);

        let result = engine.compress(opaque_surface(10, 10), "image/jpeg", || true);

        assert!(matches!(result, Err(IntakeError::Cancelled)));
        assert_eq!(backend.encode_count(), 0);
    }

    #[test]
    fn encode_failure_is_hard_error() {
        let config = IntakeConfig::default();
        let backend = SizeModelBackend::failing();
        let engine = CompressionEngine::new(&config, &backend);

        let result = engine.compress(opaque_surface(10, 10), "image/jpeg", || false);

        assert!(matches!(result, Err(IntakeError::Encode(_))));
        assert_eq!(backend.encode_count(), 1);
    }

    #[test]
    fn transparent_sources_are_flattened_before_rendering() {
        let config = IntakeConfig::default();
        let backend = SizeModelBackend::new(0.01);
        let engine = CompressionEngine::new(&config, &backend);
        let surface = BitmapSurface {
            pixels: RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])),
            has_alpha: true,
        };

        engine
            .compress(surface, "image/png", || false)
            .expect("compress should succeed");

        assert!(!backend.saw_alpha.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn shrink_never_upscales_or_reaches_zero() {
        assert_eq!(shrink_dimensions(1, 1, 0.85), (1, 1));
        assert_eq!(shrink_dimensions(2, 1, 0.1), (1, 1));
        assert_eq!(shrink_dimensions(4000, 3000, 0.85), (3400, 2550));
    }

    #[test]
    fn jpeg_canvas_search_meets_budget_or_flags() {
        let config = IntakeConfig {
            byte_ceiling: 20_000,
            ..IntakeConfig::default()
        };
        let canvas = JpegCanvas::default();
        let engine = CompressionEngine::new(&config, &canvas);
        let raw = crate::image_intake::source::RawInput::new(
            crate::image_intake::test_support::noisy_png_bytes(256, 256, 7),
            Some("image/png"),
        );
        let surface = crate::image_intake::decoder::decode_surface(&raw, &config).expect("decode should succeed");

        let outcome = engine
            .compress(surface, "image/png", || false)
            .expect("compress should succeed");

        assert_eq!(outcome.candidate.format(), ImageFormat::Jpeg);
        assert!(outcome.attempts() <= 12);
        assert!(outcome.within_budget == (outcome.candidate.len() <= 20_000));
    }

    proptest! {
        #[test]
        fn quality_trace_is_monotonic_and_floored(
            side in 1u32..160,
            ceiling in 1u64..40_000,
            start in 0.5f32..1.0,
            floor in 0.05f32..0.5,
            step in 0.01f32..0.3,
            max_attempts in 1u32..16,
        ) {
            let config = IntakeConfig {
                byte_ceiling: ceiling,
                quality_start: start,
                quality_floor: floor,
                quality_step: step,
                max_attempts,
                ..IntakeConfig::default()
            };
            let backend = SizeModelBackend::new(1.0);
            let engine = CompressionEngine::new(&config, &backend);

            let outcome = engine
                .compress(opaque_surface(side, side), "image/jpeg", || false)
                .expect("compress should succeed");

            let qs = qualities(&outcome);
            prop_assert!(!qs.is_empty());
            prop_assert!(qs.len() as u32 <= max_attempts);
            prop_assert!(qs.windows(2).all(|pair| pair[1] <= pair[0]));
            prop_assert!(qs.iter().all(|q| *q >= floor));
            prop_assert!(outcome.trace.windows(2).all(|pair| pair[1].width <= pair[0].width));
            prop_assert_eq!(outcome.within_budget, outcome.candidate.len() <= ceiling);
        }
    }
}
