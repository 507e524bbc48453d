//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `IntakeConfig`，保证运行时行为可观测、可调整、可测试。
//! 压缩搜索的上限、质量阶梯与缩放节奏都是配置而不是算法里的魔法数字。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的默认值（每张 1 MiB、最多 3 张）。
//! - 字段通过 serde 以 camelCase 键名加载，缺省键回落到默认值。
//! - `validate` 在构造与运行时更新时统一执行范围校验。

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::IntakeError;

/// 压缩后仍超出预算时的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverBudgetPolicy {
    /// 丢弃该图片并报告 `over-budget`。
    Reject,
    /// 接收最佳结果，但在报告中附带警告。
    AcceptWithWarning,
}

/// 渲染缩放滤镜（映射到 `image` 与 `fast_image_resize` 的滤镜）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// 图片接收配置。
///
/// 字段覆盖了槽位、体积预算、压缩搜索与解码资源限制四个方面。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeConfig {
    /// 每个商品最多可附带的图片数。
    pub max_images: usize,
    /// 单张图片编码后的体积上限（字节）。
    pub byte_ceiling: u64,
    /// 初始编码质量（0.0–1.0）。
    pub quality_start: f32,
    /// 质量下限，搜索不会低于该值。
    pub quality_floor: f32,
    /// 每次尝试后的质量递减量。
    pub quality_step: f32,
    /// 压缩搜索的最大尝试次数。
    pub max_attempts: u32,
    /// 尝试序号大于该值后开始缩小尺寸。
    pub dimension_shrink_start_attempt: u32,
    /// 每次缩小尺寸的比例。
    pub dimension_shrink_factor: f32,
    /// 超预算结果的处理策略。
    pub over_budget_policy: OverBudgetPolicy,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 渲染缩放滤镜。
    pub resize_filter: ResizeFilter,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_images: 3,
            byte_ceiling: 1024 * 1024,
            quality_start: 0.92,
            quality_floor: 0.35,
            quality_step: 0.10,
            max_attempts: 12,
            dimension_shrink_start_attempt: 6,
            dimension_shrink_factor: 0.85,
            over_budget_policy: OverBudgetPolicy::Reject,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: ResizeFilter::Triangle,
        }
    }
}

impl IntakeConfig {
    /// 从 JSON 字符串加载配置，未出现的键使用默认值。
    ///
    /// # 示例
    /// ```rust
    /// use listing_image_intake::image_intake::IntakeConfig;
    ///
    /// let config = IntakeConfig::from_json_str(r#"{ "maxImages": 5 }"#)?;
    /// assert_eq!(config.max_images, 5);
    /// assert_eq!(config.byte_ceiling, 1024 * 1024);
    /// # Ok::<(), listing_image_intake::image_intake::IntakeError>(())
    /// ```
    pub fn from_json_str(content: &str) -> Result<Self, IntakeError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| IntakeError::InvalidConfig(format!("解析配置失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验各项参数范围。
    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.max_images == 0 {
            return Err(IntakeError::InvalidConfig("maxImages 必须至少为 1".to_string()));
        }
        if self.byte_ceiling == 0 {
            return Err(IntakeError::InvalidConfig("byteCeiling 必须大于 0".to_string()));
        }
        if !(self.quality_floor > 0.0 && self.quality_floor <= self.quality_start && self.quality_start <= 1.0) {
            return Err(IntakeError::InvalidConfig(format!(
                "质量范围无效：需满足 0 < qualityFloor({}) <= qualityStart({}) <= 1",
                self.quality_floor, self.quality_start
            )));
        }
        if !(self.quality_step > 0.0 && self.quality_step <= 1.0) {
            return Err(IntakeError::InvalidConfig("qualityStep 必须在 (0, 1] 之间".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(IntakeError::InvalidConfig("maxAttempts 必须至少为 1".to_string()));
        }
        if !(self.dimension_shrink_factor > 0.0 && self.dimension_shrink_factor < 1.0) {
            return Err(IntakeError::InvalidConfig(
                "dimensionShrinkFactor 必须在 (0, 1) 之间".to_string(),
            ));
        }
        if self.max_decoded_pixels == 0 || self.max_decoded_bytes == 0 {
            return Err(IntakeError::InvalidConfig("解码资源上限必须大于 0".to_string()));
        }

        Ok(())
    }
}
