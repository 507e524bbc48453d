//! # 渲染与编码后端
//!
//! ## 设计思路
//!
//! 压缩搜索只关心“按 (w, h) 渲染 → 按质量 q 编码 → 测量字节数”这三步，
//! 具体用哪个缩放库、哪个编码器由 `RenderBackend` 决定，搜索算法本身不随后端变化。
//!
//! ## 实现思路
//!
//! 默认后端 `JpegCanvas`：
//! - 渲染：自然尺寸直接转 RGB；缩放时优先 `fast_image_resize`，失败回退 `image::imageops::resize`
//! - 编码：`image` 的 JPEG 编码器，质量按 `round(q * 100)` 映射到 1–100

use fast_image_resize as fr;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageBuffer, ImageFormat, RgbImage, Rgba};

use super::config::ResizeFilter;
use super::source::{BitmapSurface, EncodedCandidate};
use super::IntakeError;

/// 已按目标尺寸渲染、等待编码的帧（不透明 RGB）。
pub struct RenderedFrame {
    pixels: RgbImage,
}

impl RenderedFrame {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// 可替换的渲染/编码后端。
pub trait RenderBackend: Send + Sync {
    /// 编码输出格式。
    fn output_format(&self) -> ImageFormat;

    /// 将表面渲染到目标尺寸。
    fn render(&self, surface: &BitmapSurface, width: u32, height: u32) -> Result<RenderedFrame, IntakeError>;

    /// 以给定质量（0.0–1.0）编码一帧。
    fn encode(&self, frame: &RenderedFrame, quality: f32) -> Result<EncodedCandidate, IntakeError>;
}

/// 将 0.0–1.0 的质量映射到 JPEG 编码器的 1–100。
pub(crate) fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// 默认后端：`fast_image_resize` 缩放 + JPEG 编码。
#[derive(Debug, Clone, Copy)]
pub struct JpegCanvas {
    filter: ResizeFilter,
}

impl JpegCanvas {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }

    fn resize_with_fast_image_resize(
        &self,
        surface: &BitmapSurface,
        target_width: u32,
        target_height: u32,
    ) -> Result<RgbImage, IntakeError> {
        let src_image = fr::images::Image::from_vec_u8(
            surface.width(),
            surface.height(),
            surface.pixels().as_raw().clone(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| IntakeError::Encode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(self.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| IntakeError::Encode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| IntakeError::Encode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(rgba.convert())
    }

    fn to_fast_filter(&self) -> fr::FilterType {
        match self.filter {
            ResizeFilter::Nearest => fr::FilterType::Box,
            ResizeFilter::Triangle => fr::FilterType::Bilinear,
            ResizeFilter::CatmullRom => fr::FilterType::CatmullRom,
            ResizeFilter::Gaussian => fr::FilterType::Mitchell,
            ResizeFilter::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

impl Default for JpegCanvas {
    fn default() -> Self {
        Self::new(ResizeFilter::Triangle)
    }
}

impl RenderBackend for JpegCanvas {
    fn output_format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn render(&self, surface: &BitmapSurface, width: u32, height: u32) -> Result<RenderedFrame, IntakeError> {
        if width == 0 || height == 0 {
            return Err(IntakeError::Encode(format!("渲染尺寸无效：{}x{}", width, height)));
        }

        if width == surface.width() && height == surface.height() {
            return Ok(RenderedFrame::new(surface.pixels().convert()));
        }

        match self.resize_with_fast_image_resize(surface, width, height) {
            Ok(pixels) => Ok(RenderedFrame::new(pixels)),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}", err);
                let resized = image::imageops::resize(surface.pixels(), width, height, self.filter.to_image_filter());
                Ok(RenderedFrame::new(resized.convert()))
            }
        }
    }

    fn encode(&self, frame: &RenderedFrame, quality: f32) -> Result<EncodedCandidate, IntakeError> {
        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality));
        encoder
            .encode(frame.pixels.as_raw(), frame.width(), frame.height(), ExtendedColorType::Rgb8)
            .map_err(|e| IntakeError::Encode(format!("JPEG 编码失败：{}", e)))?;

        Ok(EncodedCandidate::new(bytes, ImageFormat::Jpeg))
    }
}
