//! # 解码模块
//!
//! ## 设计思路
//!
//! 将“字节 → 像素表面”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先读取头信息做尺寸检查，再进行完整解码，降低超大照片触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限与内存估算快速拒绝（按 EXIF 方向旋转后的显示尺寸）
//! 3. 完整解码并应用 EXIF 方向，手机竖拍照片不会被横放
//! 4. 转换为 RGBA 表面，记录源图是否带 alpha
//!
//! 表面由调用方独占，离开作用域即释放（成功、失败、提前返回均如此）。

use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;

use super::source::{BitmapSurface, RawInput};
use super::{IntakeConfig, IntakeError};

/// 将原始字节解码为 RGBA 像素表面（已按 EXIF 方向摆正）。
pub fn decode_surface(raw: &RawInput, config: &IntakeConfig) -> Result<BitmapSurface, IntakeError> {
    let format: ImageFormat = image::guess_format(&raw.bytes)
        .map_err(|e| IntakeError::Decode(format!("不支持的图片格式：{}", e)))?;

    let mut decoder = ImageReader::with_format(Cursor::new(&raw.bytes[..]), format)
        .into_decoder()
        .map_err(|e| IntakeError::Decode(format!("无法读取图片头信息：{}", e)))?;

    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let (header_width, header_height) = displayed_dimensions(decoder.dimensions(), orientation);
    validate_pixel_limits(config, header_width, header_height)?;
    validate_decoded_memory_limits(config, header_width, header_height)?;

    let mut decoded = DynamicImage::from_decoder(decoder)
        .map_err(|e| IntakeError::Decode(format!("图片解码失败：{}", e)))?;
    decoded.apply_orientation(orientation);

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(IntakeError::Decode(format!("图片尺寸无效：{}x{}", width, height)));
    }
    validate_pixel_limits(config, width, height)?;
    validate_decoded_memory_limits(config, width, height)?;

    let has_alpha = decoded.color().has_alpha();
    let pixels = decoded.into_rgba8();

    log::debug!(
        "🖼️ 图片解码成功 - 格式: {:?} 尺寸: {}x{} 方向: {:?} alpha: {}",
        format,
        width,
        height,
        orientation,
        has_alpha
    );

    Ok(BitmapSurface { pixels, has_alpha })
}

/// 应用方向后的显示尺寸；90°/270° 类方向交换宽高。
fn displayed_dimensions((width, height): (u32, u32), orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::Rotate90
        | Orientation::Rotate270
        | Orientation::Rotate90FlipH
        | Orientation::Rotate270FlipH => (height, width),
        _ => (width, height),
    }
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &IntakeConfig, width: u32, height: u32) -> Result<(), IntakeError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| IntakeError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(IntakeError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(config: &IntakeConfig, width: u32, height: u32) -> Result<(), IntakeError> {
    let estimated = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| IntakeError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(IntakeError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}
