//! 单元测试共用的假后端与样本图片。

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbImage, Rgba, RgbaImage};

use super::encoder::{RenderBackend, RenderedFrame};
use super::source::{BitmapSurface, EncodedCandidate};
use super::IntakeError;

/// 输出体积 = 像素数 × 质量 × `bytes_per_pixel` 的可预测后端。
pub(crate) struct SizeModelBackend {
    bytes_per_pixel: f32,
    fail_encode: bool,
    delay_for_width: Option<fn(u32) -> Duration>,
    pub(crate) renders: AtomicU32,
    pub(crate) encodes: AtomicU32,
    pub(crate) saw_alpha: AtomicBool,
}

impl SizeModelBackend {
    pub(crate) fn new(bytes_per_pixel: f32) -> Self {
        Self {
            bytes_per_pixel,
            fail_encode: false,
            delay_for_width: None,
            renders: AtomicU32::new(0),
            encodes: AtomicU32::new(0),
            saw_alpha: AtomicBool::new(false),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_encode: true,
            ..Self::new(1.0)
        }
    }

    pub(crate) fn with_delay(mut self, delay_for_width: fn(u32) -> Duration) -> Self {
        self.delay_for_width = Some(delay_for_width);
        self
    }

    pub(crate) fn encode_count(&self) -> u32 {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl RenderBackend for SizeModelBackend {
    fn output_format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn render(&self, surface: &BitmapSurface, width: u32, height: u32) -> Result<RenderedFrame, IntakeError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if surface.has_alpha() {
            self.saw_alpha.store(true, Ordering::SeqCst);
        }
        if let Some(delay_for_width) = self.delay_for_width {
            std::thread::sleep(delay_for_width(surface.width()));
        }
        Ok(RenderedFrame::new(RgbImage::new(width, height)))
    }

    fn encode(&self, frame: &RenderedFrame, quality: f32) -> Result<EncodedCandidate, IntakeError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.fail_encode {
            return Err(IntakeError::Encode("模拟编码失败".to_string()));
        }
        let pixels = frame.width() as f32 * frame.height() as f32;
        let len = (pixels * quality * self.bytes_per_pixel).round() as usize;
        Ok(EncodedCandidate::new(vec![0u8; len], ImageFormat::Jpeg))
    }
}

pub(crate) fn opaque_surface(width: u32, height: u32) -> BitmapSurface {
    BitmapSurface {
        pixels: RgbaImage::from_pixel(width, height, Rgba([120, 80, 40, 255])),
        has_alpha: false,
    }
}

/// 伪随机噪声 PNG：几乎不可压缩，用来制造超出预算的输入。
pub(crate) fn noisy_png_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    let img = RgbaImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    });

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

/// 伪随机噪声 JPEG。
pub(crate) fn noisy_jpeg_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        image::Rgb([r, g, b])
    });

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .expect("failed to encode test image");
    cursor.into_inner()
}

/// 在 SOI 之后插入只含方向标签（0x0112）的 EXIF APP1 段。
pub(crate) fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::with_capacity(26);
    tiff.extend_from_slice(b"MM\x00\x2a");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let segment_len = (2 + 6 + tiff.len()) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\x00\x00");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}
