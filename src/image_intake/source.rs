//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”“流水线中间结果”“可交付结果”三类数据解耦：
//! - `RawInput` 表示用户一次选择中的单个文件（字节 + 声明类型）
//! - `BitmapSurface` 表示解码后的 RGBA 像素，只存在于一次压缩调用内
//! - `EncodedCandidate` 表示一次编码尝试的输出
//! - `AcceptedImage` 表示可以交给商品表单提交的最终图片
//!
//! 只有 `AcceptedImage` 会离开流水线边界。

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use image::{ImageFormat, RgbaImage};
use serde::{Serialize, Serializer};

use super::validator::normalize_media_type;

/// 接收阶段输入：原始字节与声明的媒体类型。
#[derive(Debug, Clone)]
pub struct RawInput {
    pub(crate) bytes: Bytes,
    pub(crate) media_type: Option<String>,
    pub(crate) name: Option<String>,
}

impl RawInput {
    /// 以原始字节与声明类型构造输入。
    ///
    /// # 示例
    /// ```rust
    /// use listing_image_intake::image_intake::RawInput;
    ///
    /// let input = RawInput::new(vec![0u8; 16], Some("image/jpeg")).with_name("front.jpg");
    /// assert_eq!(input.len(), 16);
    /// assert_eq!(input.media_type(), Some("image/jpeg"));
    /// ```
    pub fn new(bytes: impl Into<Bytes>, media_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.map(str::to_string),
            name: None,
        }
    }

    /// 附加文件名（仅用于日志）。
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// 日志里使用的简短标识。
    pub(crate) fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("#{} {}", index, name),
            None => format!("#{}", index),
        }
    }
}

/// 解码阶段输出：RGBA 像素表面。
pub struct BitmapSurface {
    /// RGBA 像素（`width * height * 4`）。
    pub(crate) pixels: RgbaImage,
    /// 源图是否带 alpha 通道。
    pub(crate) has_alpha: bool,
}

impl BitmapSurface {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// 将透明像素合成到不透明背景上，之后 alpha 恒为 255。
    pub(crate) fn flatten_alpha(&mut self, background: [u8; 3]) {
        for pixel in self.pixels.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            if a == 255 {
                continue;
            }
            let alpha = a as u32;
            let blend = |channel: u8, bg: u8| -> u8 {
                ((channel as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8
            };
            pixel.0 = [
                blend(r, background[0]),
                blend(g, background[1]),
                blend(b, background[2]),
                255,
            ];
        }
        self.has_alpha = false;
    }
}

/// 单次编码尝试的输出。
#[derive(Debug, Clone)]
pub struct EncodedCandidate {
    pub(crate) bytes: Vec<u8>,
    pub(crate) format: ImageFormat,
}

impl EncodedCandidate {
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Self { bytes, format }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// 图片来源：原样通过，或经过压缩搜索。
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOrigin {
    /// 原始字节未经改动。
    PassThrough,
    /// 压缩搜索的结果。
    Compressed {
        attempts: u32,
        quality: f32,
        width: u32,
        height: u32,
    },
}

/// 最终交付给商品表单的图片。
///
/// 序列化为 `data:<mime>;base64,<payload>` 字符串，可直接放进商品提交载荷。
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedImage {
    bytes: Bytes,
    media_type: String,
    origin: ImageOrigin,
    over_budget: bool,
}

impl AcceptedImage {
    /// 原样接收（已在预算内）。字节与输入完全一致。
    pub(crate) fn pass_through(raw: RawInput) -> Self {
        let media_type = raw
            .media_type
            .as_deref()
            .and_then(normalize_media_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            bytes: raw.bytes,
            media_type,
            origin: ImageOrigin::PassThrough,
            over_budget: false,
        }
    }

    /// 接收压缩结果。
    pub(crate) fn compressed(candidate: EncodedCandidate, origin: ImageOrigin, over_budget: bool) -> Self {
        let media_type = candidate.format.to_mime_type().to_string();
        Self {
            bytes: Bytes::from(candidate.bytes),
            media_type,
            origin,
            over_budget,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn origin(&self) -> &ImageOrigin {
        &self.origin
    }

    /// 是否为超出预算后仍被接收的结果。
    pub fn is_over_budget(&self) -> bool {
        self.over_budget
    }

    /// 可传输的自描述字符串表示。
    ///
    /// # 示例
    /// ```rust
    /// use listing_image_intake::image_intake::{IntakeService, RawInput};
    ///
    /// let runtime = tokio::runtime::Runtime::new()?;
    /// let service = IntakeService::new()?;
    /// runtime.block_on(service.intake(vec![RawInput::new(vec![0xFF, 0xD8, 0xFF], Some("image/jpeg"))]))?;
    ///
    /// let image = runtime.block_on(service.primary()).expect("one image accepted");
    /// assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl Serialize for AcceptedImage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_data_url())
    }
}
