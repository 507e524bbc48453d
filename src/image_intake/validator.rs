//! # 文件校验模块
//!
//! ## 设计思路
//!
//! 在任何解码工作之前尽快拒绝非图片输入。
//! 判断只依据声明的媒体类型，文件名与扩展名不参与判断。

use super::IntakeError;
use super::source::RawInput;

/// 归一化媒体类型：去掉参数、首尾空白并转为小写。
///
/// 空类型返回 `None`。
pub(crate) fn normalize_media_type(media_type: &str) -> Option<String> {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}

/// 判断媒体类型是否属于 `image/` 家族。
pub(crate) fn is_image_media_type(media_type: &str) -> bool {
    normalize_media_type(media_type)
        .and_then(|essence| essence.strip_prefix("image/").map(|subtype| !subtype.is_empty()))
        .unwrap_or(false)
}

/// 校验输入是否为图片。纯分类，无副作用。
pub(crate) fn validate_input(raw: &RawInput) -> Result<(), IntakeError> {
    match raw.media_type() {
        Some(media_type) if is_image_media_type(media_type) => Ok(()),
        Some(media_type) => Err(IntakeError::NotAnImage(format!("声明类型为 {}", media_type.trim()))),
        None => Err(IntakeError::NotAnImage("缺少声明类型".to_string())),
    }
}
