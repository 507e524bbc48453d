//! # 图片槽位模块
//!
//! ## 设计思路
//!
//! 商品图片是一个有上限的有序列表，0 号槽位即封面图。
//! 只允许两种修改：末尾追加（接收成功）与按下标删除（用户操作），不存在重排。
//! 任何时刻 `len() <= max_images`。

use super::IntakeError;
use super::source::AcceptedImage;

/// 有上限的有序图片列表。
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlotList {
    images: Vec<AcceptedImage>,
    max_images: usize,
}

impl ImageSlotList {
    pub fn new(max_images: usize) -> Self {
        Self {
            images: Vec::with_capacity(max_images),
            max_images,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    pub fn free_slots(&self) -> usize {
        self.max_images.saturating_sub(self.images.len())
    }

    /// 追加到末尾并返回下标；已满时列表不变并返回 `SlotLimitReached`。
    pub fn append(&mut self, image: AcceptedImage) -> Result<usize, IntakeError> {
        if self.images.len() >= self.max_images {
            return Err(IntakeError::SlotLimitReached { max: self.max_images });
        }
        self.images.push(image);
        Ok(self.images.len() - 1)
    }

    /// 删除指定下标，后续元素左移；越界时不做任何事。
    pub fn remove_at(&mut self, index: usize) -> Option<AcceptedImage> {
        if index >= self.images.len() {
            return None;
        }
        Some(self.images.remove(index))
    }

    /// 封面图（0 号槽位）。
    pub fn primary(&self) -> Option<&AcceptedImage> {
        self.images.first()
    }

    pub fn get(&self, index: usize) -> Option<&AcceptedImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcceptedImage> {
        self.images.iter()
    }

    /// 按槽位顺序输出 data URL，供商品提交载荷使用。
    pub fn to_payload(&self) -> Vec<String> {
        self.images.iter().map(AcceptedImage::to_data_url).collect()
    }

    /// 调整上限。现有数量超过新上限时拒绝。
    pub(crate) fn set_max_images(&mut self, max_images: usize) -> Result<(), IntakeError> {
        if self.images.len() > max_images {
            return Err(IntakeError::InvalidConfig(format!(
                "当前已有 {} 张图片，不能将上限改为 {}",
                self.images.len(),
                max_images
            )));
        }
        self.max_images = max_images;
        Ok(())
    }
}
