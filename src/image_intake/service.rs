//! # 服务层（槽位列表的唯一所有者）
//!
//! ## 设计思路
//!
//! 商品表单不直接修改图片列表，而是通过 `IntakeService`：
//! 1. 追加只能经由 `intake`（一次选择一个批次）
//! 2. 删除只能经由 `remove_image`
//! 3. 读取拿到的是快照副本
//!
//! 同一时间只允许一个批次修改列表：新批次在已有批次进行中时立即返回
//! `BatchInProgress`，避免空闲槽位检查出现丢失更新。
//!
//! ## 实现思路
//!
//! - 槽位列表放在 `tokio::sync::Mutex` 中，批次全程持有锁。
//! - 取消标志为 `AtomicBool`，压缩搜索每次尝试前检查。
//! - `InFlightGuard` 采用 RAII 模式：批次开始时置位，`Drop` 时自动清除，
//!   即使处理过程提前返回也能恢复。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use super::encoder::RenderBackend;
use super::{AcceptedImage, ImageSlotList, IntakeConfig, IntakeError, IntakeHandler, IntakeReport, RawInput};

/// 批次进行中标志的 RAII 守卫。
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// 图片接收服务状态。
pub struct IntakeService {
    handler: IntakeHandler,
    slots: Mutex<ImageSlotList>,
    cancel_flag: Arc<AtomicBool>,
    in_flight: AtomicBool,
}

impl IntakeService {
    /// 使用默认配置创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use listing_image_intake::image_intake::IntakeService;
    ///
    /// let service = IntakeService::new()?;
    /// # Ok::<(), listing_image_intake::image_intake::IntakeError>(())
    /// ```
    pub fn new() -> Result<Self, IntakeError> {
        Self::with_config(IntakeConfig::default())
    }

    /// 使用自定义配置创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use listing_image_intake::image_intake::{IntakeConfig, IntakeService};
    ///
    /// let config = IntakeConfig { max_images: 5, ..IntakeConfig::default() };
    /// let service = IntakeService::with_config(config)?;
    /// # Ok::<(), listing_image_intake::image_intake::IntakeError>(())
    /// ```
    pub fn with_config(config: IntakeConfig) -> Result<Self, IntakeError> {
        let max_images = config.max_images;
        let handler = IntakeHandler::new(config)?;
        Ok(Self::from_handler(handler, max_images))
    }

    /// 使用自定义后端创建服务（主要用于测试或替换编码器）。
    pub fn with_backend(config: IntakeConfig, backend: Arc<dyn RenderBackend>) -> Result<Self, IntakeError> {
        let max_images = config.max_images;
        let handler = IntakeHandler::with_backend(config, backend)?;
        Ok(Self::from_handler(handler, max_images))
    }

    fn from_handler(handler: IntakeHandler, max_images: usize) -> Self {
        Self {
            handler,
            slots: Mutex::new(ImageSlotList::new(max_images)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            in_flight: AtomicBool::new(false),
        }
    }

    /// 处理一次文件选择。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use listing_image_intake::image_intake::{IntakeService, RawInput};
    ///
    /// # async fn demo() -> Result<(), listing_image_intake::image_intake::IntakeError> {
    /// let service = IntakeService::new()?;
    /// let report = service
    ///     .intake(vec![RawInput::new(std::fs::read("front.jpg").unwrap_or_default(), Some("image/jpeg"))])
    ///     .await?;
    /// println!("accepted {}", report.accepted);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn intake(&self, inputs: Vec<RawInput>) -> Result<IntakeReport, IntakeError> {
        let mut slots = self.slots.try_lock().map_err(|_| IntakeError::BatchInProgress)?;
        let _guard = InFlightGuard::new(&self.in_flight);
        self.cancel_flag.store(false, Ordering::SeqCst);

        self.handler.process_batch(inputs, &mut slots, &self.cancel_flag).await
    }

    /// 请求取消进行中的批次。没有批次在处理时返回 `false`。
    pub fn cancel_intake(&self) -> bool {
        if !self.in_flight.load(Ordering::SeqCst) {
            return false;
        }
        self.cancel_flag.store(true, Ordering::SeqCst);
        log::info!("🛑 已请求取消图片批次");
        true
    }

    /// 删除指定槽位，进行中的批次结束后才会执行。
    pub async fn remove_image(&self, index: usize) -> Option<AcceptedImage> {
        self.slots.lock().await.remove_at(index)
    }

    /// 槽位列表快照。
    pub async fn slots(&self) -> ImageSlotList {
        self.slots.lock().await.clone()
    }

    /// 封面图快照。
    pub async fn primary(&self) -> Option<AcceptedImage> {
        self.slots.lock().await.primary().cloned()
    }

    /// 商品提交载荷（按槽位顺序的 data URL）。
    pub async fn payload(&self) -> Vec<String> {
        self.slots.lock().await.to_payload()
    }

    /// 更新配置；批次进行中时拒绝。
    pub fn set_config(&self, config: IntakeConfig) -> Result<(), IntakeError> {
        let mut slots = self.slots.try_lock().map_err(|_| IntakeError::BatchInProgress)?;
        config.validate()?;
        slots.set_max_images(config.max_images)?;
        self.handler.update_config(config)
    }

    pub fn config(&self) -> Result<IntakeConfig, IntakeError> {
        self.handler.config_snapshot()
    }
}
