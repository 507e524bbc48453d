//! # 批次结果报告
//!
//! 每一次跳过、截断都必须带原因返回给调用方，不允许静默丢弃。

use std::fmt;

use serde::Serialize;

/// 单个文件被跳过的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// 声明类型不是图片。
    NotAnImage,
    /// 解码或编码失败。
    CompressFailed,
    /// 压缩后仍超出预算，且策略为拒绝。
    OverBudget,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAnImage => "not-an-image",
            Self::CompressFailed => "compress-failed",
            Self::OverBudget => "over-budget",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedInput {
    /// 在本次选择中的下标。
    pub index: usize,
    pub reason: SkipReason,
    pub detail: String,
}

/// 超出预算但按策略被接收的图片。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverBudgetWarning {
    pub index: usize,
    pub bytes: u64,
    pub ceiling: u64,
}

/// 一次接收批次的结构化结果。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeReport {
    pub accepted: usize,
    pub skipped: Vec<SkippedInput>,
    pub truncated: usize,
    pub warnings: Vec<OverBudgetWarning>,
}

impl IntakeReport {
    pub(crate) fn skip(&mut self, index: usize, reason: SkipReason, detail: impl Into<String>) {
        self.skipped.push(SkippedInput {
            index,
            reason,
            detail: detail.into(),
        });
    }

    /// 按原因筛选跳过的下标。
    pub fn skipped_indices(&self, reason: SkipReason) -> Vec<usize> {
        self.skipped
            .iter()
            .filter(|entry| entry.reason == reason)
            .map(|entry| entry.index)
            .collect()
    }

    /// `batch-truncated: N skipped`，没有截断时为 `None`。
    pub fn truncation_notice(&self) -> Option<String> {
        (self.truncated > 0).then(|| format!("batch-truncated: {} skipped", self.truncated))
    }

    /// 面向用户的提示行，每个跳过、截断与警告各一行。
    pub fn notices(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .skipped
            .iter()
            .map(|entry| format!("skipped: {} (#{})", entry.reason, entry.index))
            .collect();
        lines.extend(
            self.warnings
                .iter()
                .map(|warning| format!("over-budget: #{} {} > {} bytes", warning.index, warning.bytes, warning.ceiling)),
        );
        lines.extend(self.truncation_notice());
        lines
    }
}
