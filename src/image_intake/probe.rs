//! # 体积探测模块
//!
//! 只测量、不提交：压缩引擎在每次尝试后调用，判断结果是否落在预算内。

use super::source::EncodedCandidate;

/// 一次探测的读数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReading {
    pub bytes: u64,
    pub within_budget: bool,
}

/// 按固定上限判断字节长度。比较是精确的 `<=`。
#[derive(Debug, Clone, Copy)]
pub struct BudgetProbe {
    ceiling: u64,
}

impl BudgetProbe {
    pub fn new(ceiling: u64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn measure(&self, candidate: &EncodedCandidate) -> ProbeReading {
        self.measure_len(candidate.len())
    }

    pub fn measure_len(&self, bytes: u64) -> ProbeReading {
        ProbeReading {
            bytes,
            within_budget: bytes <= self.ceiling,
        }
    }
}
