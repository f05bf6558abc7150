//! 内核设置
//!
//! 捕捉、网格、极轴与拾取容差，全部可以从 JSON 配置文件读取。
//! 缺省字段使用默认值。

use crate::snap::{GridSettings, PolarSettings, SnapSettings};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 拾取容差的默认值（世界坐标）
pub const DEFAULT_PICK_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    pub snap: SnapSettings,
    pub grid: GridSettings,
    pub polar: PolarSettings,
    /// 点选和捕捉使用的容差
    pub pick_tolerance: f64,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            snap: SnapSettings::default(),
            grid: GridSettings::default(),
            polar: PolarSettings::default(),
            pick_tolerance: DEFAULT_PICK_TOLERANCE,
        }
    }
}

impl KernelSettings {
    /// 修正不合理的取值，返回修正后的设置
    ///
    /// 每处修正都会记录一条警告。
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();

        if !(self.grid.spacing.is_finite() && self.grid.spacing > 0.0) {
            warn!("网格间距 {} 无效，使用 {}", self.grid.spacing, defaults.grid.spacing);
            self.grid.spacing = defaults.grid.spacing;
        }
        if self.grid.major_every == 0 {
            warn!("主网格间隔不能为 0，使用 {}", defaults.grid.major_every);
            self.grid.major_every = defaults.grid.major_every;
        }
        if !(self.polar.increment.is_finite() && self.polar.increment > 0.0 && self.polar.increment <= 360.0) {
            warn!("极轴增量角 {} 无效，使用 {}", self.polar.increment, defaults.polar.increment);
            self.polar.increment = defaults.polar.increment;
        }
        let before = self.polar.extra_angles.len();
        self.polar.extra_angles.retain(|a| a.is_finite());
        if self.polar.extra_angles.len() != before {
            warn!("丢弃 {} 个无效的极轴追踪角", before - self.polar.extra_angles.len());
        }
        if !(self.pick_tolerance.is_finite() && self.pick_tolerance > 0.0) {
            warn!("拾取容差 {} 无效，使用 {}", self.pick_tolerance, DEFAULT_PICK_TOLERANCE);
            self.pick_tolerance = DEFAULT_PICK_TOLERANCE;
        }
        self
    }
}
