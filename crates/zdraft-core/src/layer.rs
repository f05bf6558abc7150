//! 图层管理

use crate::entity::LayerId;
use crate::properties::Color;
use serde::{Deserialize, Serialize};

/// 图层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// 图层颜色（渲染器在实体未指定颜色时使用）
    pub color: Color,
    pub visible: bool,
    /// 锁定图层上的实体可见但不可编辑
    pub locked: bool,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: Color::WHITE,
            visible: true,
            locked: false,
        }
    }

    /// 默认图层 "0"
    pub fn default_layer() -> Self {
        Self::new(LayerId::DEFAULT, "0")
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::default_layer()
    }
}
