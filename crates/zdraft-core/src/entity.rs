//! 实体标识和管理
//!
//! 实体一经创建即不可变：编辑操作总是派生出带新ID的实体，
//! 由调用方整体替换文档中的实体集合（写时复制）。

use crate::error::GeometryError;
use crate::geometry::Geometry;
use crate::math::BoundingBox2;
use crate::properties::{Color, Properties};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 全局实体ID生成器
static ENTITY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 全局块定义ID生成器
static BLOCK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 实体唯一标识符
///
/// 反序列化时推进全局生成器，之后分配的ID不会与已加载的ID冲突。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64")]
pub struct EntityId(pub u64);

impl EntityId {
    /// 分配新的实体ID
    pub fn new() -> Self {
        Self(ENTITY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        ENTITY_COUNTER.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        Self(raw)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 图层标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct LayerId(pub u32);

impl LayerId {
    /// 默认图层 "0"
    pub const DEFAULT: LayerId = LayerId(0);
}

/// 块定义标识符，反序列化规则同 [`EntityId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64")]
pub struct BlockId(pub u64);

impl BlockId {
    pub fn new() -> Self {
        Self(BLOCK_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<u64> for BlockId {
    fn from(raw: u64) -> Self {
        BLOCK_COUNTER.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        Self(raw)
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

/// CAD实体
///
/// 一个实体包含几何数据和属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// 唯一标识符（创建后不再改变）
    pub id: EntityId,

    /// 几何类型和数据
    pub geometry: Geometry,

    /// 视觉属性
    pub properties: Properties,

    /// 所属图层
    pub layer_id: LayerId,

    /// 是否可见
    pub visible: bool,

    /// 是否锁定（不可编辑）
    pub locked: bool,
}

impl Entity {
    /// 创建新实体（不做校验，调用方保证几何有效）
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: EntityId::new(),
            geometry,
            properties: Properties::default(),
            layer_id: LayerId::DEFAULT,
            visible: true,
            locked: false,
        }
    }

    /// 校验几何后创建实体
    ///
    /// 非有限坐标、负半径、退化图形在这里被拒绝，而不是留到算法内部处理。
    pub fn try_new(geometry: Geometry) -> Result<Self, GeometryError> {
        geometry.validate()?;
        Ok(Self::new(geometry))
    }

    /// 派生新实体：沿用属性与图层，分配新ID
    pub fn derive(&self, geometry: Geometry) -> Entity {
        Entity {
            id: EntityId::new(),
            geometry,
            properties: self.properties.clone(),
            layer_id: self.layer_id,
            visible: self.visible,
            locked: false,
        }
    }

    /// 获取包围盒（块参照需要块表，见 [`crate::spatial::bounding_box`]）
    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        self.geometry.bounding_box()
    }

    /// 使用指定的图层
    pub fn with_layer(mut self, layer_id: LayerId) -> Self {
        self.layer_id = layer_id;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.properties.color = color;
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
