//! ZDraft 核心几何内核
//!
//! 提供2D图元、求交、命中测试、对象捕捉，以及修剪/延伸、圆角/倒角、
//! 偏移、镜像/旋转/缩放/阵列、样条求值和块参照等编辑算法。
//!
//! # 架构设计
//!
//! - `Entity`: 唯一标识符 + 几何 + 视觉属性 + 图层
//! - `Geometry`: 封闭的几何枚举，每个算法都穷尽匹配
//! - 编辑算法从不修改输入，返回 [`document::ModifyResult`]（删除哪些、新增哪些），
//!   由 [`document::Document::apply`] 生成下一个版本的文档
//!
//! 坐标系沿用画布约定：+x 向右，+y 向下；角度为 `atan2(dy, dx)`。
//!
//! # 示例
//!
//! ```rust
//! use zdraft_core::prelude::*;
//!
//! let a = Entity::new(Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0))));
//! let b = Entity::new(Geometry::Line(Line::new(Point2::new(10.0, 0.0), Point2::new(10.0, 10.0))));
//!
//! // 半径为 2 的圆角：两条修剪后的直线加一段圆弧
//! let result = fillet_lines(&a, &b, 2.0).unwrap();
//! assert_eq!(result.add_entities.len(), 3);
//! ```

pub mod block;
pub mod document;
pub mod entity;
pub mod error;
pub mod fillet;
pub mod geometry;
pub mod intersect;
pub mod layer;
pub mod math;
pub mod offset;
pub mod properties;
pub mod settings;
pub mod snap;
pub mod spatial;
pub mod spline;
pub mod transform;
pub mod trim;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::block::{explode, instantiate, BlockDefinition, BlockTable};
    pub use crate::document::{Document, ModifyResult};
    pub use crate::entity::{BlockId, Entity, EntityId, LayerId};
    pub use crate::error::GeometryError;
    pub use crate::fillet::{chamfer_lines, fillet_lines};
    pub use crate::geometry::{
        Arc, BlockRef, Circle, Dimension, Ellipse, Geometry, Hatch, HatchPattern, Line, Polyline,
        Ray, Rectangle, Spline, Text, XLine,
    };
    pub use crate::intersect::intersect_geometry;
    pub use crate::layer::Layer;
    pub use crate::math::{BoundingBox2, Point2, Vector2};
    pub use crate::offset::offset_entity;
    pub use crate::properties::{Color, LineStyle, Properties};
    pub use crate::settings::KernelSettings;
    pub use crate::snap::{
        apply_ortho, polar_snap, GridSettings, PolarSettings, SnapEngine, SnapMask, SnapPoint,
        SnapSettings, SnapType,
    };
    pub use crate::spatial::{entities_in_box, hit_test, pick_entity, SelectionMode};
    pub use crate::transform::{
        mirror_entity, polar_array, rectangular_array, rotate_entity, scale_entity,
        translate_entity, PolarArray, RectangularArray, Transform2D,
    };
    pub use crate::trim::{extend_entity, trim_entity};
}
