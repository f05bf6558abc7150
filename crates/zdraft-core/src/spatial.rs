//! 命中测试与空间查询
//!
//! - 单实体点击测试与包围盒（块参照通过块表展开）
//! - 框选：从右向左拖为交叉选择，从左向右拖为窗口选择

use crate::block::{instantiate, BlockTable};
use crate::entity::{Entity, EntityId};
use crate::geometry::Geometry;
use crate::math::{BoundingBox2, Point2};
use tracing::trace;

/// 点击测试
pub fn hit_test(entity: &Entity, point: &Point2, tolerance: f64, blocks: &BlockTable) -> bool {
    match &entity.geometry {
        Geometry::BlockRef(block_ref) => instantiate(block_ref, blocks)
            .iter()
            .any(|child| child.geometry.contains_point(point, tolerance)),
        geometry => geometry.contains_point(point, tolerance),
    }
}

/// 实体包围盒；构造线、射线、空几何以及无法解析的块参照返回 `None`
pub fn bounding_box(entity: &Entity, blocks: &BlockTable) -> Option<BoundingBox2> {
    match &entity.geometry {
        Geometry::BlockRef(block_ref) => instantiate(block_ref, blocks)
            .iter()
            .filter_map(|child| child.geometry.bounding_box())
            .reduce(|a, b| a.union(&b)),
        geometry => geometry.bounding_box(),
    }
}

/// 框选模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// 窗口选择：包围盒完全位于框内
    Window,
    /// 交叉选择：包围盒与框相交即可
    Crossing,
}

impl SelectionMode {
    /// 由拖拽方向决定：`p2.x < p1.x` 为交叉选择
    pub fn from_drag(p1: &Point2, p2: &Point2) -> Self {
        if p2.x < p1.x {
            SelectionMode::Crossing
        } else {
            SelectionMode::Window
        }
    }
}

/// 框选，结果保持实体的原始顺序
pub fn entities_in_box(
    entities: &[&Entity],
    p1: Point2,
    p2: Point2,
    blocks: &BlockTable,
) -> Vec<EntityId> {
    let mode = SelectionMode::from_drag(&p1, &p2);
    let rect = BoundingBox2::from_corners(p1, p2);

    let selected: Vec<EntityId> = entities
        .iter()
        .filter(|e| e.visible)
        .filter(|e| {
            bounding_box(e, blocks).is_some_and(|bbox| match mode {
                SelectionMode::Crossing => rect.intersects(&bbox),
                SelectionMode::Window => rect.contains_box(&bbox),
            })
        })
        .map(|e| e.id)
        .collect();

    trace!("{:?} 框选命中 {} 个实体", mode, selected.len());
    selected
}

/// 点选容差从 `tolerance / 8` 开始逐级放大
const PICK_STAGES: [f64; 4] = [0.125, 0.25, 0.5, 1.0];

/// 点选：在命中的最小容差级别中返回最上层（最后绘制）的可见实体
///
/// 紧贴光标的实体优先于容差边缘处的实体，同一级别内后绘制的优先。
pub fn pick_entity(
    entities: &[&Entity],
    point: &Point2,
    tolerance: f64,
    blocks: &BlockTable,
) -> Option<EntityId> {
    PICK_STAGES.iter().find_map(|stage| {
        entities
            .iter()
            .rev()
            .filter(|e| e.visible)
            .find(|e| hit_test(e, point, tolerance * stage, blocks))
            .map(|e| e.id)
    })
}
