//! 块定义与块参照
//!
//! 块定义保存在自身坐标系中（原点为 `base_point`）；块参照只记录插入点、
//! 比例和旋转。渲染、命中测试、捕捉所需的实例几何每次按需派生，不写回文档。
//!
//! 已知简化：半径和字高只按 `|scale_x|` 缩放，非均匀缩放下的圆不会变成椭圆。

use crate::entity::{BlockId, Entity};
use crate::geometry::{BlockRef, Geometry};
use crate::math::Point2;
use crate::transform::{transform_geometry, Transform2D};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// 嵌套块参照的最大展开深度（防止自引用导致无限递归）
pub const MAX_BLOCK_DEPTH: usize = 16;

/// 块定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: BlockId,
    pub name: String,
    /// 子实体（块局部坐标）
    pub entities: Vec<Entity>,
    /// 块基点
    pub base_point: Point2,
}

impl BlockDefinition {
    pub fn new(name: impl Into<String>, base_point: Point2, entities: Vec<Entity>) -> Self {
        Self {
            id: BlockId::new(),
            name: name.into(),
            entities,
            base_point,
        }
    }
}

/// 块表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockTable {
    definitions: BTreeMap<BlockId, BlockDefinition>,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入块定义，返回其ID
    pub fn insert(&mut self, definition: BlockDefinition) -> BlockId {
        let id = definition.id;
        self.definitions.insert(id, definition);
        id
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockDefinition> {
        self.definitions.get(&id)
    }

    pub fn remove(&mut self, id: BlockId) -> Option<BlockDefinition> {
        self.definitions.remove(&id)
    }

    /// 按名称查找
    pub fn find_by_name(&self, name: &str) -> Option<&BlockDefinition> {
        self.definitions.values().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// 块局部坐标 → 世界坐标：`(p − base)` 缩放、旋转，再平移到 `insert`
pub fn transform_point(
    point: &Point2,
    base: &Point2,
    insert: &Point2,
    scale_x: f64,
    scale_y: f64,
    rotation: f64,
) -> Point2 {
    Transform2D::block(*base, *insert, scale_x, scale_y, rotation).apply_point(point)
}

/// 块参照对应的仿射变换
pub fn block_transform(definition: &BlockDefinition, block_ref: &BlockRef) -> Transform2D {
    Transform2D::block(
        definition.base_point,
        block_ref.insert_point,
        block_ref.scale_x,
        block_ref.scale_y,
        block_ref.rotation,
    )
}

/// 派生块参照的实例几何
///
/// 嵌套参照递归展开；子实体沿用定义中的ID与属性，结果只用于渲染和查询。
/// 找不到块定义时返回空集合。
pub fn instantiate(block_ref: &BlockRef, blocks: &BlockTable) -> Vec<Entity> {
    let mut result = Vec::new();
    instantiate_into(block_ref, blocks, &Transform2D::identity(), 0, &mut result);
    result
}

fn instantiate_into(
    block_ref: &BlockRef,
    blocks: &BlockTable,
    outer: &Transform2D,
    depth: usize,
    out: &mut Vec<Entity>,
) {
    if depth >= MAX_BLOCK_DEPTH {
        warn!("块参照嵌套超过 {} 层，停止展开", MAX_BLOCK_DEPTH);
        return;
    }
    let Some(definition) = blocks.get(block_ref.block_id) else {
        trace!("未找到块定义 {:?}", block_ref.block_id);
        return;
    };

    let transform = block_transform(definition, block_ref).then(outer);
    for child in &definition.entities {
        match &child.geometry {
            Geometry::BlockRef(nested) => {
                instantiate_into(nested, blocks, &transform, depth + 1, out);
            }
            geometry => out.push(Entity {
                geometry: transform_geometry(geometry, &transform),
                ..child.clone()
            }),
        }
    }
}

/// 炸开块参照：子实体变换一次后成为独立实体（新ID）
///
/// 只展开一层，嵌套的块参照变换后仍是块参照。
pub fn explode(definition: &BlockDefinition, block_ref: &BlockRef) -> Vec<Entity> {
    let transform = block_transform(definition, block_ref);
    definition
        .entities
        .iter()
        .map(|child| child.derive(transform_geometry(&child.geometry, &transform)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Circle, Line};
    use crate::math::distance;
    use std::f64::consts::FRAC_PI_2;

    fn square_block() -> BlockDefinition {
        BlockDefinition::new(
            "square",
            Point2::new(1.0, 1.0),
            vec![
                Entity::new(Geometry::Line(Line::new(
                    Point2::new(1.0, 1.0),
                    Point2::new(3.0, 1.0),
                ))),
                Entity::new(Geometry::Circle(Circle::new(Point2::new(2.0, 2.0), 1.0))),
            ],
        )
    }

    #[test]
    fn test_transform_point() {
        let p = transform_point(
            &Point2::new(3.0, 1.0),
            &Point2::new(1.0, 1.0),
            &Point2::new(10.0, 10.0),
            2.0,
            2.0,
            FRAC_PI_2,
        );
        // (2,0) → (4,0) → (0,4) → (10,14)
        assert!(distance(&p, &Point2::new(10.0, 14.0)) < 1e-9);
    }

    #[test]
    fn test_instantiate_scales_radius_by_scale_x() {
        let mut blocks = BlockTable::new();
        let def = square_block();
        let block_id = blocks.insert(def.clone());
        let block_ref = BlockRef::new(block_id, Point2::new(100.0, 0.0)).with_scale(3.0, 1.0);

        let children = instantiate(&block_ref, &blocks);
        assert_eq!(children.len(), 2);
        // 实例几何沿用定义中的ID
        assert_eq!(children[0].id, def.entities[0].id);
        let Geometry::Circle(c) = &children[1].geometry else {
            panic!("expected circle");
        };
        assert!((c.radius - 3.0).abs() < 1e-9);
        assert!(distance(&c.center, &Point2::new(103.0, 1.0)) < 1e-9);
    }

    #[test]
    fn test_nested_references_resolve() {
        let mut blocks = BlockTable::new();
        let inner_id = blocks.insert(square_block());
        let outer = BlockDefinition::new(
            "outer",
            Point2::origin(),
            vec![Entity::new(Geometry::BlockRef(BlockRef::new(
                inner_id,
                Point2::new(5.0, 0.0),
            )))],
        );
        let outer_id = blocks.insert(outer);
        let block_ref = BlockRef::new(outer_id, Point2::new(0.0, 10.0));

        let children = instantiate(&block_ref, &blocks);
        assert_eq!(children.len(), 2);
        let Geometry::Line(l) = &children[0].geometry else {
            panic!("expected line");
        };
        // 内层：(1,1) - base(1,1) + (5,0) = (5,0)；外层再 + (0,10)
        assert!(distance(&l.start, &Point2::new(5.0, 10.0)) < 1e-9);
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let mut blocks = BlockTable::new();
        let mut def = BlockDefinition::new("loop", Point2::origin(), Vec::new());
        let id = def.id;
        def.entities
            .push(Entity::new(Geometry::BlockRef(BlockRef::new(id, Point2::new(1.0, 0.0)))));
        blocks.insert(def);
        assert!(instantiate(&BlockRef::new(id, Point2::origin()), &blocks).is_empty());
    }

    #[test]
    fn test_explode_allocates_fresh_ids() {
        let def = square_block();
        let block_ref = BlockRef::new(def.id, Point2::new(0.0, 0.0)).with_rotation(FRAC_PI_2);
        let exploded = explode(&def, &block_ref);
        assert_eq!(exploded.len(), 2);
        for (child, original) in exploded.iter().zip(&def.entities) {
            assert_ne!(child.id, original.id);
        }
        let Geometry::Line(l) = &exploded[0].geometry else {
            panic!("expected line");
        };
        assert!(distance(&l.end, &Point2::new(0.0, 2.0)) < 1e-9);
    }

    #[test]
    fn test_missing_definition_yields_nothing() {
        let blocks = BlockTable::new();
        assert!(instantiate(&BlockRef::new(BlockId(999_999), Point2::origin()), &blocks).is_empty());
    }
}
