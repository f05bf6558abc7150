//! 文档：实体、图层与块表的写时复制容器
//!
//! 编辑引擎从不修改实体，只返回 [`ModifyResult`]；调用方在应用前保存撤销快照，
//! 再用 [`Document::apply`] 生成下一个版本的文档。

use crate::block::{explode, BlockDefinition, BlockTable};
use crate::entity::{BlockId, Entity, EntityId, LayerId};
use crate::geometry::Geometry;
use crate::layer::Layer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// 编辑操作的结果：删除哪些实体，新增哪些实体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyResult {
    pub remove_ids: Vec<EntityId>,
    pub add_entities: Vec<Entity>,
}

impl ModifyResult {
    pub fn new(remove_ids: Vec<EntityId>, add_entities: Vec<Entity>) -> Self {
        Self {
            remove_ids,
            add_entities,
        }
    }

    /// 只新增实体（阵列、偏移、复制）
    pub fn added(add_entities: Vec<Entity>) -> Self {
        Self::new(Vec::new(), add_entities)
    }

    /// 用新实体替换一个实体
    pub fn replace(id: EntityId, add_entities: Vec<Entity>) -> Self {
        Self::new(vec![id], add_entities)
    }

    pub fn is_empty(&self) -> bool {
        self.remove_ids.is_empty() && self.add_entities.is_empty()
    }

    /// 合并另一个结果
    pub fn merge(mut self, other: ModifyResult) -> Self {
        self.remove_ids.extend(other.remove_ids);
        self.add_entities.extend(other.add_entities);
        self
    }
}

/// 文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    entities: Vec<Entity>,
    layers: Vec<Layer>,
    blocks: BlockTable,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// 创建只含默认图层的空文档
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            layers: vec![Layer::default_layer()],
            blocks: BlockTable::new(),
        }
    }

    /// 按绘制顺序排列的全部实体
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    /// 添加图层；同ID图层会被替换
    pub fn add_layer(&mut self, layer: Layer) {
        match self.layers.iter_mut().find(|l| l.id == layer.id) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
    }

    pub fn add_block(&mut self, definition: BlockDefinition) -> BlockId {
        self.blocks.insert(definition)
    }

    /// 实体本身与所在图层都可见
    pub fn is_visible(&self, entity: &Entity) -> bool {
        entity.visible && self.layer(entity.layer_id).map_or(true, |l| l.visible)
    }

    /// 可见且实体与图层都未锁定
    pub fn is_editable(&self, entity: &Entity) -> bool {
        self.is_visible(entity)
            && !entity.locked
            && self.layer(entity.layer_id).map_or(true, |l| !l.locked)
    }

    /// 参与渲染、捕捉和剪切边计算的实体
    pub fn visible_entities(&self) -> Vec<&Entity> {
        self.entities.iter().filter(|e| self.is_visible(e)).collect()
    }

    /// 可以被选中编辑的实体
    pub fn editable_entities(&self) -> Vec<&Entity> {
        self.entities.iter().filter(|e| self.is_editable(e)).collect()
    }

    /// 应用编辑结果，返回新文档（自身保持不变）
    ///
    /// 被删除的实体从原位置移除，新实体追加在末尾（位于最上层）。
    pub fn apply(&self, result: &ModifyResult) -> Document {
        let removed: HashSet<EntityId> = result.remove_ids.iter().copied().collect();
        let missing = removed
            .iter()
            .filter(|id| self.get(**id).is_none())
            .count();
        if missing > 0 {
            warn!("{} 个待删除实体不在文档中", missing);
        }

        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .filter(|e| !removed.contains(&e.id))
            .cloned()
            .collect();
        entities.extend(result.add_entities.iter().cloned());

        debug!(
            "应用编辑：删除 {}，新增 {}，实体总数 {}",
            removed.len(),
            result.add_entities.len(),
            entities.len()
        );

        Document {
            entities,
            layers: self.layers.clone(),
            blocks: self.blocks.clone(),
        }
    }

    /// 炸开块参照：删除参照，子实体成为独立实体
    pub fn explode_block_ref(&self, id: EntityId) -> Option<ModifyResult> {
        let entity = self.get(id)?;
        let Geometry::BlockRef(block_ref) = &entity.geometry else {
            debug!("实体 {} 不是块参照，无法炸开", id);
            return None;
        };
        let definition = self.blocks.get(block_ref.block_id)?;
        Some(ModifyResult::replace(id, explode(definition, block_ref)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BlockRef, Circle, Line};
    use crate::math::Point2;

    fn line_entity() -> Entity {
        Entity::new(Geometry::Line(Line::new(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        )))
    }

    #[test]
    fn test_loaded_document_does_not_reuse_ids() {
        let mut doc = Document::new();
        let mut entity = line_entity();
        entity.id = EntityId(9_000_000_000);
        doc.add_entity(entity);

        let json = serde_json::to_string(&doc).unwrap();
        let mut loaded: Document = serde_json::from_str(&json).unwrap();
        let added = loaded.add_entity(line_entity());
        assert!(added.0 > 9_000_000_000);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_apply_is_copy_on_write() {
        let mut doc = Document::new();
        let a = doc.add_entity(line_entity());
        let b = doc.add_entity(line_entity());

        let replacement = line_entity();
        let replacement_id = replacement.id;
        let next = doc.apply(&ModifyResult::replace(a, vec![replacement]));

        assert_eq!(doc.len(), 2);
        assert!(doc.get(a).is_some());
        assert_eq!(
            next.entities().iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![b, replacement_id]
        );
    }

    #[test]
    fn test_layer_visibility_and_lock() {
        let mut doc = Document::new();
        doc.add_layer(Layer::new(LayerId(1), "hidden").hidden());
        doc.add_layer(Layer::new(LayerId(2), "locked").with_locked(true));
        doc.add_entity(line_entity());
        doc.add_entity(line_entity().with_layer(LayerId(1)));
        let locked = doc.add_entity(line_entity().with_layer(LayerId(2)));

        assert_eq!(doc.visible_entities().len(), 2);
        let editable = doc.editable_entities();
        assert_eq!(editable.len(), 1);
        assert!(editable.iter().all(|e| e.id != locked));
    }

    #[test]
    fn test_explode_block_ref() {
        let mut doc = Document::new();
        let block_id = doc.add_block(BlockDefinition::new(
            "dot",
            Point2::origin(),
            vec![Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 1.0)))],
        ));
        let reference = doc.add_entity(Entity::new(Geometry::BlockRef(BlockRef::new(
            block_id,
            Point2::new(5.0, 5.0),
        ))));
        let plain = doc.add_entity(line_entity());

        let result = doc.explode_block_ref(reference).unwrap();
        assert_eq!(result.remove_ids, vec![reference]);
        assert_eq!(result.add_entities.len(), 1);
        assert!(doc.explode_block_ref(plain).is_none());

        let next = doc.apply(&result);
        assert!(next.get(reference).is_none());
        assert!(matches!(
            &next.entities()[1].geometry,
            Geometry::Circle(c) if (c.center.x - 5.0).abs() < 1e-9
        ));
    }
}
