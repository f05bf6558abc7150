//! 具体的 Action 实现
//!
//! 每个编辑工具对应一个 Action 实现

mod modify_array;
mod modify_explode;
mod modify_fillet;
mod modify_mirror;
mod modify_move;
mod modify_offset;
mod modify_rotate;
mod modify_scale;
mod modify_trim;
mod select;

pub use modify_array::ArrayAction;
pub use modify_explode::ExplodeAction;
pub use modify_fillet::FilletAction;
pub use modify_mirror::MirrorAction;
pub use modify_move::MoveAction;
pub use modify_offset::OffsetAction;
pub use modify_rotate::RotateAction;
pub use modify_scale::ScaleAction;
pub use modify_trim::TrimAction;
pub use select::SelectAction;

use crate::action::{Action, ActionType};
use zdraft_core::document::ModifyResult;
use zdraft_core::entity::Entity;

/// 创建指定类型的 Action
pub fn create_action(action_type: ActionType) -> Box<dyn Action> {
    match action_type {
        ActionType::Select => Box::new(SelectAction::new()),
        ActionType::Move => Box::new(MoveAction::new()),
        ActionType::Copy => Box::new(MoveAction::copy()),
        ActionType::Rotate => Box::new(RotateAction::new()),
        ActionType::Scale => Box::new(ScaleAction::new()),
        ActionType::Mirror => Box::new(MirrorAction::new()),
        ActionType::RectangularArray => Box::new(ArrayAction::rectangular()),
        ActionType::PolarArray => Box::new(ArrayAction::polar()),
        ActionType::Trim => Box::new(TrimAction::trim()),
        ActionType::Extend => Box::new(TrimAction::extend()),
        ActionType::Fillet => Box::new(FilletAction::fillet()),
        ActionType::Chamfer => Box::new(FilletAction::chamfer()),
        ActionType::Offset => Box::new(OffsetAction::new()),
        ActionType::Explode => Box::new(ExplodeAction::new()),
    }
}

/// 对每个实体做变换；保留原对象时只新增副本，否则替换
///
/// 没有任何实体变换成功时返回 `None`。
pub(crate) fn transform_each(
    entities: &[&Entity],
    keep_originals: bool,
    transform: impl Fn(&Entity) -> Option<Entity>,
) -> Option<ModifyResult> {
    let mut result = ModifyResult::default();
    for entity in entities {
        if let Some(moved) = transform(entity) {
            if !keep_originals {
                result.remove_ids.push(entity.id);
            }
            result.add_entities.push(moved);
        }
    }
    (!result.is_empty()).then_some(result)
}

#[cfg(test)]
pub(crate) mod test_support {
    use zdraft_core::document::Document;
    use zdraft_core::entity::{Entity, EntityId};
    use zdraft_core::geometry::{Geometry, Line};
    use zdraft_core::math::Point2;

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
        Entity::new(Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
    }

    /// 文档与其中实体的ID（按加入顺序）
    pub fn document_with(entities: Vec<Entity>) -> (Document, Vec<EntityId>) {
        let mut doc = Document::new();
        let ids = entities.into_iter().map(|e| doc.add_entity(e)).collect();
        (doc, ids)
    }
}
