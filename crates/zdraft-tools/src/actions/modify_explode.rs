//! 炸开 Action
//!
//! 有预选时炸开选择集中的块参照，否则点选一个块参照炸开。

use crate::action::{Action, ActionContext, ActionResult, ActionType};
use tracing::debug;
use zdraft_core::document::ModifyResult;
use zdraft_core::math::Point2;

/// 炸开 Action
pub struct ExplodeAction;

impl ExplodeAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExplodeAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for ExplodeAction {
    fn action_type(&self) -> ActionType {
        ActionType::Explode
    }

    fn reset(&mut self) {}

    fn is_idle(&self) -> bool {
        true
    }

    fn wants_snap(&self) -> bool {
        false
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        let targets: Vec<_> = match ctx.selected() {
            selected if !selected.is_empty() => selected.iter().map(|e| e.id).collect(),
            _ => ctx.pick(&coord).map(|e| e.id).into_iter().collect(),
        };

        let result = targets
            .into_iter()
            .filter_map(|id| ctx.document.explode_block_ref(id))
            .fold(ModifyResult::default(), ModifyResult::merge);

        if result.is_empty() {
            debug!("没有可炸开的块参照");
            return ActionResult::Continue;
        }
        ActionResult::Commit(result)
    }

    fn get_prompt(&self) -> &str {
        "选择要炸开的块参照:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::line;
    use zdraft_core::block::BlockDefinition;
    use zdraft_core::document::Document;
    use zdraft_core::entity::Entity;
    use zdraft_core::geometry::{BlockRef, Geometry};

    #[test]
    fn test_explode_picked_block_ref() {
        let mut doc = Document::new();
        let block_id = doc.add_block(BlockDefinition::new(
            "square",
            Point2::origin(),
            vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 1.0, 1.0)],
        ));
        let ref_id = doc.add_entity(Entity::new(Geometry::BlockRef(BlockRef::new(
            block_id,
            Point2::new(100.0, 100.0),
        ))));
        let ctx = ActionContext::new(&doc, Point2::origin());
        let mut action = ExplodeAction::new();

        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(100.5, 100.0)) else {
            panic!("expected commit");
        };
        assert_eq!(result.remove_ids, vec![ref_id]);
        assert_eq!(result.add_entities.len(), 2);

        // 普通实体不能炸开
        let plain_ids = [result.add_entities[0].id];
        let next = doc.apply(&result);
        let ctx = ActionContext::new(&next, Point2::origin()).with_selection(&plain_ids);
        assert!(matches!(action.on_coordinate(&ctx, Point2::origin()), ActionResult::Continue));
    }
}
