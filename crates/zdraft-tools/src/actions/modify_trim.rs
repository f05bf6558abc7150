//! 修剪 / 延伸 Action
//!
//! 所有可见实体都作为边界。每次点击处理一个对象，命令保持激活直到取消。

use crate::action::{Action, ActionContext, ActionResult, ActionType};
use tracing::debug;
use zdraft_core::math::Point2;
use zdraft_core::trim::{extend_entity, trim_entity};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Trim,
    Extend,
}

/// 修剪 / 延伸 Action
pub struct TrimAction {
    mode: Mode,
}

impl TrimAction {
    pub fn trim() -> Self {
        Self { mode: Mode::Trim }
    }

    pub fn extend() -> Self {
        Self { mode: Mode::Extend }
    }
}

impl Action for TrimAction {
    fn action_type(&self) -> ActionType {
        match self.mode {
            Mode::Trim => ActionType::Trim,
            Mode::Extend => ActionType::Extend,
        }
    }

    fn reset(&mut self) {}

    fn is_idle(&self) -> bool {
        true
    }

    fn wants_snap(&self) -> bool {
        false
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        let Some(target) = ctx.pick(&coord) else {
            return ActionResult::Continue;
        };
        let boundaries = ctx.document.visible_entities();
        let blocks = ctx.document.blocks();
        let result = match self.mode {
            Mode::Trim => trim_entity(target, coord, &boundaries, blocks),
            Mode::Extend => extend_entity(target, coord, &boundaries, blocks),
        };
        match result {
            Some(result) => ActionResult::Commit(result),
            None => {
                debug!("{} 对实体 {} 没有效果", self.action_type().name(), target.id);
                ActionResult::Continue
            }
        }
    }

    fn get_prompt(&self) -> &str {
        match self.mode {
            Mode::Trim => "选择要修剪的对象:",
            Mode::Extend => "选择要延伸的对象:",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{document_with, line};
    use zdraft_core::geometry::Geometry;
    use zdraft_core::math::points_coincide;

    #[test]
    fn test_trim_click_side() {
        let (doc, ids) = document_with(vec![line(0.0, 0.0, 10.0, 0.0), line(5.0, -5.0, 5.0, 5.0)]);
        let mut ctx = ActionContext::new(&doc, Point2::origin());
        // 默认容差会点中更靠上的边界线
        ctx.pick_tolerance = 1.0;
        let mut action = TrimAction::trim();

        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(2.0, 0.0)) else {
            panic!("expected commit");
        };
        assert_eq!(result.remove_ids, vec![ids[0]]);
        let Geometry::Line(kept) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!(points_coincide(&kept.start, &Point2::new(5.0, 0.0), 1e-9));
        assert!(points_coincide(&kept.end, &Point2::new(10.0, 0.0), 1e-9));
    }

    #[test]
    fn test_extend_to_boundary() {
        let (doc, _) = document_with(vec![line(0.0, 0.0, 4.0, 0.0), line(10.0, -5.0, 10.0, 5.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin());
        let mut action = TrimAction::extend();

        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(3.0, 0.0)) else {
            panic!("expected commit");
        };
        let Geometry::Line(extended) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!(points_coincide(&extended.end, &Point2::new(10.0, 0.0), 1e-9));
    }

    #[test]
    fn test_click_on_empty_space() {
        let (doc, _) = document_with(vec![line(0.0, 0.0, 10.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin());
        let mut action = TrimAction::trim();
        assert!(matches!(action.on_coordinate(&ctx, Point2::new(50.0, 50.0)), ActionResult::Continue));
    }
}
