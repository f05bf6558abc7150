//! 偏移 Action
//!
//! 输入距离后可以连续偏移多个对象：选对象，再点一下偏移的一侧。

use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use tracing::debug;
use zdraft_core::document::ModifyResult;
use zdraft_core::entity::EntityId;
use zdraft_core::math::Point2;
use zdraft_core::offset::offset_entity;

#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待输入偏移距离
    SetDistance,
    /// 等待选择要偏移的对象
    SelectObject,
    /// 等待指定偏移的一侧
    SetSide { entity_id: EntityId },
}

/// 偏移 Action
pub struct OffsetAction {
    status: Status,
    distance: Option<f64>,
}

impl OffsetAction {
    pub fn new() -> Self {
        Self {
            status: Status::SetDistance,
            distance: None,
        }
    }
}

impl Default for OffsetAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for OffsetAction {
    fn action_type(&self) -> ActionType {
        ActionType::Offset
    }

    /// 保留已输入的距离
    fn reset(&mut self) {
        self.status = if self.distance.is_some() {
            Status::SelectObject
        } else {
            Status::SetDistance
        };
    }

    fn is_idle(&self) -> bool {
        !matches!(self.status, Status::SetSide { .. })
    }

    fn wants_snap(&self) -> bool {
        matches!(self.status, Status::SetSide { .. })
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        match (self.status.clone(), self.distance) {
            (Status::SetDistance, _) => ActionResult::Continue,
            (Status::SelectObject, _) => {
                if let Some(entity) = ctx.pick(&coord) {
                    self.status = Status::SetSide { entity_id: entity.id };
                }
                ActionResult::Continue
            }
            (Status::SetSide { entity_id }, Some(distance)) => {
                let offset = ctx
                    .document
                    .get(entity_id)
                    .and_then(|e| offset_entity(e, distance, coord));
                self.status = Status::SelectObject;
                match offset {
                    Some(entity) => ActionResult::Commit(ModifyResult::added(vec![entity])),
                    None => {
                        debug!("实体 {} 无法偏移", entity_id);
                        ActionResult::Continue
                    }
                }
            }
            (Status::SetSide { .. }, None) => {
                self.status = Status::SetDistance;
                ActionResult::Continue
            }
        }
    }

    fn on_value(&mut self, _ctx: &ActionContext, value: f64) -> ActionResult {
        if value.is_finite() && value > 0.0 {
            self.distance = Some(value);
            if self.status == Status::SetDistance {
                self.status = Status::SelectObject;
            }
        }
        ActionResult::Continue
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::SetDistance => "指定偏移距离:",
            Status::SelectObject => "选择要偏移的对象:",
            Status::SetSide { .. } => "指定要偏移的那一侧上的点:",
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        match (&self.status, self.distance) {
            (Status::SetSide { entity_id }, Some(distance)) => ctx
                .document
                .get(*entity_id)
                .and_then(|e| offset_entity(e, distance, ctx.effective_point()))
                .map(|e| vec![PreviewGeometry::new(e.geometry)])
                .unwrap_or_default(),
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{document_with, line};
    use zdraft_core::entity::Entity;
    use zdraft_core::geometry::{Circle, Geometry};

    #[test]
    fn test_offset_line_then_circle() {
        let circle = Entity::new(Geometry::Circle(Circle::new(Point2::new(50.0, 50.0), 10.0)));
        let (doc, _) = document_with(vec![line(0.0, 0.0, 10.0, 0.0), circle]);
        let ctx = ActionContext::new(&doc, Point2::origin());
        let mut action = OffsetAction::new();

        // 未输入距离前点击无效
        action.on_coordinate(&ctx, Point2::new(5.0, 0.0));
        assert_eq!(action.get_prompt(), "指定偏移距离:");

        action.on_value(&ctx, 3.0);
        action.on_coordinate(&ctx, Point2::new(5.0, 0.0));
        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(5.0, 8.0)) else {
            panic!("expected commit");
        };
        assert!(result.remove_ids.is_empty());
        let Geometry::Line(l) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!((l.start.y - 3.0).abs() < 1e-9);

        // 距离保留，继续偏移下一个对象
        action.on_coordinate(&ctx, Point2::new(60.0, 50.0));
        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(50.0, 50.0)) else {
            panic!("expected commit");
        };
        let Geometry::Circle(c) = &result.add_entities[0].geometry else {
            panic!("expected circle");
        };
        assert!((c.radius - 7.0).abs() < 1e-9);
    }
}
