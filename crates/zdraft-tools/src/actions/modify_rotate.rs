//! 旋转 Action
//!
//! 参考 LibreCAD 的 RS_ActionModifyRotate 实现

use super::transform_each;
use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use zdraft_core::entity::EntityId;
use zdraft_core::geometry::{Geometry, Line};
use zdraft_core::math::{angle_of, Point2};
use zdraft_core::transform::rotate_entity;

/// 旋转状态
#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待选择对象
    SelectObjects,
    /// 等待指定旋转中心
    SetCenter,
    /// 等待指定参考角度（起始角度）
    SetReferenceAngle,
    /// 等待指定目标角度
    SetTargetAngle,
}

/// 旋转 Action
pub struct RotateAction {
    status: Status,
    /// 选中的实体 ID
    entity_ids: Vec<EntityId>,
    /// 旋转中心
    center: Option<Point2>,
    /// 参考角度（起始点）
    reference_point: Option<Point2>,
    /// 是否保留原对象（复制模式）
    copy_mode: bool,
}

impl RotateAction {
    pub fn new() -> Self {
        Self {
            status: Status::SelectObjects,
            entity_ids: Vec::new(),
            center: None,
            reference_point: None,
            copy_mode: false,
        }
    }

    fn commit(&mut self, ctx: &ActionContext, center: Point2, angle: f64) -> ActionResult {
        let entities: Vec<_> = self
            .entity_ids
            .iter()
            .filter_map(|id| ctx.document.get(*id))
            .collect();
        let result = transform_each(&entities, self.copy_mode, |e| Some(rotate_entity(e, center, angle)));
        self.reset();
        result.map_or(ActionResult::Cancel, ActionResult::Commit)
    }
}

impl Default for RotateAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for RotateAction {
    fn action_type(&self) -> ActionType {
        ActionType::Rotate
    }

    fn reset(&mut self) {
        self.status = Status::SelectObjects;
        self.entity_ids.clear();
        self.center = None;
        self.reference_point = None;
    }

    fn is_idle(&self) -> bool {
        self.status == Status::SelectObjects
    }

    fn wants_snap(&self) -> bool {
        self.status != Status::SelectObjects
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        match self.status {
            Status::SelectObjects => {
                let selected = ctx.selected();
                if selected.is_empty() {
                    return ActionResult::NeedSelection;
                }
                self.entity_ids = selected.iter().map(|e| e.id).collect();
                self.status = Status::SetCenter;
                ActionResult::Continue
            }
            Status::SetCenter => {
                self.center = Some(coord);
                self.status = Status::SetReferenceAngle;
                ActionResult::Continue
            }
            Status::SetReferenceAngle => {
                self.reference_point = Some(coord);
                self.status = Status::SetTargetAngle;
                ActionResult::Continue
            }
            Status::SetTargetAngle => match (self.center, self.reference_point) {
                (Some(center), Some(ref_point)) => {
                    let angle = angle_of(&center, &coord) - angle_of(&center, &ref_point);
                    self.commit(ctx, center, angle)
                }
                _ => ActionResult::Continue,
            },
        }
    }

    fn on_command(&mut self, _ctx: &ActionContext, cmd: &str) -> Option<ActionResult> {
        match cmd.to_uppercase().as_str() {
            "C" | "COPY" => {
                self.copy_mode = !self.copy_mode;
                Some(ActionResult::Continue)
            }
            _ => None,
        }
    }

    /// 直接输入旋转角度（度数）
    fn on_value(&mut self, ctx: &ActionContext, value: f64) -> ActionResult {
        if matches!(self.status, Status::SetReferenceAngle | Status::SetTargetAngle) {
            if let Some(center) = self.center {
                return self.commit(ctx, center, value.to_radians());
            }
        }
        ActionResult::Continue
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::SelectObjects => "选择要旋转的对象:",
            Status::SetCenter => "指定旋转中心:",
            Status::SetReferenceAngle => "指定旋转角度 或 [参考点/复制(C)]:",
            Status::SetTargetAngle => "指定新角度:",
        }
    }

    fn get_available_commands(&self) -> Vec<&str> {
        if self.status == Status::SetReferenceAngle {
            vec!["copy"]
        } else {
            vec![]
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        let mut previews = Vec::new();

        if let Some(center) = self.center {
            // 从中心到当前点的参考线
            previews.push(PreviewGeometry::reference(Geometry::Line(Line::new(
                center,
                ctx.effective_point(),
            ))));

            if let Some(ref_point) = self.reference_point {
                previews.push(PreviewGeometry::reference(Geometry::Line(Line::new(
                    center, ref_point,
                ))));
            }
        }

        previews
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{document_with, line};
    use zdraft_core::math::distance;

    #[test]
    fn test_rotate_by_reference_points() {
        let (doc, ids) = document_with(vec![line(1.0, 0.0, 5.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = RotateAction::new();

        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::new(1.0, 0.0));
        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(0.0, 3.0)) else {
            panic!("expected commit");
        };
        let Geometry::Line(l) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!(distance(&l.end, &Point2::new(0.0, 5.0)) < 1e-9);
    }

    #[test]
    fn test_rotate_by_value_in_copy_mode() {
        let (doc, ids) = document_with(vec![line(1.0, 0.0, 5.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = RotateAction::new();

        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::origin());
        action.on_command(&ctx, "c");
        let ActionResult::Commit(result) = action.on_value(&ctx, 180.0) else {
            panic!("expected commit");
        };
        assert!(result.remove_ids.is_empty());
        let Geometry::Line(l) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!(distance(&l.start, &Point2::new(-1.0, 0.0)) < 1e-9);
    }
}
