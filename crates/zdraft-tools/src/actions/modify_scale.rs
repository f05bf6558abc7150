//! 缩放 Action
//!
//! 参考 LibreCAD 的 RS_ActionModifyScale 实现

use super::transform_each;
use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use tracing::debug;
use zdraft_core::entity::EntityId;
use zdraft_core::geometry::{Geometry, Line};
use zdraft_core::math::{distance, Point2, GEOMETRY_TOLERANCE};
use zdraft_core::transform::scale_entity;

/// 缩放状态
#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待选择对象
    SelectObjects,
    /// 等待指定缩放中心
    SetCenter,
    /// 等待指定参考距离（起始点）
    SetReferencePoint,
    /// 等待指定目标距离
    SetTargetPoint,
}

/// 缩放 Action
pub struct ScaleAction {
    status: Status,
    entity_ids: Vec<EntityId>,
    /// 缩放中心
    center: Option<Point2>,
    /// 参考点（用于计算初始距离）
    reference_point: Option<Point2>,
    copy_mode: bool,
}

impl ScaleAction {
    pub fn new() -> Self {
        Self {
            status: Status::SelectObjects,
            entity_ids: Vec::new(),
            center: None,
            reference_point: None,
            copy_mode: false,
        }
    }

    fn commit(&mut self, ctx: &ActionContext, center: Point2, factor: f64) -> ActionResult {
        if factor <= GEOMETRY_TOLERANCE || !factor.is_finite() {
            debug!("缩放比例 {} 无效", factor);
            return ActionResult::Continue;
        }
        let entities: Vec<_> = self
            .entity_ids
            .iter()
            .filter_map(|id| ctx.document.get(*id))
            .collect();
        let result = transform_each(&entities, self.copy_mode, |e| scale_entity(e, center, factor));
        self.reset();
        result.map_or(ActionResult::Cancel, ActionResult::Commit)
    }
}

impl Default for ScaleAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for ScaleAction {
    fn action_type(&self) -> ActionType {
        ActionType::Scale
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
                self.status = Status::SetReferencePoint;
                ActionResult::Continue
            }
            Status::SetReferencePoint => {
                self.reference_point = Some(coord);
                self.status = Status::SetTargetPoint;
                ActionResult::Continue
            }
            Status::SetTargetPoint => match (self.center, self.reference_point) {
                (Some(center), Some(ref_point)) => {
                    let ref_dist = distance(&center, &ref_point);
                    if ref_dist <= GEOMETRY_TOLERANCE {
                        return ActionResult::Continue;
                    }
                    self.commit(ctx, center, distance(&center, &coord) / ref_dist)
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

    /// 直接输入缩放比例
    fn on_value(&mut self, ctx: &ActionContext, value: f64) -> ActionResult {
        if matches!(self.status, Status::SetReferencePoint | Status::SetTargetPoint) {
            if let Some(center) = self.center {
                return self.commit(ctx, center, value);
            }
        }
        ActionResult::Continue
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::SelectObjects => "选择要缩放的对象:",
            Status::SetCenter => "指定缩放中心:",
            Status::SetReferencePoint => "指定缩放比例 或 [复制(C)]:",
            Status::SetTargetPoint => "指定第二点:",
        }
    }

    fn get_available_commands(&self) -> Vec<&str> {
        if self.status == Status::SetReferencePoint {
            vec!["copy"]
        } else {
            vec![]
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        let mut previews = Vec::new();
        if let Some(center) = self.center {
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

    #[test]
    fn test_scale_by_points() {
        let (doc, ids) = document_with(vec![line(0.0, 0.0, 10.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = ScaleAction::new();

        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::new(2.0, 0.0));
        let ActionResult::Commit(result) = action.on_coordinate(&ctx, Point2::new(0.0, 6.0)) else {
            panic!("expected commit");
        };
        let Geometry::Line(l) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!((l.end.x - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_factor_keeps_waiting() {
        let (doc, ids) = document_with(vec![line(0.0, 0.0, 10.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = ScaleAction::new();

        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::origin());
        assert!(matches!(action.on_value(&ctx, -2.0), ActionResult::Continue));
        assert!(!action.is_idle());
        assert!(matches!(action.on_value(&ctx, 0.5), ActionResult::Commit(_)));
    }
}
