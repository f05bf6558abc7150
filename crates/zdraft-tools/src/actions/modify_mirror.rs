//! 镜像 Action
//!
//! 参考 LibreCAD 的 RS_ActionModifyMirror 实现

use super::transform_each;
use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use zdraft_core::entity::EntityId;
use zdraft_core::geometry::{Geometry, Line};
use zdraft_core::math::{points_coincide, Point2, GEOMETRY_TOLERANCE};
use zdraft_core::transform::mirror_entity;

/// 镜像状态
#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待选择对象
    SelectObjects,
    /// 等待指定镜像线第一点
    SetPoint1,
    /// 等待指定镜像线第二点
    SetPoint2,
}

/// 镜像 Action
pub struct MirrorAction {
    status: Status,
    entity_ids: Vec<EntityId>,
    /// 镜像线第一点
    point1: Option<Point2>,
    /// 是否删除原对象
    delete_original: bool,
}

impl MirrorAction {
    pub fn new() -> Self {
        Self {
            status: Status::SelectObjects,
            entity_ids: Vec::new(),
            point1: None,
            delete_original: false,
        }
    }
}

impl Default for MirrorAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for MirrorAction {
    fn action_type(&self) -> ActionType {
        ActionType::Mirror
    }

    fn reset(&mut self) {
        self.status = Status::SelectObjects;
        self.entity_ids.clear();
        self.point1 = None;
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
                self.status = Status::SetPoint1;
                ActionResult::Continue
            }
            Status::SetPoint1 => {
                self.point1 = Some(coord);
                self.status = Status::SetPoint2;
                ActionResult::Continue
            }
            Status::SetPoint2 => {
                let Some(p1) = self.point1 else {
                    return ActionResult::Continue;
                };
                // 两点重合时镜像线无定义，等待重新指定第二点
                if points_coincide(&p1, &coord, GEOMETRY_TOLERANCE) {
                    return ActionResult::Continue;
                }
                let entities: Vec<_> = self
                    .entity_ids
                    .iter()
                    .filter_map(|id| ctx.document.get(*id))
                    .collect();
                let result = transform_each(&entities, !self.delete_original, |e| mirror_entity(e, p1, coord));
                self.reset();
                result.map_or(ActionResult::Cancel, ActionResult::Commit)
            }
        }
    }

    fn on_command(&mut self, _ctx: &ActionContext, cmd: &str) -> Option<ActionResult> {
        match cmd.to_uppercase().as_str() {
            "D" | "DELETE" => {
                self.delete_original = !self.delete_original;
                Some(ActionResult::Continue)
            }
            _ => None,
        }
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::SelectObjects => "选择要镜像的对象:",
            Status::SetPoint1 => "指定镜像线的第一点:",
            Status::SetPoint2 => "指定镜像线的第二点 或 [删除源对象(D)]:",
        }
    }

    fn get_available_commands(&self) -> Vec<&str> {
        if self.status == Status::SetPoint2 {
            vec!["delete"]
        } else {
            vec![]
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        let Some(p1) = self.point1 else {
            return vec![];
        };
        let p2 = ctx.effective_point();
        let mut previews = vec![PreviewGeometry::reference(Geometry::Line(Line::new(p1, p2)))];
        previews.extend(
            self.entity_ids
                .iter()
                .filter_map(|id| ctx.document.get(*id))
                .filter_map(|e| mirror_entity(e, p1, p2))
                .map(|e| PreviewGeometry::new(e.geometry)),
        );
        previews
    }
}
