//! 移动/复制 Action
//!
//! 参考 LibreCAD 的 RS_ActionModifyMove 实现

use super::transform_each;
use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use zdraft_core::entity::EntityId;
use zdraft_core::geometry::{Geometry, Line};
use zdraft_core::math::Point2;
use zdraft_core::transform::translate_entity;

/// 移动状态
#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待选择对象（如果没有预选）
    SelectObjects,
    /// 等待指定基点
    SetBasePoint,
    /// 等待指定目标点
    SetDestination,
}

/// 移动 Action；复制模式下保留原对象
pub struct MoveAction {
    status: Status,
    /// 选中的实体 ID
    entity_ids: Vec<EntityId>,
    /// 基点
    base_point: Option<Point2>,
    copy_mode: bool,
}

impl MoveAction {
    pub fn new() -> Self {
        Self {
            status: Status::SelectObjects,
            entity_ids: Vec::new(),
            base_point: None,
            copy_mode: false,
        }
    }

    /// 复制命令
    pub fn copy() -> Self {
        Self {
            copy_mode: true,
            ..Self::new()
        }
    }
}

impl Default for MoveAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for MoveAction {
    fn action_type(&self) -> ActionType {
        if self.copy_mode {
            ActionType::Copy
        } else {
            ActionType::Move
        }
    }

    fn reset(&mut self) {
        self.status = Status::SelectObjects;
        self.entity_ids.clear();
        self.base_point = None;
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
                self.status = Status::SetBasePoint;
                ActionResult::Continue
            }
            Status::SetBasePoint => {
                self.base_point = Some(coord);
                self.status = Status::SetDestination;
                ActionResult::Continue
            }
            Status::SetDestination => {
                let Some(base) = self.base_point else {
                    return ActionResult::Continue;
                };
                let delta = coord - base;
                let entities: Vec<_> = self
                    .entity_ids
                    .iter()
                    .filter_map(|id| ctx.document.get(*id))
                    .collect();
                let result = transform_each(&entities, self.copy_mode, |e| Some(translate_entity(e, delta)));
                self.reset();
                result.map_or(ActionResult::Cancel, ActionResult::Commit)
            }
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

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::SelectObjects => "选择要移动的对象:",
            Status::SetBasePoint => "指定基点 或 [复制(C)]:",
            Status::SetDestination => "指定第二个点:",
        }
    }

    fn get_available_commands(&self) -> Vec<&str> {
        if self.status == Status::SetBasePoint {
            vec!["copy"]
        } else {
            vec![]
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        match (&self.status, self.base_point) {
            (Status::SetDestination, Some(base)) => {
                let delta = ctx.effective_point() - base;
                let mut previews = vec![PreviewGeometry::reference(Geometry::Line(Line::new(
                    base,
                    ctx.effective_point(),
                )))];
                previews.extend(
                    self.entity_ids
                        .iter()
                        .filter_map(|id| ctx.document.get(*id))
                        .map(|e| PreviewGeometry::new(translate_entity(e, delta).geometry)),
                );
                previews
            }
            _ => vec![],
        }
    }
}
