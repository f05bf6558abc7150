//! 选择 Action
//!
//! 点中实体直接选中；点在空白处开始框选，第二点结束。
//! 从右向左拖为交叉选择，从左向右为窗口选择。

use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use zdraft_core::geometry::{Geometry, Rectangle};
use zdraft_core::math::Point2;
use zdraft_core::spatial::entities_in_box;

/// 选择状态
#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    /// 空闲，等待选择
    Idle,
    /// 正在框选
    BoxSelect { start: Point2 },
}

/// 选择 Action
pub struct SelectAction {
    status: Status,
}

impl SelectAction {
    pub fn new() -> Self {
        Self {
            status: Status::Idle,
        }
    }

    /// 是否正在框选
    pub fn is_box_selecting(&self) -> bool {
        matches!(self.status, Status::BoxSelect { .. })
    }
}

impl Default for SelectAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for SelectAction {
    fn action_type(&self) -> ActionType {
        ActionType::Select
    }

    fn reset(&mut self) {
        self.status = Status::Idle;
    }

    fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    fn wants_snap(&self) -> bool {
        false
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        match self.status {
            Status::Idle => {
                if let Some(entity) = ctx.pick(&coord) {
                    return ActionResult::Select(vec![entity.id]);
                }
                self.status = Status::BoxSelect { start: coord };
                ActionResult::Continue
            }
            Status::BoxSelect { start } => {
                self.status = Status::Idle;
                let editable = ctx.document.editable_entities();
                ActionResult::Select(entities_in_box(&editable, start, coord, ctx.document.blocks()))
            }
        }
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::Idle => "选择对象:",
            Status::BoxSelect { .. } => "指定对角点:",
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        match self.status {
            Status::BoxSelect { start } => vec![PreviewGeometry::reference(Geometry::Rectangle(
                Rectangle::from_corners(start, ctx.effective_point()),
            ))],
            Status::Idle => vec![],
        }
    }
}
