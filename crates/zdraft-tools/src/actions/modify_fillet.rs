//! 圆角 / 倒角 Action
//!
//! 先输入半径（或倒角距离），再依次点选两条直线。

use crate::action::{Action, ActionContext, ActionResult, ActionType};
use tracing::debug;
use zdraft_core::entity::EntityId;
use zdraft_core::fillet::{chamfer_lines, fillet_lines};
use zdraft_core::geometry::Geometry;
use zdraft_core::math::Point2;

#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待选择第一条直线
    SelectFirst,
    /// 等待选择第二条直线
    SelectSecond { first: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Fillet,
    Chamfer,
}

/// 圆角 / 倒角 Action
pub struct FilletAction {
    mode: Mode,
    status: Status,
    /// 圆角半径或倒角距离
    size: f64,
}

impl FilletAction {
    pub fn fillet() -> Self {
        Self {
            mode: Mode::Fillet,
            status: Status::SelectFirst,
            size: 0.0,
        }
    }

    pub fn chamfer() -> Self {
        Self {
            mode: Mode::Chamfer,
            ..Self::fillet()
        }
    }

    /// 当前半径或倒角距离
    pub fn size(&self) -> f64 {
        self.size
    }
}

impl Action for FilletAction {
    fn action_type(&self) -> ActionType {
        match self.mode {
            Mode::Fillet => ActionType::Fillet,
            Mode::Chamfer => ActionType::Chamfer,
        }
    }

    fn reset(&mut self) {
        self.status = Status::SelectFirst;
    }

    fn is_idle(&self) -> bool {
        self.status == Status::SelectFirst
    }

    fn wants_snap(&self) -> bool {
        false
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        let Some(picked) = ctx.pick(&coord) else {
            return ActionResult::Continue;
        };
        if !matches!(picked.geometry, Geometry::Line(_)) {
            debug!("只能对直线{}", self.action_type().name());
            return ActionResult::Continue;
        }

        match self.status {
            Status::SelectFirst => {
                self.status = Status::SelectSecond { first: picked.id };
                ActionResult::Continue
            }
            Status::SelectSecond { first } => {
                if first == picked.id {
                    return ActionResult::Continue;
                }
                let Some(first) = ctx.document.get(first) else {
                    self.reset();
                    return ActionResult::Continue;
                };
                let result = match self.mode {
                    Mode::Fillet => fillet_lines(first, picked, self.size),
                    Mode::Chamfer => chamfer_lines(first, picked, self.size),
                };
                self.reset();
                match result {
                    Some(result) => ActionResult::Commit(result),
                    None => {
                        debug!("{} 无解", self.action_type().name());
                        ActionResult::Continue
                    }
                }
            }
        }
    }

    /// 输入半径 / 倒角距离
    fn on_value(&mut self, _ctx: &ActionContext, value: f64) -> ActionResult {
        if value.is_finite() && value >= 0.0 {
            self.size = value;
        }
        ActionResult::Continue
    }

    fn get_prompt(&self) -> &str {
        match (self.mode, &self.status) {
            (Mode::Fillet, Status::SelectFirst) => "选择第一条直线 或 输入半径:",
            (Mode::Chamfer, Status::SelectFirst) => "选择第一条直线 或 输入倒角距离:",
            (_, Status::SelectSecond { .. }) => "选择第二条直线:",
        }
    }
}
