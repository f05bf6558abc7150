//! 阵列 Action（矩形 / 环形）
//!
//! 参数全部通过数值输入，环形阵列的中心用点指定。

use crate::action::{Action, ActionContext, ActionResult, ActionType, PreviewGeometry};
use tracing::debug;
use zdraft_core::document::ModifyResult;
use zdraft_core::entity::{Entity, EntityId};
use zdraft_core::math::{Point2, TAU};
use zdraft_core::transform::{polar_array, rectangular_array, PolarArray, RectangularArray};

/// 阵列状态
#[derive(Debug, Clone, PartialEq)]
enum Status {
    /// 等待选择对象
    SelectObjects,
    // 矩形阵列
    SetRows,
    SetColumns,
    SetRowSpacing,
    SetColumnSpacing,
    // 环形阵列
    SetCenter,
    SetCount,
    SetAngle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Rectangular,
    Polar,
}

/// 阵列 Action
pub struct ArrayAction {
    mode: Mode,
    status: Status,
    entity_ids: Vec<EntityId>,
    rectangular: RectangularArray,
    polar: PolarArray,
}

impl ArrayAction {
    /// 矩形阵列
    pub fn rectangular() -> Self {
        Self {
            mode: Mode::Rectangular,
            status: Status::SelectObjects,
            entity_ids: Vec::new(),
            rectangular: RectangularArray {
                rows: 1,
                columns: 1,
                row_spacing: 0.0,
                column_spacing: 0.0,
                angle: 0.0,
            },
            polar: PolarArray {
                center: Point2::origin(),
                count: 2,
                total_angle: TAU,
                rotate_items: true,
            },
        }
    }

    /// 环形阵列
    pub fn polar() -> Self {
        Self {
            mode: Mode::Polar,
            ..Self::rectangular()
        }
    }

    /// 记录选择集，进入第一个参数状态
    fn capture_selection(&mut self, ctx: &ActionContext) -> ActionResult {
        let selected = ctx.selected();
        if selected.is_empty() {
            return ActionResult::NeedSelection;
        }
        self.entity_ids = selected.iter().map(|e| e.id).collect();
        self.status = match self.mode {
            Mode::Rectangular => Status::SetRows,
            Mode::Polar => Status::SetCenter,
        };
        ActionResult::Continue
    }

    fn sources(&self, ctx: &ActionContext) -> Vec<Entity> {
        self.entity_ids
            .iter()
            .filter_map(|id| ctx.document.get(*id))
            .cloned()
            .collect()
    }

    fn copies(&self, ctx: &ActionContext) -> Vec<Entity> {
        let sources = self.sources(ctx);
        match self.mode {
            Mode::Rectangular => rectangular_array(&sources, &self.rectangular),
            Mode::Polar => polar_array(&sources, &self.polar),
        }
    }

    fn commit(&mut self, ctx: &ActionContext) -> ActionResult {
        let copies = self.copies(ctx);
        self.reset();
        if copies.is_empty() {
            debug!("阵列没有生成副本");
            return ActionResult::Cancel;
        }
        ActionResult::Commit(ModifyResult::added(copies))
    }
}

/// 数值转成项数；小于 1 或非有限值时返回 `None`
fn to_count(value: f64) -> Option<usize> {
    (value.is_finite() && value >= 1.0).then(|| value.round() as usize)
}

impl Action for ArrayAction {
    fn action_type(&self) -> ActionType {
        match self.mode {
            Mode::Rectangular => ActionType::RectangularArray,
            Mode::Polar => ActionType::PolarArray,
        }
    }

    fn reset(&mut self) {
        self.status = Status::SelectObjects;
        self.entity_ids.clear();
    }

    fn is_idle(&self) -> bool {
        self.status == Status::SelectObjects
    }

    fn wants_snap(&self) -> bool {
        self.status != Status::SelectObjects
    }

    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult {
        match self.status {
            Status::SelectObjects => self.capture_selection(ctx),
            Status::SetCenter => {
                self.polar.center = coord;
                self.status = Status::SetCount;
                ActionResult::Continue
            }
            _ => ActionResult::Continue,
        }
    }

    fn on_value(&mut self, ctx: &ActionContext, value: f64) -> ActionResult {
        match self.status {
            Status::SelectObjects => {
                // 先确认选择集，数值留给下一个状态
                match self.capture_selection(ctx) {
                    ActionResult::Continue => self.on_value(ctx, value),
                    other => other,
                }
            }
            Status::SetRows => {
                if let Some(rows) = to_count(value) {
                    self.rectangular.rows = rows;
                    self.status = Status::SetColumns;
                }
                ActionResult::Continue
            }
            Status::SetColumns => {
                if let Some(columns) = to_count(value) {
                    self.rectangular.columns = columns;
                    self.status = if self.rectangular.rows > 1 {
                        Status::SetRowSpacing
                    } else {
                        Status::SetColumnSpacing
                    };
                }
                ActionResult::Continue
            }
            Status::SetRowSpacing if value.is_finite() => {
                self.rectangular.row_spacing = value;
                if self.rectangular.columns > 1 {
                    self.status = Status::SetColumnSpacing;
                    ActionResult::Continue
                } else {
                    self.commit(ctx)
                }
            }
            Status::SetColumnSpacing if value.is_finite() => {
                self.rectangular.column_spacing = value;
                self.commit(ctx)
            }
            Status::SetCount => {
                if let Some(count) = to_count(value) {
                    self.polar.count = count;
                    self.status = Status::SetAngle;
                }
                ActionResult::Continue
            }
            Status::SetAngle if value.is_finite() && value != 0.0 => {
                self.polar.total_angle = value.to_radians();
                self.commit(ctx)
            }
            _ => ActionResult::Continue,
        }
    }

    fn on_command(&mut self, _ctx: &ActionContext, cmd: &str) -> Option<ActionResult> {
        match (self.mode, cmd.to_uppercase().as_str()) {
            (Mode::Polar, "R" | "ROTATE") => {
                self.polar.rotate_items = !self.polar.rotate_items;
                Some(ActionResult::Continue)
            }
            _ => None,
        }
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::SelectObjects => "选择要阵列的对象:",
            Status::SetRows => "输入行数:",
            Status::SetColumns => "输入列数:",
            Status::SetRowSpacing => "输入行间距:",
            Status::SetColumnSpacing => "输入列间距:",
            Status::SetCenter => "指定阵列中心点:",
            Status::SetCount => "输入项目总数:",
            Status::SetAngle => "指定填充角度 或 [旋转项目(R)]:",
        }
    }

    fn get_available_commands(&self) -> Vec<&str> {
        if self.mode == Mode::Polar && self.status == Status::SetAngle {
            vec!["rotate"]
        } else {
            vec![]
        }
    }

    fn get_preview(&self, ctx: &ActionContext) -> Vec<PreviewGeometry> {
        if matches!(self.status, Status::SetAngle | Status::SetColumnSpacing) {
            return self
                .copies(ctx)
                .into_iter()
                .map(|e| PreviewGeometry::new(e.geometry))
                .collect();
        }
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{document_with, line};
    use zdraft_core::geometry::Geometry;
    use zdraft_core::math::points_coincide;

    #[test]
    fn test_rectangular_array_from_values() {
        let (doc, ids) = document_with(vec![line(0.0, 0.0, 1.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = ArrayAction::rectangular();

        action.on_value(&ctx, 2.0);
        action.on_value(&ctx, 3.0);
        action.on_value(&ctx, 10.0);
        let ActionResult::Commit(result) = action.on_value(&ctx, 5.0) else {
            panic!("expected commit");
        };
        assert!(result.remove_ids.is_empty());
        assert_eq!(result.add_entities.len(), 5);
        assert!(action.is_idle());
    }

    #[test]
    fn test_single_row_skips_row_spacing() {
        let (doc, ids) = document_with(vec![line(0.0, 0.0, 1.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = ArrayAction::rectangular();

        action.on_value(&ctx, 1.0);
        action.on_value(&ctx, 4.0);
        let ActionResult::Commit(result) = action.on_value(&ctx, 2.0) else {
            panic!("expected commit");
        };
        assert_eq!(result.add_entities.len(), 3);
        let Geometry::Line(last) = &result.add_entities[2].geometry else {
            panic!("expected line");
        };
        assert!(points_coincide(&last.start, &Point2::new(6.0, 0.0), 1e-9));
    }

    #[test]
    fn test_polar_array_full_circle() {
        let (doc, ids) = document_with(vec![line(10.0, 0.0, 12.0, 0.0)]);
        let ctx = ActionContext::new(&doc, Point2::origin()).with_selection(&ids);
        let mut action = ArrayAction::polar();

        action.on_coordinate(&ctx, Point2::origin());
        action.on_coordinate(&ctx, Point2::origin());
        action.on_value(&ctx, 4.0);
        let ActionResult::Commit(result) = action.on_value(&ctx, 360.0) else {
            panic!("expected commit");
        };
        assert_eq!(result.add_entities.len(), 3);
        let Geometry::Line(first) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert!(points_coincide(&first.start, &Point2::new(0.0, 10.0), 1e-9));
    }
}
