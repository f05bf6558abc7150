//! 编辑会话
//!
//! 持有当前文档、选择集、撤销栈和激活的 Action。
//! 鼠标点击、数值和命令行文本都从这里进入 Action，
//! Action 返回的编辑结果先保存撤销点，再应用到文档。

use crate::action::{Action, ActionContext, ActionResult, ActionType, MouseButton, PreviewGeometry};
use crate::actions::create_action;
use crate::command_registry::CommandRegistry;
use crate::input::{parse_input, Input, ParseError};
use thiserror::Error;
use tracing::{debug, info};
use zdraft_core::document::{Document, ModifyResult};
use zdraft_core::entity::EntityId;
use zdraft_core::math::Point2;
use zdraft_core::settings::KernelSettings;
use zdraft_core::snap::{polar_snap, PolarSettings, SnapEngine};

/// 会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("未知命令: {0}")]
    UnknownCommand(String),
}

/// 撤销栈
///
/// 保存完整快照；新的检查点会清空重做历史。
#[derive(Debug, Clone)]
pub struct UndoStack<T> {
    undo: Vec<T>,
    redo: Vec<T>,
    /// 最多保留的撤销步数，`None` 表示不限
    limit: Option<usize>,
}

impl<T> UndoStack<T> {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: None,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new()
        }
    }

    /// 保存修改前的状态
    pub fn checkpoint(&mut self, state: T) {
        self.redo.clear();
        self.undo.push(state);
        if let Some(limit) = self.limit {
            if self.undo.len() > limit {
                self.undo.remove(0);
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// 撤销：返回上一个状态，`current` 进入重做历史
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// 重做：返回下一个状态，`current` 回到撤销历史
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl<T> Default for UndoStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 编辑会话
pub struct Session {
    document: Document,
    history: UndoStack<Document>,
    selection: Vec<EntityId>,
    snap: SnapEngine,
    polar: PolarSettings,
    pick_tolerance: f64,
    registry: CommandRegistry,
    action: Box<dyn Action>,
    /// 上一次输入的点（相对坐标、正交和极轴的基准）
    last_point: Option<Point2>,
}

impl Session {
    pub fn new(document: Document, settings: KernelSettings) -> Self {
        let settings = settings.validate();
        Self {
            document,
            history: UndoStack::new(),
            selection: Vec::new(),
            snap: SnapEngine::new(settings.snap, settings.grid),
            polar: settings.polar,
            pick_tolerance: settings.pick_tolerance,
            registry: CommandRegistry::new(),
            action: create_action(ActionType::Select),
            last_point: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &[EntityId] {
        &self.selection
    }

    pub fn set_selection(&mut self, ids: Vec<EntityId>) {
        self.selection = ids;
    }

    pub fn snap_engine_mut(&mut self) -> &mut SnapEngine {
        &mut self.snap
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &UndoStack<Document> {
        &self.history
    }

    pub fn action_type(&self) -> ActionType {
        self.action.action_type()
    }

    /// 当前提示文本
    pub fn prompt(&self) -> &str {
        self.action.get_prompt()
    }

    /// 切换到新的 Action
    pub fn start_action(&mut self, action_type: ActionType) {
        info!("开始命令: {}", action_type.name());
        self.action = create_action(action_type);
        self.last_point = None;
    }

    /// 取消当前 Action，回到选择
    pub fn cancel(&mut self) {
        self.action.reset();
        if self.action.action_type() != ActionType::Select {
            self.start_action(ActionType::Select);
        }
    }

    /// 计算光标位置的捕捉点：先对象捕捉（含网格），再极轴追踪（启用时）
    pub fn snap_point(&mut self, cursor: Point2) -> Option<Point2> {
        let visible = self.document.visible_entities();
        let snapped = self.snap.find_snap_point(
            cursor,
            &visible,
            self.document.blocks(),
            self.pick_tolerance,
            self.last_point,
        );
        if let Some(snap) = snapped {
            debug!("捕捉到 {:?} ({:.3}, {:.3})", snap.snap_type, snap.point.x, snap.point.y);
            return Some(snap.point);
        }
        let start = self.last_point?;
        polar_snap(&start, &cursor, &self.polar).map(|p| p.point)
    }

    /// 鼠标点击
    ///
    /// 点位输入状态使用捕捉点；点选实体的状态使用原始光标，也不更新上一点。
    pub fn click(&mut self, cursor: Point2, button: MouseButton) -> ActionResult {
        let wants_snap = self.action.wants_snap();
        let snap_pos = if wants_snap { self.snap_point(cursor) } else { None };
        let mut point = cursor;
        let result = self.dispatch(cursor, snap_pos, |action, ctx| {
            point = ctx.effective_point();
            action.on_mouse_click(ctx, button)
        });
        if button == MouseButton::Left && wants_snap {
            self.last_point = Some(point);
        }
        self.handle(result)
    }

    /// 数值输入
    pub fn value(&mut self, value: f64) -> ActionResult {
        let cursor = self.last_point.unwrap_or_else(Point2::origin);
        let result = self.dispatch(cursor, None, |action, ctx| action.on_value(ctx, value));
        self.handle(result)
    }

    /// 执行一行命令行输入
    ///
    /// 坐标和数值交给当前 Action；文本先作为子命令，再查命令表；
    /// `UNDO`/`U` 和 `REDO` 由会话处理。
    pub fn execute(&mut self, text: &str) -> Result<ActionResult, SessionError> {
        match parse_input(text, self.last_point)? {
            Input::Point(point) => {
                let result = self.dispatch(point, None, |action, ctx| action.on_coordinate(ctx, point));
                self.last_point = Some(point);
                Ok(self.handle(result))
            }
            Input::Value(value) => Ok(self.value(value)),
            Input::Angle(angle) => Ok(self.value(angle.to_degrees())),
            Input::Command(command) => self.command(&command),
        }
    }

    fn command(&mut self, command: &str) -> Result<ActionResult, SessionError> {
        match command {
            "UNDO" | "U" => {
                self.undo();
                return Ok(ActionResult::Continue);
            }
            "REDO" => {
                self.redo();
                return Ok(ActionResult::Continue);
            }
            _ => {}
        }

        let cursor = self.last_point.unwrap_or_else(Point2::origin);
        if let Some(result) = self.dispatch(cursor, None, |action, ctx| action.on_command(ctx, command)) {
            return Ok(self.handle(result));
        }

        let action_type = self
            .registry
            .lookup(command)
            .ok_or_else(|| SessionError::UnknownCommand(command.to_string()))?;
        self.start_action(action_type);
        Ok(ActionResult::SwitchTo(action_type))
    }

    /// 当前 Action 的预览
    pub fn preview(&mut self, cursor: Point2) -> Vec<PreviewGeometry> {
        let snap_pos = if self.action.wants_snap() { self.snap_point(cursor) } else { None };
        self.dispatch(cursor, snap_pos, |action, ctx| action.get_preview(ctx))
    }

    /// 撤销；没有可撤销的步骤时返回 `false`
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.document.clone()) {
            Some(previous) => {
                self.document = previous;
                self.selection.clear();
                info!("撤销，剩余 {} 步", self.history.len());
                true
            }
            None => false,
        }
    }

    /// 重做；没有可重做的步骤时返回 `false`
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.document.clone()) {
            Some(next) => {
                self.document = next;
                self.selection.clear();
                info!("重做");
                true
            }
            None => false,
        }
    }

    /// 保存撤销点并应用编辑结果
    pub fn commit(&mut self, result: &ModifyResult) {
        if result.is_empty() {
            return;
        }
        let next = self.document.apply(result);
        let previous = std::mem::replace(&mut self.document, next);
        self.history.checkpoint(previous);
        self.selection.clear();
        info!(
            "{}: 删除 {} 个实体，新增 {} 个实体",
            self.action.name(),
            result.remove_ids.len(),
            result.add_entities.len()
        );
    }

    /// 用当前输入状态构造上下文并交给 Action
    ///
    /// 上下文只借用文档和选择集，Action 可以同时被可变借用。
    fn dispatch<R>(
        &mut self,
        cursor: Point2,
        snap_pos: Option<Point2>,
        f: impl FnOnce(&mut dyn Action, &ActionContext) -> R,
    ) -> R {
        let mut ctx = ActionContext::new(&self.document, cursor).with_selection(&self.selection);
        ctx.snap_pos = snap_pos;
        ctx.ortho_mode = self.snap.settings().ortho && self.action.wants_snap();
        ctx.reference_point = self.last_point;
        ctx.pick_tolerance = self.pick_tolerance;
        f(self.action.as_mut(), &ctx)
    }

    fn handle(&mut self, result: ActionResult) -> ActionResult {
        match &result {
            ActionResult::Continue => {}
            ActionResult::Commit(modify) => self.commit(modify),
            ActionResult::Select(ids) => {
                debug!("选中 {} 个实体", ids.len());
                self.selection = ids.clone();
            }
            ActionResult::Cancel => self.cancel(),
            ActionResult::SwitchTo(action_type) => self.start_action(*action_type),
            ActionResult::NeedSelection => {
                debug!("{} 需要先选择对象", self.action.name());
            }
        }
        result
    }
}
