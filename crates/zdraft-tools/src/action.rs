//! Action 系统 - 参考 LibreCAD 的状态机设计
//!
//! 每个编辑工具是一个独立的 Action 实现，采用状态机模式处理用户交互。
//! Action 只计算结果，不修改文档；提交由 [`crate::session::Session`] 负责。

use zdraft_core::document::{Document, ModifyResult};
use zdraft_core::entity::{Entity, EntityId};
use zdraft_core::geometry::Geometry;
use zdraft_core::math::Point2;
use zdraft_core::settings::DEFAULT_PICK_TOLERANCE;
use zdraft_core::snap::apply_ortho;
use zdraft_core::spatial::pick_entity;

/// Action 执行结果
#[derive(Debug, Clone)]
pub enum ActionResult {
    /// 继续当前 action
    Continue,
    /// 提交编辑结果（调用方先保存撤销点再应用）
    Commit(ModifyResult),
    /// 替换当前选择集
    Select(Vec<EntityId>),
    /// 取消当前 action
    Cancel,
    /// 切换到另一个 action
    SwitchTo(ActionType),
    /// 需要选择实体
    NeedSelection,
}

/// Action 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    // 选择
    Select,

    // 变换
    Move,
    Copy,
    Rotate,
    Scale,
    Mirror,
    RectangularArray,
    PolarArray,

    // 修改
    Trim,
    Extend,
    Fillet,
    Chamfer,
    Offset,
    Explode,
}

impl ActionType {
    /// 获取 action 的名称
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Select => "Select",
            ActionType::Move => "Move",
            ActionType::Copy => "Copy",
            ActionType::Rotate => "Rotate",
            ActionType::Scale => "Scale",
            ActionType::Mirror => "Mirror",
            ActionType::RectangularArray => "Rectangular Array",
            ActionType::PolarArray => "Polar Array",
            ActionType::Trim => "Trim",
            ActionType::Extend => "Extend",
            ActionType::Fillet => "Fillet",
            ActionType::Chamfer => "Chamfer",
            ActionType::Offset => "Offset",
            ActionType::Explode => "Explode",
        }
    }

    /// 获取快捷键
    pub fn shortcut(&self) -> Option<&'static str> {
        match self {
            ActionType::Select => Some("Space"),
            ActionType::Move => Some("M"),
            ActionType::Copy => Some("CO"),
            ActionType::Rotate => Some("RO"),
            ActionType::Scale => Some("SC"),
            ActionType::Mirror => Some("MI"),
            ActionType::RectangularArray => Some("AR"),
            ActionType::PolarArray => Some("AP"),
            ActionType::Trim => Some("TR"),
            ActionType::Extend => Some("EX"),
            ActionType::Fillet => Some("F"),
            ActionType::Chamfer => Some("CHA"),
            ActionType::Offset => Some("O"),
            ActionType::Explode => Some("X"),
        }
    }
}

/// Action 上下文 - 传递给 Action 的运行时信息
pub struct ActionContext<'a> {
    /// 鼠标世界坐标
    pub mouse_pos: Point2,
    /// 捕捉后的坐标（如果有）
    pub snap_pos: Option<Point2>,
    /// 当前选中的实体
    pub selected_entities: &'a [EntityId],
    /// 当前文档
    pub document: &'a Document,
    /// 正交模式
    pub ortho_mode: bool,
    /// 参考点（用于正交、垂足、切点等）
    pub reference_point: Option<Point2>,
    /// 点选容差
    pub pick_tolerance: f64,
}

impl<'a> ActionContext<'a> {
    pub fn new(document: &'a Document, mouse_pos: Point2) -> Self {
        Self {
            mouse_pos,
            snap_pos: None,
            selected_entities: &[],
            document,
            ortho_mode: false,
            reference_point: None,
            pick_tolerance: DEFAULT_PICK_TOLERANCE,
        }
    }

    pub fn with_selection(mut self, selected: &'a [EntityId]) -> Self {
        self.selected_entities = selected;
        self
    }

    /// 获取有效点（优先使用捕捉点，其次是正交约束后的鼠标点）
    pub fn effective_point(&self) -> Point2 {
        if let Some(snap) = self.snap_pos {
            return snap;
        }
        match (self.ortho_mode, self.reference_point) {
            (true, Some(reference)) => apply_ortho(&reference, &self.mouse_pos),
            _ => self.mouse_pos,
        }
    }

    /// 点选一个可编辑实体（最上层优先）
    pub fn pick(&self, point: &Point2) -> Option<&'a Entity> {
        let editable = self.document.editable_entities();
        let id = pick_entity(&editable, point, self.pick_tolerance, self.document.blocks())?;
        self.document.get(id)
    }

    /// 选择集中仍然可编辑的实体
    pub fn selected(&self) -> Vec<&'a Entity> {
        self.selected_entities
            .iter()
            .filter_map(|id| self.document.get(*id))
            .filter(|e| self.document.is_editable(e))
            .collect()
    }
}

/// 预览几何体
#[derive(Debug, Clone)]
pub struct PreviewGeometry {
    pub geometry: Geometry,
    pub is_reference: bool, // 是否是参考线（虚线显示）
}

impl PreviewGeometry {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            is_reference: false,
        }
    }

    pub fn reference(geometry: Geometry) -> Self {
        Self {
            geometry,
            is_reference: true,
        }
    }
}

/// 鼠标按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Action trait - 所有编辑工具的核心接口
///
/// 参考 LibreCAD 的 RS_ActionInterface
pub trait Action: Send {
    /// 获取 action 类型
    fn action_type(&self) -> ActionType;

    /// 获取 action 名称
    fn name(&self) -> &str {
        self.action_type().name()
    }

    /// 重置 action 状态（取消时调用）
    fn reset(&mut self);

    // ========== 事件处理 ==========

    /// 鼠标移动事件
    fn on_mouse_move(&mut self, _ctx: &ActionContext) -> ActionResult {
        ActionResult::Continue
    }

    /// 鼠标点击事件
    ///
    /// 默认实现：左键按坐标输入处理；右键在首个状态取消，其它状态回到首个状态。
    fn on_mouse_click(&mut self, ctx: &ActionContext, button: MouseButton) -> ActionResult {
        match button {
            MouseButton::Left => {
                let point = ctx.effective_point();
                self.on_coordinate(ctx, point)
            }
            MouseButton::Right => {
                if self.is_idle() {
                    ActionResult::Cancel
                } else {
                    self.reset();
                    ActionResult::Continue
                }
            }
            MouseButton::Middle => ActionResult::Continue,
        }
    }

    /// 坐标输入事件（来自鼠标或命令行）
    fn on_coordinate(&mut self, ctx: &ActionContext, coord: Point2) -> ActionResult;

    /// 命令/子命令输入
    fn on_command(&mut self, _ctx: &ActionContext, _cmd: &str) -> Option<ActionResult> {
        None
    }

    /// 数值输入（半径、距离、角度等）
    fn on_value(&mut self, _ctx: &ActionContext, _value: f64) -> ActionResult {
        ActionResult::Continue
    }

    /// 是否处于首个状态
    fn is_idle(&self) -> bool;

    /// 当前状态是否输入点位
    ///
    /// 点选实体的状态返回 `false`，会话直接使用光标位置，不做捕捉、正交和极轴。
    fn wants_snap(&self) -> bool {
        true
    }

    // ========== UI 提示 ==========

    /// 获取当前状态的提示文本
    fn get_prompt(&self) -> &str;

    /// 获取当前可用的子命令
    fn get_available_commands(&self) -> Vec<&str> {
        vec![]
    }

    // ========== 预览 ==========

    /// 获取预览几何体
    fn get_preview(&self, _ctx: &ActionContext) -> Vec<PreviewGeometry> {
        vec![]
    }
}
