//! ZDraft 交互工具
//!
//! 每个编辑命令是一个状态机（Action），由 [`Session`] 驱动。
//! 不依赖任何界面库，点击、数值和命令行文本都可以直接喂给会话。

pub mod action;
pub mod actions;
pub mod command_registry;
pub mod input;
pub mod session;

pub use action::{Action, ActionContext, ActionResult, ActionType, MouseButton, PreviewGeometry};
pub use actions::create_action;
pub use command_registry::CommandRegistry;
pub use input::{parse_input, Input, ParseError};
pub use session::{Session, SessionError, UndoStack};
