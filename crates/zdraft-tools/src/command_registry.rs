//! 命令注册表
//!
//! 参考 LibreCAD 的 RS_Commands 实现
//! 支持完整命令、快捷键、别名和 Tab 补全

use crate::action::ActionType;
use std::collections::HashMap;
use tracing::debug;

/// 命令注册表
///
/// 管理所有命令、快捷键和别名的映射；查找不区分大小写。
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    /// 完整命令 -> ActionType
    main_commands: HashMap<String, ActionType>,
    /// 快捷键/短命令 -> ActionType
    short_commands: HashMap<String, ActionType>,
    /// 用户别名 -> 完整命令
    aliases: HashMap<String, String>,
    /// ActionType -> 完整命令（反向查找）
    action_to_command: HashMap<ActionType, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            main_commands: HashMap::new(),
            short_commands: HashMap::new(),
            aliases: HashMap::new(),
            action_to_command: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        // 变换命令
        self.register(ActionType::Move, "MOVE", &["M"]);
        self.register(ActionType::Copy, "COPY", &["CO", "CP"]);
        self.register(ActionType::Rotate, "ROTATE", &["RO"]);
        self.register(ActionType::Scale, "SCALE", &["SC"]);
        self.register(ActionType::Mirror, "MIRROR", &["MI"]);
        self.register(ActionType::RectangularArray, "ARRAYRECT", &["AR", "ARRAY"]);
        self.register(ActionType::PolarArray, "ARRAYPOLAR", &["AP"]);

        // 修改命令
        self.register(ActionType::Trim, "TRIM", &["TR"]);
        self.register(ActionType::Extend, "EXTEND", &["EX"]);
        self.register(ActionType::Fillet, "FILLET", &["F"]);
        self.register(ActionType::Chamfer, "CHAMFER", &["CHA"]);
        self.register(ActionType::Offset, "OFFSET", &["O"]);
        self.register(ActionType::Explode, "EXPLODE", &["X"]);

        // 选择
        self.register(ActionType::Select, "SELECT", &["SEL"]);
    }

    /// 注册命令
    ///
    /// # 参数
    /// - `action`: ActionType
    /// - `full_cmd`: 完整命令名（如 "TRIM"）
    /// - `shortcuts`: 快捷键/短命令列表（如 ["TR"]）
    pub fn register(&mut self, action: ActionType, full_cmd: &str, shortcuts: &[&str]) {
        let full_cmd = full_cmd.to_uppercase();
        self.main_commands.insert(full_cmd.clone(), action);
        self.action_to_command.insert(action, full_cmd);
        for shortcut in shortcuts {
            self.short_commands.insert(shortcut.to_uppercase(), action);
        }
    }

    /// 查找命令对应的 ActionType
    ///
    /// 依次查完整命令、快捷键、别名。
    pub fn lookup(&self, input: &str) -> Option<ActionType> {
        let input = input.trim().to_uppercase();
        self.main_commands
            .get(&input)
            .or_else(|| self.short_commands.get(&input))
            .copied()
            .or_else(|| {
                self.aliases
                    .get(&input)
                    .and_then(|cmd| self.main_commands.get(cmd).copied())
            })
    }

    /// Tab 补全：返回所有以 prefix 开头的完整命令（已排序）
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_uppercase();
        let mut results: Vec<String> = self
            .main_commands
            .keys()
            .filter(|cmd| cmd.starts_with(&prefix))
            .cloned()
            .collect();
        results.sort();
        results
    }

    /// 获取命令的完整名称
    pub fn command_name(&self, action: ActionType) -> Option<&str> {
        self.action_to_command.get(&action).map(String::as_str)
    }

    /// 添加用户别名
    ///
    /// 别名不能覆盖已有命令，目标命令必须存在；成功时返回 `true`。
    pub fn add_alias(&mut self, alias: &str, command: &str) -> bool {
        let alias = alias.to_uppercase();
        let command = command.to_uppercase();
        if self.main_commands.contains_key(&alias) || self.short_commands.contains_key(&alias) {
            debug!("别名 {} 与已有命令冲突", alias);
            return false;
        }
        if !self.main_commands.contains_key(&command) {
            debug!("别名目标 {} 不存在", command);
            return false;
        }
        self.aliases.insert(alias, command);
        true
    }

    /// 移除别名
    pub fn remove_alias(&mut self, alias: &str) {
        self.aliases.remove(&alias.to_uppercase());
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = CommandRegistry::new();

        // 完整命令
        assert_eq!(registry.lookup("TRIM"), Some(ActionType::Trim));
        assert_eq!(registry.lookup("fillet"), Some(ActionType::Fillet));

        // 快捷键
        assert_eq!(registry.lookup("tr"), Some(ActionType::Trim));
        assert_eq!(registry.lookup("AP"), Some(ActionType::PolarArray));

        // 不存在的命令
        assert_eq!(registry.lookup("NOTEXIST"), None);
    }

    #[test]
    fn test_every_action_has_a_command() {
        let registry = CommandRegistry::new();
        for action in [
            ActionType::Select,
            ActionType::Move,
            ActionType::Copy,
            ActionType::Rotate,
            ActionType::Scale,
            ActionType::Mirror,
            ActionType::RectangularArray,
            ActionType::PolarArray,
            ActionType::Trim,
            ActionType::Extend,
            ActionType::Fillet,
            ActionType::Chamfer,
            ActionType::Offset,
            ActionType::Explode,
        ] {
            let name = registry.command_name(action).unwrap();
            assert_eq!(registry.lookup(name), Some(action));
        }
    }

    #[test]
    fn test_complete() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.complete("arr"), vec!["ARRAYPOLAR", "ARRAYRECT"]);
        assert_eq!(registry.complete("EX"), vec!["EXPLODE", "EXTEND"]);
    }

    #[test]
    fn test_alias() {
        let mut registry = CommandRegistry::new();

        assert!(registry.add_alias("FF", "FILLET"));
        assert_eq!(registry.lookup("ff"), Some(ActionType::Fillet));
        assert!(!registry.add_alias("TR", "FILLET"));
        assert!(!registry.add_alias("ZZ", "NOPE"));

        registry.remove_alias("FF");
        assert_eq!(registry.lookup("FF"), None);
    }
}
