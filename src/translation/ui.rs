//! 下拉菜单交互
//!
//! 把点击事件翻译成命令，菜单本身只记录是否展开。

/// 菜单事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
    /// 点击语言按钮
    ToggleClicked,
    /// 点击某个语言选项
    OptionClicked(String),
    /// 点击菜单以外的区域
    OutsideClicked,
}

/// 菜单产生的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    Select(String),
}

/// 语言选择菜单状态
#[derive(Debug, Clone, Default)]
pub struct SelectorMenu {
    open: bool,
}

impl SelectorMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn handle(&mut self, event: MenuEvent) -> Option<MenuCommand> {
        match event {
            MenuEvent::ToggleClicked => {
                self.open = !self.open;
                None
            }
            MenuEvent::OptionClicked(code) => {
                self.open = false;
                Some(MenuCommand::Select(code))
            }
            MenuEvent::OutsideClicked => {
                self.open = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_and_outside_click() {
        let mut menu = SelectorMenu::new();
        assert_eq!(menu.handle(MenuEvent::ToggleClicked), None);
        assert!(menu.is_open());

        assert_eq!(menu.handle(MenuEvent::OutsideClicked), None);
        assert!(!menu.is_open());
        assert_eq!(menu.handle(MenuEvent::OutsideClicked), None);
        assert!(!menu.is_open());
    }

    #[test]
    fn test_option_click_selects_and_closes() {
        let mut menu = SelectorMenu::new();
        menu.handle(MenuEvent::ToggleClicked);

        let command = menu.handle(MenuEvent::OptionClicked("sv".to_string()));
        assert_eq!(command, Some(MenuCommand::Select("sv".to_string())));
        assert!(!menu.is_open());
    }
}
