#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Character(char),
    Escape,
    Delete,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutModifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl ShortcutModifiers {
    pub const fn new(ctrl: bool, shift: bool) -> Self {
        Self { ctrl, shift }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub context_menu_open: bool,
    pub gradient_area_active: bool,
    pub has_selection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
    DeleteSelection,
    ClearSelection,
    DismissContextMenu,
    CancelGradientArea,
}

fn resolve_escape(context: InputContext) -> Option<ShortcutAction> {
    if context.context_menu_open {
        Some(ShortcutAction::DismissContextMenu)
    } else if context.gradient_area_active {
        Some(ShortcutAction::CancelGradientArea)
    } else if context.has_selection {
        Some(ShortcutAction::ClearSelection)
    } else {
        None
    }
}

pub fn resolve_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
    context: InputContext,
) -> Option<ShortcutAction> {
    let key = match key {
        ShortcutKey::Character(c) => ShortcutKey::Character(c.to_ascii_lowercase()),
        other => other,
    };
    match (key, modifiers.ctrl, modifiers.shift) {
        (ShortcutKey::Character('z'), true, false) => Some(ShortcutAction::Undo),
        (ShortcutKey::Character('z'), true, true) | (ShortcutKey::Character('y'), true, false) => {
            Some(ShortcutAction::Redo)
        }
        (ShortcutKey::Delete, false, false) | (ShortcutKey::Backspace, false, false) => {
            context.has_selection.then_some(ShortcutAction::DeleteSelection)
        }
        (ShortcutKey::Escape, _, _) => resolve_escape(context),
        _ => None,
    }
}
