use crate::models::config::{KeyboardShortcut, ShortcutAction, ShortcutMap, ShortcutModifiers};

/// Matchar tangenttryck mot de konfigurerade genvägarna
pub struct ShortcutManager {
    shortcuts: ShortcutMap,
}

impl ShortcutManager {
    pub fn new(shortcuts: ShortcutMap) -> Self {
        Self { shortcuts }
    }

    pub fn update_shortcuts(&mut self, shortcuts: ShortcutMap) {
        self.shortcuts = shortcuts;
    }

    /// Första genväg som matchar aktuellt tangenttryck.
    ///
    /// Ingenting matchas medan inställningsvyn fångar en ny genväg. När ett
    /// textfält har fokus släpps bara Escape igenom (för att stänga dialoger).
    pub fn check(&self, ctx: &egui::Context, capturing: bool) -> Option<ShortcutAction> {
        if capturing {
            return None;
        }

        let text_focused = ctx.wants_keyboard_input();

        ctx.input(|input| {
            self.shortcuts
                .iter()
                .filter(|(_, s)| input.key_pressed(s.key) && s.matches(s.key, &input.modifiers))
                .map(|(action, s)| (*action, s))
                .find(|(action, s)| !text_focused || Self::passes_text_focus(*action, s))
                .map(|(action, _)| action)
        })
    }

    fn passes_text_focus(action: ShortcutAction, shortcut: &KeyboardShortcut) -> bool {
        action == ShortcutAction::CloseModal
            && shortcut.key == egui::Key::Escape
            && !shortcut.modifiers.ctrl_or_cmd
    }

    /// Visningssträng för en åtgärds genväg (för tooltips)
    pub fn shortcut_hint(&self, action: ShortcutAction) -> Option<String> {
        self.shortcuts.get(&action).map(|s| s.display())
    }

    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }
}

/// Åtgärder som delar tangentkombination med en annan åtgärd
pub fn conflicts(shortcuts: &ShortcutMap) -> Vec<(ShortcutAction, ShortcutAction)> {
    let mut found = Vec::new();
    for (i, a) in ShortcutAction::ALL.iter().enumerate() {
        for b in &ShortcutAction::ALL[i + 1..] {
            if let (Some(sa), Some(sb)) = (shortcuts.get(a), shortcuts.get(b)) {
                if sa == sb {
                    found.push((*a, *b));
                }
            }
        }
    }
    found
}

/// Fånga nästa tangenttryck som en ny genväg
pub fn capture_shortcut(ctx: &egui::Context) -> Option<KeyboardShortcut> {
    ctx.input(|input| {
        input.events.iter().find_map(|event| match event {
            egui::Event::Key {
                key,
                pressed: true,
                modifiers,
                ..
            } => Some(KeyboardShortcut {
                key: *key,
                modifiers: ShortcutModifiers {
                    ctrl_or_cmd: modifiers.command,
                    shift: modifiers.shift,
                    alt: modifiers.alt,
                },
            }),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::default_shortcuts;

    #[test]
    fn test_defaults_have_no_conflicts() {
        assert!(conflicts(&default_shortcuts()).is_empty());
    }

    #[test]
    fn test_conflict_is_reported_once() {
        let mut map = default_shortcuts();
        map.insert(ShortcutAction::AutoLayout, KeyboardShortcut::ctrl(egui::Key::N));

        let found = conflicts(&map);
        assert_eq!(found.len(), 1);
        let (a, b) = found[0];
        assert!([a, b].contains(&ShortcutAction::AutoLayout));
        assert!([a, b].contains(&ShortcutAction::NewForm));
    }

    #[test]
    fn test_hint_uses_display_form() {
        let manager = ShortcutManager::new(default_shortcuts());
        let hint = manager.shortcut_hint(ShortcutAction::CloseModal).unwrap();
        assert_eq!(hint, "Escape");
    }
}
