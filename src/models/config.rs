use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::path::get_settings_path;

// ============================================================
// Kortkommandon
// ============================================================

/// Åtgärd som kan bindas till en tangentkombination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    NavigateDashboard,
    NavigateForms,
    NavigateTrees,
    NavigateQuestionnaire,
    NavigateSettings,
    NewForm,
    AutoLayout,
    CloseModal,
    ToggleDarkMode,
}

impl ShortcutAction {
    pub const ALL: &'static [Self] = &[
        Self::NavigateDashboard,
        Self::NavigateForms,
        Self::NavigateTrees,
        Self::NavigateQuestionnaire,
        Self::NavigateSettings,
        Self::NewForm,
        Self::AutoLayout,
        Self::CloseModal,
        Self::ToggleDarkMode,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NavigateDashboard => "Dashboard",
            Self::NavigateForms => "Formulär",
            Self::NavigateTrees => "Fadderträd",
            Self::NavigateQuestionnaire => "Fyll i enkät",
            Self::NavigateSettings => "Inställningar",
            Self::NewForm => "Nytt formulär",
            Self::AutoLayout => "Autolayout av träd",
            Self::CloseModal => "Stäng dialog",
            Self::ToggleDarkMode => "Mörkt/ljust läge",
        }
    }

    fn settings_key(&self) -> &'static str {
        match self {
            Self::NavigateDashboard => "navigate_dashboard",
            Self::NavigateForms => "navigate_forms",
            Self::NavigateTrees => "navigate_trees",
            Self::NavigateQuestionnaire => "navigate_questionnaire",
            Self::NavigateSettings => "navigate_settings",
            Self::NewForm => "new_form",
            Self::AutoLayout => "auto_layout",
            Self::CloseModal => "close_modal",
            Self::ToggleDarkMode => "toggle_dark_mode",
        }
    }

    fn from_settings_key(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.settings_key() == s)
    }
}

/// Modifierare (Ctrl på Linux/Windows, Cmd på macOS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutModifiers {
    pub ctrl_or_cmd: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardShortcut {
    pub key: egui::Key,
    pub modifiers: ShortcutModifiers,
}

impl KeyboardShortcut {
    pub fn ctrl(key: egui::Key) -> Self {
        Self {
            key,
            modifiers: ShortcutModifiers { ctrl_or_cmd: true, ..Default::default() },
        }
    }

    pub fn plain(key: egui::Key) -> Self {
        Self {
            key,
            modifiers: ShortcutModifiers::default(),
        }
    }

    fn modifier_names(&self, mac_names: bool) -> Vec<&'static str> {
        let mut parts = Vec::new();
        if self.modifiers.ctrl_or_cmd {
            parts.push(if mac_names { "Cmd" } else { "Ctrl" });
        }
        if self.modifiers.alt {
            parts.push("Alt");
        }
        if self.modifiers.shift {
            parts.push("Shift");
        }
        parts
    }

    /// Visningstext, t.ex. "Ctrl+N" (eller "Cmd+N" på macOS)
    pub fn display(&self) -> String {
        let mut parts = self.modifier_names(cfg!(target_os = "macos"));
        parts.push(self.key.name());
        parts.join("+")
    }

    /// Plattformsoberoende form för inställningsfilen
    fn to_settings_string(&self) -> String {
        let mut parts = self.modifier_names(false);
        parts.push(self.key.name());
        parts.join("+")
    }

    fn parse(s: &str) -> Option<Self> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = egui::Key::from_name(parts.pop()?)?;

        let mut modifiers = ShortcutModifiers::default();
        for part in parts {
            match part {
                "Ctrl" | "Cmd" => modifiers.ctrl_or_cmd = true,
                "Shift" => modifiers.shift = true,
                "Alt" => modifiers.alt = true,
                _ => return None,
            }
        }

        Some(Self { key, modifiers })
    }

    pub fn matches(&self, key: egui::Key, modifiers: &egui::Modifiers) -> bool {
        self.key == key
            && self.modifiers.ctrl_or_cmd == modifiers.command
            && self.modifiers.shift == modifiers.shift
            && self.modifiers.alt == modifiers.alt
    }
}

pub type ShortcutMap = HashMap<ShortcutAction, KeyboardShortcut>;

pub fn default_shortcuts() -> ShortcutMap {
    use egui::Key;

    ShortcutMap::from([
        (ShortcutAction::NavigateDashboard, KeyboardShortcut::ctrl(Key::Num1)),
        (ShortcutAction::NavigateForms, KeyboardShortcut::ctrl(Key::Num2)),
        (ShortcutAction::NavigateTrees, KeyboardShortcut::ctrl(Key::Num3)),
        (ShortcutAction::NavigateQuestionnaire, KeyboardShortcut::ctrl(Key::Num4)),
        (ShortcutAction::NavigateSettings, KeyboardShortcut::ctrl(Key::Comma)),
        (ShortcutAction::NewForm, KeyboardShortcut::ctrl(Key::N)),
        (ShortcutAction::AutoLayout, KeyboardShortcut::ctrl(Key::L)),
        (ShortcutAction::CloseModal, KeyboardShortcut::plain(Key::Escape)),
        (ShortcutAction::ToggleDarkMode, KeyboardShortcut::ctrl(Key::D)),
    ])
}

// ============================================================
// Appinställningar (settings.toml)
// ============================================================

/// Inställningar som sparas i konfigurationsfilen, inte i databasen
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub dark_mode: bool,
    pub window_width: f32,
    pub window_height: f32,
    /// Namn som registreras som författare på nya träd
    pub operator_name: String,
    /// Ritytans storlek som autolayout fördelar noderna över
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub shortcuts: ShortcutMap,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            window_width: 1280.0,
            window_height: 800.0,
            operator_name: String::new(),
            canvas_width: 1200.0,
            canvas_height: 800.0,
            shortcuts: default_shortcuts(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        let path = get_settings_path();

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ogiltig inställningsfil {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = get_settings_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        tracing::info!("Sparade inställningar till {:?}", path);
        Ok(())
    }

    /// Författar-id för nya träd
    pub fn author_id(&self) -> String {
        let name = self.operator_name.trim();
        if name.is_empty() {
            "okänd".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Filformat: genvägar sparas som action-nyckel -> "Ctrl+N"
#[derive(Serialize, Deserialize)]
struct SettingsFile {
    dark_mode: Option<bool>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    operator_name: Option<String>,
    canvas_width: Option<f32>,
    canvas_height: Option<f32>,
    shortcuts: Option<HashMap<String, String>>,
}

impl Serialize for AppSettings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let shortcuts = self
            .shortcuts
            .iter()
            .map(|(action, shortcut)| {
                (action.settings_key().to_string(), shortcut.to_settings_string())
            })
            .collect();

        SettingsFile {
            dark_mode: Some(self.dark_mode),
            window_width: Some(self.window_width),
            window_height: Some(self.window_height),
            operator_name: Some(self.operator_name.clone()),
            canvas_width: Some(self.canvas_width),
            canvas_height: Some(self.canvas_height),
            shortcuts: Some(shortcuts),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AppSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let file = SettingsFile::deserialize(deserializer)?;
        let defaults = AppSettings::default();

        // Sparade genvägar skriver över standardvärdena
        let mut shortcuts = defaults.shortcuts;
        for (key, value) in file.shortcuts.unwrap_or_default() {
            if let (Some(action), Some(shortcut)) =
                (ShortcutAction::from_settings_key(&key), KeyboardShortcut::parse(&value))
            {
                shortcuts.insert(action, shortcut);
            }
        }

        Ok(AppSettings {
            dark_mode: file.dark_mode.unwrap_or(defaults.dark_mode),
            window_width: file.window_width.unwrap_or(defaults.window_width),
            window_height: file.window_height.unwrap_or(defaults.window_height),
            operator_name: file.operator_name.unwrap_or(defaults.operator_name),
            canvas_width: file.canvas_width.unwrap_or(defaults.canvas_width),
            canvas_height: file.canvas_height.unwrap_or(defaults.canvas_height),
            shortcuts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_string_roundtrip() {
        let shortcut = KeyboardShortcut::ctrl(egui::Key::L);
        assert_eq!(shortcut.to_settings_string(), "Ctrl+L");
        assert_eq!(KeyboardShortcut::parse("Ctrl+L"), Some(shortcut));

        let escape = KeyboardShortcut::plain(egui::Key::Escape);
        assert_eq!(escape.to_settings_string(), "Escape");
        assert_eq!(KeyboardShortcut::parse("Escape"), Some(escape));
    }

    #[test]
    fn test_shortcut_parse_rejects_unknown_modifier() {
        assert_eq!(KeyboardShortcut::parse("Hyper+L"), None);
        assert_eq!(KeyboardShortcut::parse("Ctrl+NotAKey"), None);
    }

    #[test]
    fn test_defaults_cover_all_actions() {
        let defaults = default_shortcuts();
        for action in ShortcutAction::ALL {
            assert!(defaults.contains_key(action), "Saknar genväg för {:?}", action);
        }
    }

    #[test]
    fn test_settings_toml_roundtrip() {
        let mut settings = AppSettings::default();
        settings.operator_name = "Styrelsen".into();
        settings.shortcuts.insert(
            ShortcutAction::AutoLayout,
            KeyboardShortcut::plain(egui::Key::F5),
        );

        let text = toml::to_string_pretty(&settings).unwrap();
        let loaded: AppSettings = toml::from_str(&text).unwrap();

        assert_eq!(loaded.operator_name, "Styrelsen");
        assert_eq!(
            loaded.shortcuts.get(&ShortcutAction::AutoLayout),
            Some(&KeyboardShortcut::plain(egui::Key::F5))
        );
        assert_eq!(loaded.shortcuts.len(), ShortcutAction::ALL.len());
    }

    #[test]
    fn test_settings_partial_file_uses_defaults() {
        let loaded: AppSettings = toml::from_str("dark_mode = true\n").unwrap();
        assert!(loaded.dark_mode);
        assert_eq!(loaded.canvas_width, 1200.0);
        assert_eq!(loaded.author_id(), "okänd");
    }
}
