use egui::{Color32, FontFamily, FontId, TextStyle, Visuals};

use crate::services::NodeCategory;

/// Konfigurera applikationens utseende
pub fn configure_style(ctx: &egui::Context, dark_mode: bool) {
    let mut style = (*ctx.style()).clone();

    // Typsnitt
    style.text_styles = [
        (TextStyle::Heading, FontId::new(24.0, FontFamily::Proportional)),
        (TextStyle::Name("heading2".into()), FontId::new(20.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
    ]
    .into();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(12.0);

    style.visuals = if dark_mode { dark_visuals() } else { light_visuals() };

    ctx.set_style(style);
}

fn dark_visuals() -> Visuals {
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(28, 27, 34);
    visuals.window_fill = Color32::from_rgb(38, 36, 46);
    visuals.extreme_bg_color = Color32::from_rgb(20, 19, 25);

    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(44, 42, 52);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(50, 48, 60);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(62, 58, 76);
    visuals.widgets.active.bg_fill = Color32::from_rgb(74, 68, 92);

    // Accentfärg (lila)
    visuals.selection.bg_fill = Color32::from_rgb(110, 80, 180);
    visuals.hyperlink_color = Color32::from_rgb(170, 140, 255);

    visuals
}

fn light_visuals() -> Visuals {
    let mut visuals = Visuals::light();

    visuals.panel_fill = Color32::from_rgb(249, 248, 252);
    visuals.window_fill = Color32::from_rgb(255, 255, 255);
    visuals.extreme_bg_color = Color32::from_rgb(241, 239, 246);

    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(236, 233, 243);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(230, 227, 238);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(218, 212, 232);
    visuals.widgets.active.bg_fill = Color32::from_rgb(200, 190, 225);

    // Accentfärg (lila)
    visuals.selection.bg_fill = Color32::from_rgb(210, 195, 250);
    visuals.hyperlink_color = Color32::from_rgb(100, 60, 190);

    visuals
}

/// Färgpalett för applikationen
pub struct Colors;

impl Colors {
    pub const PRIMARY: Color32 = Color32::from_rgb(124, 77, 255);

    pub const SUCCESS: Color32 = Color32::from_rgb(34, 197, 94);
    pub const WARNING: Color32 = Color32::from_rgb(234, 179, 8);
    pub const ERROR: Color32 = Color32::from_rgb(239, 68, 68);
    pub const INFO: Color32 = Color32::from_rgb(59, 130, 246);

    // Text
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(107, 114, 128);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(156, 163, 175);

    // Nodkategorier
    pub const BIG_FULL: Color32 = Color32::from_rgb(22, 163, 74);
    pub const BIG_WITH_LITTLES: Color32 = Color32::from_rgb(132, 204, 22);
    pub const BIG_ONLY: Color32 = Color32::from_rgb(234, 179, 8);
    pub const LITTLE: Color32 = Color32::from_rgb(56, 189, 248);
    pub const UNCONNECTED: Color32 = Color32::from_rgb(156, 163, 175);

    pub const EDGE: Color32 = Color32::from_rgb(124, 77, 255);

    pub fn category(category: NodeCategory) -> Color32 {
        match category {
            NodeCategory::BigWithLittlesAndBig => Self::BIG_FULL,
            NodeCategory::BigWithLittles => Self::BIG_WITH_LITTLES,
            NodeCategory::BigOnly => Self::BIG_ONLY,
            NodeCategory::Little => Self::LITTLE,
            NodeCategory::Unconnected => Self::UNCONNECTED,
        }
    }
}

/// Ikoner (Unicode)
pub struct Icons;

impl Icons {
    pub const FORM: &'static str = "📋";
    pub const PEOPLE: &'static str = "👥";
    pub const TREE: &'static str = "🌳";
    pub const CHALLENGE: &'static str = "🏆";
    pub const POINTS: &'static str = "⭐";
    pub const SETTINGS: &'static str = "⚙";
    pub const ADD: &'static str = "➕";
    pub const EDIT: &'static str = "✏";
    pub const DELETE: &'static str = "🗑";
    pub const SAVE: &'static str = "💾";
    pub const CHECK: &'static str = "✓";
    pub const ARROW_LEFT: &'static str = "←";
    pub const CALENDAR: &'static str = "📅";
    pub const DASHBOARD: &'static str = "📊";
    pub const EXPORT: &'static str = "📤";
    pub const REFRESH: &'static str = "🔄";
    pub const LAYOUT: &'static str = "🗺";
    pub const LINK: &'static str = "🔗";
    pub const QUESTIONNAIRE: &'static str = "📝";
}
