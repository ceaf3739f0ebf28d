use anyhow::{anyhow, Result};
use eframe::egui::{self, Color32, CornerRadius, Stroke};
use serde::Deserialize;

use crate::config::ThemeConfig;

/// Background / foreground / accent palette the widget is themed from,
/// resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetTheme {
    pub background: Color32,
    pub foreground: Color32,
    pub accent: Color32,
}

/// Rest and hover fills for the transport buttons, derived from the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStyle {
    pub background: Color32,
    pub foreground: Color32,
    pub hover_background: Color32,
    pub hover_foreground: Color32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    System,
    Dark,
    Light,
}

pub const DARK_PALETTE: WidgetTheme = WidgetTheme {
    background: Color32::from_rgb(0x09, 0x09, 0x0b), // zinc-950
    foreground: Color32::from_rgb(0xe4, 0xe4, 0xe7), // zinc-200
    accent: Color32::from_rgb(0x1d, 0x5d, 0x9b),     // TARDIS blue
};

pub const LIGHT_PALETTE: WidgetTheme = WidgetTheme {
    background: Color32::from_rgb(0xf4, 0xf4, 0xf5), // zinc-100
    foreground: Color32::from_rgb(0x18, 0x18, 0x1b), // zinc-900
    accent: Color32::from_rgb(0x1d, 0x5d, 0x9b),     // TARDIS blue
};

impl WidgetTheme {
    /// Picks the palette for the host's light/dark preference, then lays any
    /// per-color overrides from the config file on top.
    pub fn resolve(config: &ThemeConfig, system: egui::Theme) -> Self {
        let mut theme = match config.mode {
            ThemeMode::Dark => DARK_PALETTE,
            ThemeMode::Light => LIGHT_PALETTE,
            ThemeMode::System => match system {
                egui::Theme::Light => LIGHT_PALETTE,
                _ => DARK_PALETTE,
            },
        };
        if let Some(color) = config.background {
            theme.background = color;
        }
        if let Some(color) = config.foreground {
            theme.foreground = color;
        }
        if let Some(color) = config.accent {
            theme.accent = color;
        }
        theme
    }

    /// Buttons sit on the accent color; hovering inverts to the foreground.
    pub fn button_style(&self) -> ButtonStyle {
        ButtonStyle {
            background: self.accent,
            foreground: self.foreground,
            hover_background: self.foreground,
            hover_foreground: self.accent,
        }
    }

    /// Writes the palette and the derived button style into an egui style.
    /// Re-applied on every frame so later theme changes cannot wash it out.
    pub fn apply(&self, style: &mut egui::Style) {
        let buttons = self.button_style();
        let visuals = &mut style.visuals;

        visuals.panel_fill = self.background;
        visuals.window_fill = self.background;
        visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, self.foreground);
        visuals.selection.bg_fill = self.accent;

        for (widget, fill, text) in [
            (
                &mut visuals.widgets.inactive,
                buttons.background,
                buttons.foreground,
            ),
            (
                &mut visuals.widgets.hovered,
                buttons.hover_background,
                buttons.hover_foreground,
            ),
            (
                &mut visuals.widgets.active,
                buttons.hover_background,
                buttons.hover_foreground,
            ),
        ] {
            widget.bg_fill = fill;
            widget.weak_bg_fill = fill;
            widget.fg_stroke = Stroke::new(1.0, text);
            widget.corner_radius = CornerRadius::same(5);
        }
    }
}

pub fn parse_color(value: &str) -> Result<Color32> {
    let v = value.trim();
    let hex = v
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("Unsupported color format: {v}"))?;
    let bytes = match hex.len() {
        6 | 8 => u32::from_str_radix(hex, 16).ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Invalid hex color: #{hex}"))?;
    Ok(if hex.len() == 6 {
        Color32::from_rgb((bytes >> 16) as u8, (bytes >> 8) as u8, bytes as u8)
    } else {
        Color32::from_rgba_unmultiplied(
            (bytes >> 24) as u8,
            (bytes >> 16) as u8,
            (bytes >> 8) as u8,
            bytes as u8,
        )
    })
}
