use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::Context;
use eframe::egui::Color32;
use serde::Deserialize;

use crate::theme::{parse_color, ThemeMode};

/// Player instance the dashboard addresses whenever no config file
/// overrides it.
pub const DEFAULT_PLAYER_TARGET: &str = "chromium.instance7682";

pub const DEFAULT_ART_CACHE_PATH: &str = "/tmp/tardis_album.jpg";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub player: PlayerConfig,
    pub art: ArtConfig,
    pub panel: PanelConfig,
    pub theme: ThemeConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join("config.toml"));
            candidates.push(current_dir.join("config").join("tardis.toml"));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("config.toml"));
            }
        }

        if let Some(base) = dirs::config_dir() {
            candidates.push(base.join("tardis-dashboard").join("config.toml"));
        }

        for path in candidates {
            if path.exists() {
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let doc: ConfigDocument = toml::from_str(&data)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?;
                return doc.try_into();
            }
        }

        Ok(Config::default())
    }
}

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub target: String,
    pub poll_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_PLAYER_TARGET.to_string(),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtConfig {
    pub cache_path: PathBuf,
    pub http_timeout: Duration,
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_ART_CACHE_PATH),
            http_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub ascii_path: PathBuf,
}

impl Default for PanelConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            ascii_path: home.join(".config").join("neofetch").join("tardis.txt"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeConfig {
    pub mode: ThemeMode,
    pub background: Option<Color32>,
    pub foreground: Option<Color32>,
    pub accent: Option<Color32>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            mode: ThemeMode::System,
            background: None,
            foreground: None,
            accent: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    player: PlayerSection,
    #[serde(default)]
    art: ArtSection,
    #[serde(default)]
    panel: PanelSection,
    #[serde(default)]
    theme: ThemeSection,
}

impl TryFrom<ConfigDocument> for Config {
    type Error = anyhow::Error;

    fn try_from(value: ConfigDocument) -> anyhow::Result<Self> {
        let defaults = Config::default();

        let player = PlayerConfig {
            target: value.player.target.unwrap_or(defaults.player.target),
            poll_interval: value
                .player
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.player.poll_interval),
        };

        let art = ArtConfig {
            cache_path: value.art.cache_path.unwrap_or(defaults.art.cache_path),
            http_timeout: value
                .art
                .http_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.art.http_timeout),
        };

        let panel = PanelConfig {
            ascii_path: value.panel.ascii_path.unwrap_or(defaults.panel.ascii_path),
        };

        let theme = ThemeConfig {
            mode: value.theme.mode.unwrap_or(defaults.theme.mode),
            background: parse_color_field(value.theme.background, "theme.background")?,
            foreground: parse_color_field(value.theme.foreground, "theme.foreground")?,
            accent: parse_color_field(value.theme.accent, "theme.accent")?,
        };

        Ok(Config {
            player,
            art,
            panel,
            theme,
        })
    }
}

fn parse_color_field(value: Option<String>, key: &str) -> anyhow::Result<Option<Color32>> {
    value
        .as_deref()
        .map(parse_color)
        .transpose()
        .with_context(|| format!("Invalid color for {key}"))
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSection {
    target: Option<String>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtSection {
    cache_path: Option<PathBuf>,
    http_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PanelSection {
    ascii_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ThemeSection {
    mode: Option<ThemeMode>,
    background: Option<String>,
    foreground: Option<String>,
    accent: Option<String>,
}
