//! Rendering options, loaded from YAML on top of a built-in theme.
//!
//! ```yaml
//! theme: atlas
//! figure: { width: 400 }
//! colors: { alt: "#00aa00" }
//! hypotest: { shade_tails: false }
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::style::Color;
use crate::theme::Theme;
use crate::{RenderError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub theme: String,
    pub figure: FigureConfig,
    pub font: FontConfig,
    pub axes: AxesConfig,
    pub grid: GridConfig,
    pub experiment: ExperimentConfig,
    pub colors: ColorsConfig,
    pub hypotest: HypoTestConfig,
}

impl Default for VizConfig {
    fn default() -> Self {
        Theme::default().config()
    }
}

/// Canvas size in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self { width: 7.2 * 72.0, height: 4.2 * 72.0 }
    }
}

/// Font sizes in points: legend text, axis labels, tick labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub size: f64,
    pub label_size: f64,
    pub tick_size: f64,
    /// Embed the DejaVu Sans faces as base64 `@font-face` rules
    pub embed: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { size: 10.0, label_size: 11.0, tick_size: 8.5, embed: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    pub tick_direction: TickDirection,
    /// Mirror major ticks on the top and right edges
    pub mirror_ticks: bool,
    pub tick_length: f64,
    pub minor_tick_length: f64,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_direction: TickDirection::In,
            mirror_ticks: true,
            tick_length: 5.0,
            minor_tick_length: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub show: bool,
    pub color: Color,
    pub alpha: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { show: true, color: Color::rgb(0xcb, 0xd5, 0xe1), alpha: 0.55 }
    }
}

/// Header text: bold `name` followed by italic `status`. Empty hides it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub observed: Color,
    pub null: Color,
    pub alt: Color,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            observed: Color::rgb(0x11, 0x18, 0x27),
            null: Color::rgb(0x1d, 0x4e, 0xd8),
            alt: Color::rgb(0xdc, 0x26, 0x26),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HypoTestConfig {
    /// Shade the areas behind the two p-values
    pub shade_tails: bool,
    pub tail_alpha: f64,
    /// List the p-values in the legend
    pub show_p_values: bool,
}

impl Default for HypoTestConfig {
    fn default() -> Self {
        Self { shade_tails: true, tail_alpha: 0.3, show_p_values: true }
    }
}

fn config_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Config(e.to_string())
}

/// Theme defaults, overlaid with `user_yaml` when given. Keys absent from the
/// YAML keep the theme's value.
pub fn resolve_config(user_yaml: Option<&str>) -> Result<VizConfig> {
    let Some(yaml) = user_yaml else {
        return Ok(VizConfig::default());
    };
    let user: Value = serde_yaml_ng::from_str(yaml).map_err(config_error)?;
    let theme: Theme = user.get("theme").and_then(Value::as_str).unwrap_or_default().parse()?;

    let mut merged = serde_yaml_ng::to_value(theme.config()).map_err(config_error)?;
    overlay(&mut merged, user);
    serde_yaml_ng::from_value(merged).map_err(config_error)
}

fn overlay(base: &mut Value, user: Value) {
    match (base, user) {
        (Value::Mapping(base), Value::Mapping(user)) => {
            for (key, value) in user {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_yaml_gives_default_theme() {
        let cfg = resolve_config(None).unwrap();
        assert_eq!(cfg.theme, "nextstat2026");
        assert!(cfg.hypotest.shade_tails);
        assert_eq!(cfg.axes.tick_direction, TickDirection::In);
    }

    #[test]
    fn partial_yaml_keeps_theme_values() {
        let cfg = resolve_config(Some("theme: atlas\nfigure:\n  width: 300\n")).unwrap();
        assert_eq!(cfg.theme, "atlas");
        assert_eq!(cfg.figure.width, 300.0);
        assert_eq!(cfg.figure.height, 432.0);
        assert_eq!(cfg.experiment.name, "ATLAS");
    }

    #[test]
    fn colors_and_enums_are_overridable() {
        let cfg =
            resolve_config(Some("colors:\n  alt: '#00ff00'\naxes:\n  tick_direction: out\n")).unwrap();
        assert_eq!(cfg.colors.alt, Color::rgb(0, 255, 0));
        assert_eq!(cfg.colors.null, ColorsConfig::default().null);
        assert_eq!(cfg.axes.tick_direction, TickDirection::Out);
    }

    #[test]
    fn bad_input_is_a_config_error() {
        for yaml in ["figure: [1, 2", "colors:\n  null: blue\n", "theme: solarized\n"] {
            assert!(matches!(resolve_config(Some(yaml)), Err(RenderError::Config(_))), "{yaml}");
        }
    }
}
