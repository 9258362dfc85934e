use std::str::FromStr;

use crate::RenderError;
use crate::config::*;
use crate::style::Color;

/// Built-in presets, selected by the `theme` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    NextStat2026,
    Atlas,
    Cms,
    Minimal,
}

impl FromStr for Theme {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "nextstat2026" | "nextstat" => Ok(Self::NextStat2026),
            "atlas" => Ok(Self::Atlas),
            "cms" => Ok(Self::Cms),
            "minimal" => Ok(Self::Minimal),
            other => Err(RenderError::Config(format!("unknown theme '{other}'"))),
        }
    }
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Self::NextStat2026 => "nextstat2026",
            Self::Atlas => "atlas",
            Self::Cms => "cms",
            Self::Minimal => "minimal",
        }
    }

    pub fn config(self) -> VizConfig {
        let base = VizConfig {
            theme: self.name().to_string(),
            figure: FigureConfig::default(),
            font: FontConfig::default(),
            axes: AxesConfig::default(),
            grid: GridConfig::default(),
            experiment: ExperimentConfig { name: "NEXTSTAT".into(), status: "Internal".into() },
            colors: ColorsConfig::default(),
            hypotest: HypoTestConfig::default(),
        };
        match self {
            Self::NextStat2026 => base,
            Self::Atlas => VizConfig {
                figure: FigureConfig { width: 576.0, height: 432.0 },
                font: FontConfig { size: 11.0, label_size: 12.0, tick_size: 9.5, ..base.font },
                axes: AxesConfig { tick_length: 6.0, ..base.axes },
                grid: GridConfig { show: false, ..base.grid },
                experiment: ExperimentConfig { name: "ATLAS".into(), status: "Internal".into() },
                colors: ColorsConfig {
                    null: Color::rgb(0x00, 0x72, 0xb2),
                    alt: Color::rgb(0xd5, 0x5e, 0x00),
                    ..base.colors
                },
                ..base
            },
            Self::Cms => VizConfig {
                figure: FigureConfig { width: 720.0, height: 720.0 },
                font: FontConfig { tick_size: 9.0, ..base.font },
                grid: GridConfig { show: false, ..base.grid },
                experiment: ExperimentConfig { name: "CMS".into(), status: "Preliminary".into() },
                colors: ColorsConfig {
                    null: Color::rgb(0x57, 0x90, 0xfc),
                    alt: Color::rgb(0xe4, 0x25, 0x36),
                    ..base.colors
                },
                ..base
            },
            Self::Minimal => VizConfig {
                figure: FigureConfig { width: 432.0, ..base.figure },
                font: FontConfig { size: 9.0, label_size: 10.0, tick_size: 8.0, ..base.font },
                axes: AxesConfig {
                    tick_direction: TickDirection::Out,
                    mirror_ticks: false,
                    tick_length: 4.0,
                    minor_tick_length: 2.0,
                },
                grid: GridConfig { show: false, ..base.grid },
                experiment: ExperimentConfig::default(),
                hypotest: HypoTestConfig { show_p_values: false, ..base.hypotest },
                ..base
            },
        }
    }
}
