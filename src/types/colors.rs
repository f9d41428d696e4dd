// src/types/colors.rs
use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Colour as reported by Notion for text, blocks and select options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Gray,
    Brown,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    #[serde(rename = "default_background")]
    DefaultBackground,
    #[serde(rename = "gray_background")]
    GrayBackground,
    #[serde(rename = "brown_background")]
    BrownBackground,
    #[serde(rename = "red_background")]
    RedBackground,
    #[serde(rename = "orange_background")]
    OrangeBackground,
    #[serde(rename = "yellow_background")]
    YellowBackground,
    #[serde(rename = "green_background")]
    GreenBackground,
    #[serde(rename = "blue_background")]
    BlueBackground,
    #[serde(rename = "purple_background")]
    PurpleBackground,
    #[serde(rename = "pink_background")]
    PinkBackground,
}

impl std::str::FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| ValidationError::InvalidColor(s.to_string()))
    }
}

impl Color {
    pub fn is_background(&self) -> bool {
        matches!(
            self,
            Color::DefaultBackground
                | Color::GrayBackground
                | Color::BrownBackground
                | Color::RedBackground
                | Color::OrangeBackground
                | Color::YellowBackground
                | Color::GreenBackground
                | Color::BlueBackground
                | Color::PurpleBackground
                | Color::PinkBackground
        )
    }

    /// The hue without the background qualifier.
    pub fn hue(&self) -> Color {
        match self {
            Color::DefaultBackground => Color::Default,
            Color::GrayBackground => Color::Gray,
            Color::BrownBackground => Color::Brown,
            Color::RedBackground => Color::Red,
            Color::OrangeBackground => Color::Orange,
            Color::YellowBackground => Color::Yellow,
            Color::GreenBackground => Color::Green,
            Color::BlueBackground => Color::Blue,
            Color::PurpleBackground => Color::Purple,
            Color::PinkBackground => Color::Pink,
            other => *other,
        }
    }

    /// Local palette entry for this hue; `None` for the default colour.
    pub fn to_local(&self) -> Option<OptionColor> {
        match self.hue() {
            Color::Gray => Some(OptionColor::Grey),
            Color::Brown => Some(OptionColor::Brown),
            Color::Red => Some(OptionColor::Red),
            Color::Orange => Some(OptionColor::Orange),
            Color::Yellow => Some(OptionColor::Yellow),
            Color::Green => Some(OptionColor::Green),
            Color::Blue => Some(OptionColor::Blue),
            Color::Purple => Some(OptionColor::Purple),
            Color::Pink => Some(OptionColor::Pink),
            _ => None,
        }
    }
}

/// The fixed palette relation options and text marks are coloured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionColor {
    Grey,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
}

impl OptionColor {
    pub const PALETTE: [OptionColor; 9] = [
        OptionColor::Grey,
        OptionColor::Brown,
        OptionColor::Orange,
        OptionColor::Yellow,
        OptionColor::Green,
        OptionColor::Blue,
        OptionColor::Purple,
        OptionColor::Pink,
        OptionColor::Red,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionColor::Grey => "grey",
            OptionColor::Brown => "brown",
            OptionColor::Orange => "orange",
            OptionColor::Yellow => "yellow",
            OptionColor::Green => "green",
            OptionColor::Blue => "blue",
            OptionColor::Purple => "purple",
            OptionColor::Pink => "pink",
            OptionColor::Red => "red",
        }
    }

    /// Maps a Notion option colour; Notion's "default" lands on grey.
    pub fn from_notion(color: Color) -> Self {
        color.to_local().unwrap_or(OptionColor::Grey)
    }

    /// Stable palette pick for options that arrive without a colour.
    pub fn for_name(name: &str) -> Self {
        let sum = name.bytes().fold(0usize, |acc, b| acc.wrapping_add(b as usize));
        Self::PALETTE[sum % Self::PALETTE.len()]
    }
}

impl fmt::Display for OptionColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
