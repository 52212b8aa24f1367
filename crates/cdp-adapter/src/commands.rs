//! Command parameter types exposed by the CDP adapter interface.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Document readiness a navigation waits for before returning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationWait {
    /// `document.readyState` is `interactive` or `complete`.
    #[default]
    DomContentLoaded,
    /// `document.readyState` is `complete`.
    Load,
}

impl NavigationWait {
    pub fn is_satisfied_by(&self, ready_state: &str) -> bool {
        match self {
            NavigationWait::DomContentLoaded => {
                matches!(ready_state, "interactive" | "complete")
            }
            NavigationWait::Load => ready_state == "complete",
        }
    }
}

impl FromStr for NavigationWait {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "domcontentloaded" | "dom-ready" | "domready" => Ok(NavigationWait::DomContentLoaded),
            "load" => Ok(NavigationWait::Load),
            other => Err(format!("unknown navigation wait condition '{other}'")),
        }
    }
}

/// Emulated viewport size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

impl FromStr for Viewport {
    type Err = String;

    /// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (w, h) = raw
            .trim()
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| format!("viewport '{raw}' must look like WIDTHxHEIGHT"))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid viewport width '{w}'"))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid viewport height '{h}'"))?;
        if width == 0 || height == 0 {
            return Err(format!("viewport '{raw}' must be non-zero"));
        }
        Ok(Self { width, height })
    }
}

/// Center point of an element in top-level viewport coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementPoint {
    pub x: f64,
    pub y: f64,
}

impl ElementPoint {
    pub fn offset_by(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Rendered size and computed style of the first element matching a selector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementLayout {
    pub exists: bool,
    pub width: f64,
    pub height: f64,
    pub display: String,
    pub visibility: String,
    pub opacity: String,
}

/// Text and `data-value` of one element in a list, in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemSnapshot {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "dataValue")]
    pub data_value: Option<String>,
}
