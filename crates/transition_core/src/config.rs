use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::Namespace;
use url::Url;

use crate::error::StartupError;

pub const DEFAULT_SETTINGS_FILE: &str = "transitions.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    pub ready_timeout_ms: u64,
    pub reveal_delay_ms: u64,
    pub transition_offset_ms: u64,
    pub router_timeout_ms: u64,
    /// Page controllers are fetched from `<base>/<Namespace>.js`. Empty disables fetching.
    pub controller_base_url: String,
    pub namespaces: Vec<String>,
    pub selectors: Selectors,
    pub timing: Timing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            ready_timeout_ms: 4000,
            reveal_delay_ms: 500,
            transition_offset_ms: 0,
            router_timeout_ms: 7000,
            controller_base_url: "https://cdn.jsdelivr.net/gh/ncmgmt/barba-dev@main/dist/pages"
                .into(),
            namespaces: [
                "Home",
                "Portfolio",
                "Team",
                "Insights",
                "Contact",
                "Imprint",
                "Legal",
                "PrivacyPolicy",
                "Summit",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            selectors: Selectors::default(),
            timing: Timing::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub transition_wrap: String,
    pub transition_column: String,
    pub logo_wrap: String,
    pub fade_contain: String,
    pub wrapper: String,
    pub container: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            transition_wrap: ".layout_transition_wrap".into(),
            transition_column: ".layout_column_el".into(),
            logo_wrap: ".logo_wrap".into(),
            fade_contain: "[data-transition-contain=\"fade\"]".into(),
            wrapper: "[data-barba=\"wrapper\"]".into(),
            container: "[data-barba=\"container\"]".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub overlay_fade_ms: u64,
    pub overlay_remove_ms: u64,
    pub scroll_unlock_delay_ms: u64,
    pub menu_close_grace_ms: u64,
    pub mid_enter_cue_ms: u64,
    pub resize_dispatch_delay_ms: u64,
    pub visibility_wait_ms: u64,
    pub frame_interval_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            overlay_fade_ms: 120,
            overlay_remove_ms: 140,
            scroll_unlock_delay_ms: 150,
            menu_close_grace_ms: 450,
            mid_enter_cue_ms: 500,
            resize_dispatch_delay_ms: 1500,
            visibility_wait_ms: 800,
            frame_interval_ms: 16,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("failed to parse transition settings")
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn transition_offset(&self) -> Duration {
        Duration::from_millis(self.transition_offset_ms)
    }

    pub fn router_timeout(&self) -> Duration {
        Duration::from_millis(self.router_timeout_ms)
    }

    pub fn is_known_namespace(&self, namespace: &Namespace) -> bool {
        self.namespaces.iter().any(|ns| ns == namespace.as_str())
    }

    pub fn controller_url(&self, namespace: &Namespace) -> Result<Option<String>, url::ParseError> {
        let base = self.controller_base_url.trim();
        if base.is_empty() {
            return Ok(None);
        }

        let mut url = Url::parse(base)?;
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(&format!("{namespace}.js"));
            }
            Err(()) => return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase),
        }
        Ok(Some(url.into()))
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        self.controller_url(&Namespace::new("default"))
            .map(|_| ())
            .map_err(|err| {
                StartupError::Config(format!(
                    "controller_base_url '{}' is not a usable base url: {err}",
                    self.controller_base_url
                ))
            })
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APP__DEBUG") {
            if let Some(parsed) = parse_flag(&v) {
                self.debug = parsed;
            }
        }
        if let Some(v) = lookup("APP__READY_TIMEOUT_MS") {
            if let Ok(parsed) = v.trim().parse() {
                self.ready_timeout_ms = parsed;
            }
        }
        if let Some(v) = lookup("APP__REVEAL_DELAY_MS") {
            if let Ok(parsed) = v.trim().parse() {
                self.reveal_delay_ms = parsed;
            }
        }
        if let Some(v) = lookup("APP__TRANSITION_OFFSET_MS") {
            if let Ok(parsed) = v.trim().parse() {
                self.transition_offset_ms = parsed;
            }
        }
        if let Some(v) = lookup("CONTROLLER_BASE_URL") {
            self.controller_base_url = v;
        }
        if let Some(v) = lookup("APP__CONTROLLER_BASE_URL") {
            self.controller_base_url = v;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let default_path = PathBuf::from(DEFAULT_SETTINGS_FILE);
    let path = default_path.exists().then_some(default_path.as_path());
    load_settings_from(path)
}

pub fn load_settings_from(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
            Settings::from_toml_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?
        }
        None => Settings::default(),
    };

    settings.apply_env_overrides(|key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
