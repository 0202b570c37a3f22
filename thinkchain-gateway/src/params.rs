//! Per-run session parameters and the fixed model enumeration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thinkchain_error::{Error, Result};

pub const DEFAULT_TOP_P: f32 = 0.1;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 600;

/// The models offered to users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "glm-4-plus")]
    Glm4Plus,
    #[serde(rename = "glm-4-0520")]
    Glm40520,
    #[serde(rename = "glm-4-air")]
    Glm4Air,
    #[serde(rename = "glm-4-flash")]
    Glm4Flash,
    #[serde(rename = "glm-4")]
    Glm4,
}

impl Model {
    pub const ALL: [Model; 5] = [
        Model::Glm4Plus,
        Model::Glm40520,
        Model::Glm4Air,
        Model::Glm4Flash,
        Model::Glm4,
    ];

    /// Identifier sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Glm4Plus => "glm-4-plus",
            Model::Glm40520 => "glm-4-0520",
            Model::Glm4Air => "glm-4-air",
            Model::Glm4Flash => "glm-4-flash",
            Model::Glm4 => "glm-4",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Model::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Model::ALL.iter().map(Model::as_str).collect();
                Error::invalid_argument(
                    "model",
                    format!("unknown model '{}', expected one of: {}", wanted, known.join(", ")),
                )
            })
    }
}

/// Connection and sampling values for one run. Never persisted.
#[derive(Clone, PartialEq)]
pub struct SessionParams {
    pub api_key: String,
    pub model: Model,
    pub top_p: f32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SessionParams {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Model::default(),
            top_p: DEFAULT_TOP_P,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Check every value against its declared range.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::config_invalid("an API key is required")
                .with_context("param", "api_key"));
        }
        check_unit_interval("top_p", self.top_p)?;
        check_unit_interval("temperature", self.temperature)?;
        if self.max_tokens == 0 {
            return Err(Error::invalid_argument(
                "max_tokens",
                "max_tokens must be a positive integer",
            ));
        }
        Ok(())
    }
}

fn check_unit_interval(param: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            param,
            format!("{} must be within [0, 1], got {}", param, value),
        ))
    }
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("top_p", &self.top_p)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
