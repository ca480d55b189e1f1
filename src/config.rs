//! Compiler configuration
//!
//! Platform limits are not hard-coded in the compiler. They live here with
//! defaults matching the platform's documented values and can be overridden
//! from a TOML file:
//!
//! ```toml
//! [template]
//! author = "Builder"
//! max_code_length = 65536
//!
//! [limits]
//! max_parameters = 27
//! translate_color_codes = false
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::value::MAX_STACK_COUNT;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Author written into templates when none is configured
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Value and parameter limits enforced while emitting
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Parameter slots per codeblock (tags included)
    pub max_parameters: usize,
    /// Maximum length of function and process names
    pub max_function_name_length: usize,
    /// Maximum lore lines on an item
    pub max_lore_lines: usize,
    /// Maximum item stack size
    pub max_stack_size: u32,
    /// Absolute bound on location coordinates
    pub coordinate_bound: f64,
    /// Translate `&c` color codes in text values to section signs
    pub translate_color_codes: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_parameters: 27,
            max_function_name_length: 16,
            max_lore_lines: 100,
            max_stack_size: 64,
            coordinate_bound: 30_000_000.0,
            translate_color_codes: true,
        }
    }
}

/// Configuration for a compiler instance
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    /// Author recorded in template headers
    pub author: String,
    /// Template format version written into the envelope
    pub format_version: u32,
    /// Upper bound on the encoded code string, if the platform imposes one
    pub max_code_length: Option<usize>,
    /// Gzip level (0-9)
    pub compression_level: u32,
    /// Value and parameter limits
    pub limits: Limits,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            format_version: 1,
            max_code_length: None,
            compression_level: 6,
            limits: Limits::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    template: Option<TomlTemplate>,
    limits: Option<Limits>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTemplate {
    author: Option<String>,
    format_version: Option<u32>,
    max_code_length: Option<usize>,
    compression_level: Option<u32>,
}

impl CompilerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string, filling gaps with defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(template) = parsed.template {
            if let Some(author) = template.author {
                config.author = author;
            }
            if let Some(version) = template.format_version {
                config.format_version = version;
            }
            config.max_code_length = template.max_code_length;
            if let Some(level) = template.compression_level {
                config.compression_level = level;
            }
        }
        if let Some(limits) = parsed.limits {
            config.limits = limits;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.compression_level > 9 {
            return Err(ConfigError::Invalid(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.limits.max_parameters == 0 {
            return Err(ConfigError::Invalid(
                "max_parameters must be at least 1".to_string(),
            ));
        }
        if self.limits.max_stack_size == 0 || self.limits.max_stack_size > MAX_STACK_COUNT {
            return Err(ConfigError::Invalid(format!(
                "max_stack_size must be 1-{MAX_STACK_COUNT}, got {}",
                self.limits.max_stack_size
            )));
        }
        if !(self.limits.coordinate_bound > 0.0) {
            return Err(ConfigError::Invalid(
                "coordinate_bound must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the template author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the maximum encoded code length
    pub fn with_max_code_length(mut self, max: usize) -> Self {
        self.max_code_length = Some(max);
        self
    }

    /// Set the gzip compression level
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Replace the value limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
