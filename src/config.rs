//! # Codec Configuration
//!
//! Limits applied while encoding and decoding.
//!
//! The wire format itself declares no maximum nesting depth or message size, so both are
//! bounded here. Encoding uses the same depth limit as decoding: anything the encoder accepts,
//! a decoder with the same configuration accepts too.
//!
//! ## Configuration Sources
//! - [`CodecConfig::default()`]
//! - Builder-style overrides (`with_max_depth`, `with_max_message_size`)
//! - Environment variables via [`CodecConfig::from_env()`]

/// Default maximum number of nested array/object levels.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Highest accepted `max_depth`. Encoding and decoding recurse once per level, so deeper
/// limits are clamped to this value.
pub const MAX_SUPPORTED_DEPTH: usize = 512;

/// Default maximum size of an encoded message (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Environment variable overriding [`CodecConfig::max_depth`].
pub const ENV_MAX_DEPTH: &str = "BIWI_MAX_DEPTH";

/// Environment variable overriding [`CodecConfig::max_message_size`].
pub const ENV_MAX_MESSAGE_SIZE: &str = "BIWI_MAX_MESSAGE_SIZE";

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("max_depth {depth} exceeds the supported maximum of {max}")]
    DepthTooLarge { depth: usize, max: usize },
}

/// Limits for a codec operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum array/object nesting. A scalar has depth 0, an array of scalars depth 1.
    ///
    /// Values above [`MAX_SUPPORTED_DEPTH`] fail [`CodecConfig::validate`] and are clamped by
    /// the codec.
    pub max_depth: usize,
    /// Maximum number of bytes accepted by message decoding.
    pub max_message_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl CodecConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Load configuration from environment variables, starting from the defaults.
    ///
    /// Unset variables keep their default; set but unparsable values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_MAX_DEPTH) {
            config.max_depth = parse_limit(ENV_MAX_DEPTH, &raw)?;
        }
        if let Ok(raw) = std::env::var(ENV_MAX_MESSAGE_SIZE) {
            config.max_message_size = parse_limit(ENV_MAX_MESSAGE_SIZE, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Nesting limit actually applied by the codec.
    #[inline]
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(MAX_SUPPORTED_DEPTH)
    }

    /// Reject limits that are zero or deeper than the codec can recurse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Zero { name: "max_depth" });
        }
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::DepthTooLarge {
                depth: self.max_depth,
                max: MAX_SUPPORTED_DEPTH,
            });
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::Zero {
                name: "max_message_size",
            });
        }
        Ok(())
    }
}

fn parse_limit(name: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse::<usize>().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}
