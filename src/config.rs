//! Crate-level tunables, loaded from an optional TOML file.
//!
//! Grounded in `framework_lib::config`: a plain `serde::Deserialize`
//! struct loaded with `toml::from_str`. The teacher's `load_config`
//! panics on a bad file (`.unwrap()`); this one returns `Result` instead,
//! since a malformed config here shouldn't take down a host tool.

use serde::Deserialize;

/// Maximum length of a single binary region TLV record (spec.md §3/§4.3).
pub const MAX_BLOCK_LENGTH: usize = 0xff00;

/// Default streaming block size for whole-file checksum passes (spec.md §5).
pub const DEFAULT_CHECKSUM_BLOCKSIZE: usize = 16384;

/// Default copyright text for a freshly compiled type-5 record (spec.md §6).
pub const DEFAULT_COPYRIGHT: &str = "Copyright 1996-2017 by Garmin Ltd. or its subsidiaries.";

#[derive(Debug, Deserialize)]
struct RawConfig {
    codec: Option<RawCodecConfig>,
}

#[derive(Debug, Deserialize)]
struct RawCodecConfig {
    max_block_length: Option<usize>,
    checksum_blocksize: Option<usize>,
    default_copyright: Option<String>,
}

/// Resolved, always-valid codec configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub max_block_length: usize,
    pub checksum_blocksize: usize,
    pub default_copyright: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            max_block_length: MAX_BLOCK_LENGTH,
            checksum_blocksize: DEFAULT_CHECKSUM_BLOCKSIZE,
            default_copyright: DEFAULT_COPYRIGHT.to_string(),
        }
    }
}

impl CodecConfig {
    /// Parse a `[codec]` TOML document, falling back to defaults for any
    /// field left unset.
    pub fn load_from_str(toml_str: &str) -> Result<CodecConfig, toml::de::Error> {
        let raw: RawConfig = toml::from_str(toml_str)?;
        let defaults = CodecConfig::default();
        let Some(codec) = raw.codec else {
            return Ok(defaults);
        };
        Ok(CodecConfig {
            max_block_length: codec.max_block_length.unwrap_or(defaults.max_block_length),
            checksum_blocksize: codec
                .checksum_blocksize
                .unwrap_or(defaults.checksum_blocksize),
            default_copyright: codec.default_copyright.unwrap_or(defaults.default_copyright),
        })
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<CodecConfig> {
        let text = std::fs::read_to_string(path)?;
        CodecConfig::load_from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
