//! Configuration loading for tomlweave.
//!
//! This module handles:
//! - Load options and bootstrap environment variables
//! - Reading, substituting and parsing TOML files
//! - `__include` expansion
//! - The top-level load pipeline, sync and async

pub mod include;
pub mod loader;
pub mod parser;
pub mod types;

pub use include::{IncludeExpander, deep_merge, expand_file_includes};
pub use loader::{Loader, load, load_async, load_str};
pub use parser::{read_source, read_toml, substitute_and_parse, to_json, value_to_json};
pub use types::{
	DEFAULT_ENV_FILE, DEFAULT_TOML_FILE, ENV_FILE_VAR, INCLUDE_KEY, LoadOptions, ResolvedOptions,
	STRICT_DISABLE_VAR, TOML_FILE_VAR,
};
