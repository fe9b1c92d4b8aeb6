use crate::vars::EnvSnapshot;
use std::path::PathBuf;

/// Key that marks an include directive inside any table.
pub const INCLUDE_KEY: &str = "__include";

/// TOML file loaded when neither the caller nor the environment names one.
pub const DEFAULT_TOML_FILE: &str = "env.toml";

/// Variable file loaded when neither the caller nor the environment names one.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// When truthy, strict mode is forced off for every load.
pub const STRICT_DISABLE_VAR: &str = "TOMLWEAVE_STRICT_DISABLE";

/// Default TOML file path.
pub const TOML_FILE_VAR: &str = "TOMLWEAVE_TOML_FILE";

/// Default variable file path.
pub const ENV_FILE_VAR: &str = "TOMLWEAVE_ENV_FILE";

/// Options for a single load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
	/// TOML file to load. Falls back to `TOMLWEAVE_TOML_FILE`, then `env.toml`.
	pub toml_file: Option<PathBuf>,

	/// Variable file to read. Falls back to `TOMLWEAVE_ENV_FILE`, then `.env`.
	pub env_file: Option<PathBuf>,

	/// If false, no variable file is read at all.
	pub use_env_file: bool,

	/// Fail on unresolved variables, duplicates and include problems.
	pub strict: bool,

	/// Seed the Variable Mapping with the process environment.
	pub include_environment: bool,

	/// Environment to use instead of capturing the process environment.
	pub environment: Option<EnvSnapshot>,
}

impl Default for LoadOptions {
	fn default() -> Self {
		LoadOptions {
			toml_file: None,
			env_file: None,
			use_env_file: true,
			strict: true,
			include_environment: true,
			environment: None,
		}
	}
}

impl LoadOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn toml_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.toml_file = Some(path.into());
		self
	}

	pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.env_file = Some(path.into());
		self.use_env_file = true;
		self
	}

	pub fn no_env_file(mut self) -> Self {
		self.env_file = None;
		self.use_env_file = false;
		self
	}

	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	pub fn include_environment(mut self, include: bool) -> Self {
		self.include_environment = include;
		self
	}

	pub fn environment(mut self, snapshot: EnvSnapshot) -> Self {
		self.environment = Some(snapshot);
		self
	}

	/// Capture the environment (unless one was injected) and apply the
	/// bootstrap variables and defaults.
	pub fn resolve(self) -> ResolvedOptions {
		let snapshot = self.environment.unwrap_or_else(EnvSnapshot::capture);

		let toml_file = self
			.toml_file
			.or_else(|| snapshot.get(TOML_FILE_VAR).map(PathBuf::from))
			.unwrap_or_else(|| PathBuf::from(DEFAULT_TOML_FILE));

		let env_file = self.use_env_file.then(|| {
			self.env_file
				.or_else(|| snapshot.get(ENV_FILE_VAR).map(PathBuf::from))
				.unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE))
		});

		let strict = self.strict && !snapshot.is_truthy(STRICT_DISABLE_VAR);
		if self.strict && !strict {
			tracing::debug!("strict mode disabled by {STRICT_DISABLE_VAR}");
		}

		ResolvedOptions {
			toml_file,
			env_file,
			strict,
			include_environment: self.include_environment,
			snapshot,
		}
	}
}

/// Load options after bootstrap resolution.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
	pub toml_file: PathBuf,
	pub env_file: Option<PathBuf>,
	pub strict: bool,
	pub include_environment: bool,
	pub snapshot: EnvSnapshot,
}
