use std::fmt;
use std::path::PathBuf;

/// Field path used for errors raised while building the Variable Mapping.
pub const ENV_ERROR_PATH: &str = "environment_variables";

/// Field path used for include directive errors.
pub const INCLUDE_ERROR_PATH: &str = "include";

/// Every way a load can fail.
///
/// Variable problems come first (undefined or duplicated names, batched per
/// file), then include directives, file access and TOML syntax, then schema
/// conversion. [`WeaveError::entries`] flattens any of them into
/// `(field path, message)` pairs.
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
	#[error("Strict mode enabled, variables {} are not defined!{}", sigils(.names), in_file(.file))]
	UnresolvedVariables {
		names: Vec<String>,
		file: Option<PathBuf>,
	},

	#[error("Strict mode enabled, variables {} defined several times!{}", sigils(.names), in_file(.file))]
	DuplicateVariables {
		names: Vec<String>,
		file: Option<PathBuf>,
	},

	#[error("__include must be a string or list of strings (in file: {})", .file.display())]
	InvalidInclude { file: PathBuf },

	#[error("Include cycle detected at {}", .path.display())]
	IncludeCycle { path: PathBuf },

	#[error("Included TOML not found: {}", .path.display())]
	IncludeNotFound { path: PathBuf },

	#[error("'{field}': {message}")]
	Conversion { field: String, message: String },

	#[error("'{field}' in config file but not in config model!")]
	UnknownField { field: String },

	#[error("TOML file not found: {}", .path.display())]
	SourceNotFound { path: PathBuf },

	#[error("Failed to read file: {}", .path.display())]
	SourceRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Error parsing TOML file '{}': {source}", .path.display())]
	Syntax {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to deserialize configuration: {0}")]
	Deserialize(#[source] serde_json::Error),

	#[error("Background load task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

/// A single (field-path, message) pair of the validation error set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
	pub path: String,
	pub message: String,
}

impl fmt::Display for ErrorEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "'{}': {}", self.path, self.message)
	}
}

impl WeaveError {
	/// Build a conversion failure for `field`.
	pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
		WeaveError::Conversion {
			field: field.into(),
			message: message.into(),
		}
	}

	/// Unresolved variable names, sorted and deduplicated.
	pub fn unresolved(names: impl IntoIterator<Item = String>, file: Option<PathBuf>) -> Self {
		WeaveError::UnresolvedVariables {
			names: sorted_unique(names),
			file,
		}
	}

	/// Duplicate variable names, sorted and deduplicated.
	pub fn duplicates(names: impl IntoIterator<Item = String>, file: Option<PathBuf>) -> Self {
		WeaveError::DuplicateVariables {
			names: sorted_unique(names),
			file,
		}
	}

	/// Attach the originating file to batched variable errors.
	pub fn in_file(self, path: &std::path::Path) -> Self {
		match self {
			WeaveError::UnresolvedVariables { names, file: None } => WeaveError::UnresolvedVariables {
				names,
				file: Some(path.to_path_buf()),
			},
			WeaveError::DuplicateVariables { names, file: None } => WeaveError::DuplicateVariables {
				names,
				file: Some(path.to_path_buf()),
			},
			other => other,
		}
	}

	/// The validation error set carried by this error.
	pub fn entries(&self) -> Vec<ErrorEntry> {
		let (path, message) = match self {
			WeaveError::UnresolvedVariables { .. } | WeaveError::DuplicateVariables { .. } => {
				(ENV_ERROR_PATH.to_string(), self.to_string())
			}
			WeaveError::InvalidInclude { .. }
			| WeaveError::IncludeCycle { .. }
			| WeaveError::IncludeNotFound { .. } => (INCLUDE_ERROR_PATH.to_string(), self.to_string()),
			WeaveError::Conversion { field, message } => (field.clone(), message.clone()),
			WeaveError::UnknownField { field } => (field.clone(), self.to_string()),
			WeaveError::SourceNotFound { path }
			| WeaveError::SourceRead { path, .. }
			| WeaveError::Syntax { path, .. } => (path.display().to_string(), self.to_string()),
			WeaveError::Deserialize(_) | WeaveError::Join(_) => (String::new(), self.to_string()),
		};
		vec![ErrorEntry { path, message }]
	}
}

fn sorted_unique(names: impl IntoIterator<Item = String>) -> Vec<String> {
	let mut names: Vec<String> = names.into_iter().collect();
	names.sort();
	names.dedup();
	names
}

fn sigils(names: &[String]) -> String {
	names
		.iter()
		.map(|name| format!("${name}"))
		.collect::<Vec<_>>()
		.join(", ")
}

fn in_file(file: &Option<PathBuf>) -> String {
	match file {
		Some(path) => format!(" (in file: {})", path.display()),
		None => String::new(),
	}
}

/// Result type alias using WeaveError.
pub type Result<T> = std::result::Result<T, WeaveError>;
