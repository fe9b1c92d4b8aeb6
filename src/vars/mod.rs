//! Variable sources for substitution.
//!
//! This module handles:
//! - Capturing an immutable snapshot of the process environment
//! - Reading `.env`-style variable files
//! - Merging both into the Variable Mapping used by a single load

pub mod envfile;

pub use envfile::{parse_env_str, read_env_file};

use std::collections::BTreeMap;

/// Values that count as "on" for boolean bootstrap toggles.
const TRUTHY_VALUES: [&str; 5] = ["true", "1", "yes", "y", "on"];

/// Immutable copy of the process environment, taken once per load.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
	vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
	/// Capture the current process environment. Non-UTF-8 entries are dropped.
	pub fn capture() -> Self {
		let vars = std::env::vars_os()
			.filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
			.collect();
		EnvSnapshot { vars }
	}

	/// Build a snapshot from explicit pairs.
	pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		EnvSnapshot {
			vars: pairs
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.vars.get(name).map(String::as_str)
	}

	/// Check if a variable is set to one of the truthy toggle values.
	pub fn is_truthy(&self, name: &str) -> bool {
		self.get(name)
			.map(|value| TRUTHY_VALUES.contains(&value.to_lowercase().as_str()))
			.unwrap_or(false)
	}

	fn as_map(&self) -> &BTreeMap<String, String> {
		&self.vars
	}
}

/// The Variable Mapping: name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMap {
	vars: BTreeMap<String, String>,
}

impl VarMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Merge the environment (when enabled) and file variables.
	///
	/// File variables are applied last, so they win on conflict.
	pub fn build(snapshot: &EnvSnapshot, include_environment: bool, file_vars: VarMap) -> Self {
		let mut merged = VarMap::new();
		if include_environment {
			merged.vars.extend(
				snapshot
					.as_map()
					.iter()
					.map(|(k, v)| (k.clone(), v.clone())),
			);
		}
		merged.vars.extend(file_vars.vars);
		merged
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.vars.get(name).map(String::as_str)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.vars.contains_key(name)
	}

	/// Insert a variable, returning the previous value if any.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
		self.vars.insert(name.into(), value.into())
	}

	pub fn len(&self) -> usize {
		self.vars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vars.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

impl<K, V> FromIterator<(K, V)> for VarMap
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		VarMap {
			vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}

impl From<&EnvSnapshot> for VarMap {
	fn from(snapshot: &EnvSnapshot) -> Self {
		VarMap {
			vars: snapshot.as_map().clone(),
		}
	}
}
