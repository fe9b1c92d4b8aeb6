use crate::config::include::expand_file_includes;
use crate::config::parser::{parse_text, read_error, read_toml};
use crate::config::types::{LoadOptions, ResolvedOptions};
use crate::error::{Result, WeaveError};
use crate::schema::{ConfigObject, Schema};
use crate::vars::{VarMap, parse_env_str, read_env_file};
use std::path::{Path, PathBuf};
use toml::Table;

/// A loaded configuration tree: variables gathered, placeholders
/// substituted, TOML parsed and includes expanded.
#[derive(Debug, Clone)]
pub struct Loader {
	raw: Table,
	vars: VarMap,
	strict: bool,
	source: PathBuf,
}

impl Loader {
	/// Run the load pipeline synchronously.
	pub fn new(options: LoadOptions) -> Result<Self> {
		let resolved = options.resolve();

		let file_vars = read_env_file(resolved.env_file.as_deref(), &resolved.snapshot, resolved.strict)?;
		let vars = build_vars(&resolved, file_vars);
		let raw = read_toml(&resolved.toml_file, &vars, resolved.strict)?;

		Ok(Self::finish(resolved, raw, vars))
	}

	/// Run the load pipeline on a tokio runtime.
	///
	/// The variable file and the top-level TOML file are read with
	/// `tokio::fs`; include expansion runs on the blocking pool.
	pub async fn new_async(options: LoadOptions) -> Result<Self> {
		let resolved = options.resolve();

		let file_vars = match resolved.env_file.as_deref() {
			Some(path) if is_file(path).await => {
				let content = tokio::fs::read_to_string(path)
					.await
					.map_err(|source| WeaveError::SourceRead {
						path: path.to_path_buf(),
						source,
					})?;
				parse_env_str(&content, &resolved.snapshot, resolved.strict).map_err(|e| e.in_file(path))?
			}
			_ => VarMap::new(),
		};
		let vars = build_vars(&resolved, file_vars);

		let path = resolved.toml_file.clone();
		tracing::debug!(path = %path.display(), "reading TOML file");
		let content = tokio::fs::read_to_string(&path)
			.await
			.map_err(|source| read_error(&path, source))?;
		let table = parse_text(&content, &vars, resolved.strict, Some(&path))?;

		let strict = resolved.strict;
		let (raw, vars) = tokio::task::spawn_blocking(move || {
			expand_file_includes(table, &path, &vars, strict).map(|raw| (raw, vars))
		})
		.await??;

		Ok(Self::finish(resolved, raw, vars))
	}

	fn finish(resolved: ResolvedOptions, raw: Table, vars: VarMap) -> Self {
		Loader {
			raw,
			vars,
			strict: resolved.strict,
			source: resolved.toml_file,
		}
	}

	/// The generic tree after substitution and include expansion.
	pub fn raw(&self) -> &Table {
		&self.raw
	}

	pub fn into_raw(self) -> Table {
		self.raw
	}

	/// The Variable Mapping used for substitution.
	pub fn vars(&self) -> &VarMap {
		&self.vars
	}

	/// Effective strict flag, after the bootstrap override.
	pub fn strict(&self) -> bool {
		self.strict
	}

	/// The top-level TOML file.
	pub fn source(&self) -> &Path {
		&self.source
	}

	/// Coerce the tree into an instance of `schema`.
	pub fn validate(&self, schema: &Schema) -> Result<ConfigObject> {
		schema.coerce(&self.raw)
	}
}

fn build_vars(resolved: &ResolvedOptions, file_vars: VarMap) -> VarMap {
	VarMap::build(&resolved.snapshot, resolved.include_environment, file_vars)
}

async fn is_file(path: &Path) -> bool {
	tokio::fs::metadata(path)
		.await
		.map(|meta| meta.is_file())
		.unwrap_or(false)
}

/// Load and validate in one call.
pub fn load(schema: &Schema, options: LoadOptions) -> Result<ConfigObject> {
	Loader::new(options)?.validate(schema)
}

/// Async counterpart of [`load`].
pub async fn load_async(schema: &Schema, options: LoadOptions) -> Result<ConfigObject> {
	Loader::new_async(options).await?.validate(schema)
}

/// Substitute, parse and validate in-memory TOML text.
pub fn load_str(schema: &Schema, content: &str, vars: &VarMap, strict: bool) -> Result<ConfigObject> {
	schema.coerce(&crate::config::parser::substitute_and_parse(content, vars, strict)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldType;
	use crate::vars::EnvSnapshot;
	use tempfile::TempDir;

	fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
		let path = dir.path().join(name);
		std::fs::write(&path, content).unwrap();
		path
	}

	fn options(dir: &TempDir) -> LoadOptions {
		LoadOptions::new()
			.toml_file(dir.path().join("env.toml"))
			.env_file(dir.path().join(".env"))
			.environment(EnvSnapshot::from_pairs([("HOME_DIR", "/home/app"), ("P", "1234")]))
	}

	#[test]
	fn test_env_file_wins_over_environment() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, ".env", "P=8081\nDATA=$HOME_DIR/data");
		write(&dir, "env.toml", "port = ${P}\ndata = \"${DATA}\"");

		let loader = Loader::new(options(&dir)).unwrap();
		assert_eq!(loader.raw()["port"].as_integer(), Some(8081));
		assert_eq!(loader.raw()["data"].as_str(), Some("/home/app/data"));
		assert_eq!(loader.vars().get("HOME_DIR"), Some("/home/app"));
		assert!(loader.strict());
	}

	#[test]
	fn test_without_environment() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "env.toml", "port = ${P|-8080}");

		let loader = Loader::new(options(&dir).include_environment(false)).unwrap();
		assert_eq!(loader.raw()["port"].as_integer(), Some(8080));
		assert!(loader.vars().is_empty());
	}

	#[test]
	fn test_missing_toml_file() {
		let dir = tempfile::tempdir().unwrap();

		match Loader::new(options(&dir)).unwrap_err() {
			WeaveError::SourceNotFound { path } => assert!(path.ends_with("env.toml")),
			other => panic!("Expected SourceNotFound error, got {other:?}"),
		}
	}

	#[test]
	fn test_validate() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "env.toml", "port = \"${P}\"\nname = \"svc\"");

		let schema = Schema::builder("App")
			.field("port", FieldType::int())
			.field("name", FieldType::str())
			.field_with_default("debug", FieldType::bool(), true)
			.build();

		let obj = load(&schema, options(&dir)).unwrap();
		assert_eq!(obj.int("port"), Some(1234));
		assert_eq!(obj.str("name"), Some("svc"));
		assert_eq!(obj.bool("debug"), Some(true));
	}

	#[test]
	fn test_load_str() {
		let schema = Schema::builder("S").field("v", FieldType::int()).build();
		let vars: VarMap = [("V", "7")].into_iter().collect();

		let obj = load_str(&schema, "v = ${V}", &vars, true).unwrap();
		assert_eq!(obj.int("v"), Some(7));
	}

	#[tokio::test]
	async fn test_new_async_matches_sync() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, ".env", "P=8081");
		write(&dir, "inc.toml", "[db]\nhost = \"h\"");
		write(&dir, "env.toml", "__include = \"inc.toml\"\nport = ${P}");

		let sync = Loader::new(options(&dir)).unwrap();
		let async_loaded = Loader::new_async(options(&dir)).await.unwrap();
		assert_eq!(sync.raw(), async_loaded.raw());
		assert_eq!(sync.vars(), async_loaded.vars());
	}

	#[tokio::test]
	async fn test_new_async_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let result = Loader::new_async(options(&dir)).await;
		assert!(matches!(result.unwrap_err(), WeaveError::SourceNotFound { .. }));
	}
}
