use crate::config::parser::{parse_text, read_source};
use crate::config::types::INCLUDE_KEY;
use crate::error::{Result, WeaveError};
use crate::vars::VarMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Expands `__include` directives, resolving paths against the file that
/// declares them.
///
/// Each included file is read, substituted, parsed and expanded at most
/// once per expander; later references reuse the cached tree.
pub struct IncludeExpander<F>
where
	F: FnMut(&str, &Path) -> Result<Table>,
{
	parse: F,
	strict: bool,
	cache: HashMap<PathBuf, Table>,
}

impl<F> IncludeExpander<F>
where
	F: FnMut(&str, &Path) -> Result<Table>,
{
	/// `parse` substitutes and parses the text of one included file.
	pub fn new(strict: bool, parse: F) -> Self {
		IncludeExpander {
			parse,
			strict,
			cache: HashMap::new(),
		}
	}

	/// Expand every directive in `node` and its child tables.
	///
	/// `file` is the file `node` came from; `seen` holds the canonical
	/// paths on the current include chain.
	pub fn expand(&mut self, node: &mut Table, file: &Path, seen: &HashSet<PathBuf>) -> Result<()> {
		if let Some(directive) = node.remove(INCLUDE_KEY) {
			let base_dir = file.parent().unwrap_or(Path::new(""));

			for target in self.targets(&directive, file)? {
				let path = canonical(&base_dir.join(&target));

				if seen.contains(&path) {
					if self.strict {
						return Err(WeaveError::IncludeCycle { path });
					}
					tracing::warn!(path = %path.display(), "include cycle, skipping");
					continue;
				}

				if !path.is_file() {
					if self.strict {
						return Err(WeaveError::IncludeNotFound { path });
					}
					tracing::warn!(path = %path.display(), "included TOML not found, skipping");
					continue;
				}

				let included = self.load(&path, seen)?;
				deep_merge(node, &included);
			}
		}

		for (_, child) in node.iter_mut() {
			if let Value::Table(child) = child {
				self.expand(child, file, seen)?;
			}
		}

		Ok(())
	}

	/// Paths named by a directive. Malformed directives are an error in
	/// strict mode and ignored otherwise.
	fn targets(&self, directive: &Value, file: &Path) -> Result<Vec<String>> {
		let targets = match directive {
			Value::String(s) => Some(vec![s.clone()]),
			Value::Array(items) => items
				.iter()
				.map(|item| item.as_str().map(str::to_string))
				.collect::<Option<Vec<_>>>(),
			_ => None,
		};

		match targets {
			Some(targets) => Ok(targets),
			None if self.strict => Err(WeaveError::InvalidInclude {
				file: file.to_path_buf(),
			}),
			None => {
				tracing::warn!(file = %file.display(), "ignoring malformed {INCLUDE_KEY}");
				Ok(Vec::new())
			}
		}
	}

	fn load(&mut self, path: &Path, seen: &HashSet<PathBuf>) -> Result<Table> {
		if let Some(cached) = self.cache.get(path) {
			tracing::debug!(path = %path.display(), "include cache hit");
			return Ok(cached.clone());
		}

		tracing::debug!(path = %path.display(), "including TOML file");
		let content = read_source(path)?;
		let mut table = (self.parse)(&content, path)?;

		let mut chain = seen.clone();
		chain.insert(path.to_path_buf());
		self.expand(&mut table, path, &chain)?;

		self.cache.insert(path.to_path_buf(), table.clone());
		Ok(table)
	}
}

/// Recursively merge `src` into `dst`.
///
/// Tables present on both sides merge key by key; any other value in `src`
/// replaces the one in `dst`. The include key is never copied.
pub fn deep_merge(dst: &mut Table, src: &Table) {
	for (key, value) in src {
		if key == INCLUDE_KEY {
			continue;
		}

		if let (Some(Value::Table(existing)), Value::Table(incoming)) = (dst.get_mut(key), value) {
			deep_merge(existing, incoming);
			continue;
		}

		dst.insert(key.clone(), value.clone());
	}
}

/// Expand the includes of a parsed top-level file.
pub fn expand_file_includes(mut table: Table, path: &Path, vars: &VarMap, strict: bool) -> Result<Table> {
	let root = canonical(path);
	let seen = HashSet::from([root.clone()]);

	let mut expander = IncludeExpander::new(strict, |content: &str, file: &Path| {
		parse_text(content, vars, strict, Some(file))
	});
	expander.expand(&mut table, &root, &seen)?;

	Ok(table)
}

fn canonical(path: &Path) -> PathBuf {
	std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
		let path = dir.path().join(name);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).unwrap();
		}
		std::fs::write(&path, content).unwrap();
		path
	}

	fn load(path: &Path, strict: bool) -> Result<Table> {
		crate::config::parser::read_toml(path, &VarMap::new(), strict)
	}

	fn table(text: &str) -> Table {
		toml::from_str(text).unwrap()
	}

	#[test]
	fn test_deep_merge() {
		let mut dst = table("a = 1\n[t]\nx = 1\ny = 1");
		let src = table("b = 2\n__include = \"x.toml\"\n[t]\ny = 2\nz = 3");

		deep_merge(&mut dst, &src);

		assert_eq!(dst, table("a = 1\nb = 2\n[t]\nx = 1\ny = 2\nz = 3"));
	}

	#[test]
	fn test_deep_merge_replaces_non_tables() {
		let mut dst = table("t = 1\nl = [1, 2]");
		deep_merge(&mut dst, &table("l = [3]\n[t]\nk = 1"));
		assert_eq!(dst, table("l = [3]\n[t]\nk = 1"));
	}

	#[test]
	fn test_include_string_and_list() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "a.toml", "a = 1");
		write(&dir, "b.toml", "b = 2");
		let one = write(&dir, "one.toml", "__include = \"a.toml\"\nx = 0");
		let many = write(&dir, "many.toml", "__include = [\"a.toml\", \"b.toml\"]");

		assert_eq!(load(&one, true).unwrap(), table("x = 0\na = 1"));
		assert_eq!(load(&many, true).unwrap(), table("a = 1\nb = 2"));
	}

	#[test]
	fn test_include_overrides_declaring_table() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "inc.toml", "value = \"included\"\nextra = 1");
		let main = write(&dir, "main.toml", "value = \"main\"\n__include = \"inc.toml\"");

		let loaded = load(&main, true).unwrap();
		assert_eq!(loaded["value"].as_str(), Some("included"));
		assert_eq!(loaded["extra"].as_integer(), Some(1));
		assert!(!loaded.contains_key(INCLUDE_KEY));
	}

	#[test]
	fn test_nested_include_and_relative_paths() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "sub/inner.toml", "k = \"inner\"");
		write(&dir, "sub/mid.toml", "__include = \"inner.toml\"\nmid = true");
		let main = write(&dir, "main.toml", "[section]\n__include = \"sub/mid.toml\"");

		let loaded = load(&main, true).unwrap();
		assert_eq!(loaded, table("[section]\nmid = true\nk = \"inner\""));
	}

	#[test]
	fn test_same_file_twice_is_not_a_cycle() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "inc.toml", "a = { key = \"val\" }");
		let main = write(&dir, "main.toml", "[x]\n__include = \"inc.toml\"\n[y]\n__include = \"inc.toml\"");

		let loaded = load(&main, true).unwrap();
		assert_eq!(loaded["x"], loaded["y"]);
		assert_eq!(loaded["x"]["a"]["key"].as_str(), Some("val"));
	}

	#[test]
	fn test_cycle_strict() {
		let dir = tempfile::tempdir().unwrap();
		let a = write(&dir, "a.toml", "__include = \"b.toml\"\na = 1");
		write(&dir, "b.toml", "__include = \"a.toml\"\nb = 1");

		match load(&a, true).unwrap_err() {
			WeaveError::IncludeCycle { path } => assert!(path.ends_with("a.toml")),
			other => panic!("Expected IncludeCycle error, got {other:?}"),
		}
	}

	#[test]
	fn test_cycle_non_strict_terminates() {
		let dir = tempfile::tempdir().unwrap();
		let a = write(&dir, "a.toml", "__include = \"b.toml\"\na = 1");
		write(&dir, "b.toml", "__include = \"a.toml\"\nb = 1");

		assert_eq!(load(&a, false).unwrap(), table("a = 1\nb = 1"));
	}

	#[test]
	fn test_cycle_through_different_spellings() {
		let dir = tempfile::tempdir().unwrap();
		let a = write(&dir, "a.toml", "__include = \"./sub/b.toml\"\na = 1");
		write(&dir, "sub/b.toml", "__include = \"../a.toml\"\nb = 1");

		match load(&a, true).unwrap_err() {
			WeaveError::IncludeCycle { path } => {
				assert_eq!(path, std::fs::canonicalize(&a).unwrap());
			}
			other => panic!("Expected IncludeCycle error, got {other:?}"),
		}
		assert_eq!(load(&a, false).unwrap(), table("a = 1\nb = 1"));
	}

	#[test]
	fn test_self_include() {
		let dir = tempfile::tempdir().unwrap();
		let main = write(&dir, "main.toml", "__include = \"main.toml\"\nv = 1");

		assert!(matches!(load(&main, true).unwrap_err(), WeaveError::IncludeCycle { .. }));
		assert_eq!(load(&main, false).unwrap(), table("v = 1"));
	}

	#[test]
	fn test_missing_include() {
		let dir = tempfile::tempdir().unwrap();
		let main = write(&dir, "main.toml", "__include = \"nope.toml\"\nv = 1");

		match load(&main, true).unwrap_err() {
			WeaveError::IncludeNotFound { path } => assert!(path.ends_with("nope.toml")),
			other => panic!("Expected IncludeNotFound error, got {other:?}"),
		}
		assert_eq!(load(&main, false).unwrap(), table("v = 1"));
	}

	#[test]
	fn test_malformed_directive() {
		let dir = tempfile::tempdir().unwrap();
		let main = write(&dir, "main.toml", "__include = [1, 2]\nv = 1");

		assert!(matches!(load(&main, true).unwrap_err(), WeaveError::InvalidInclude { .. }));
		assert_eq!(load(&main, false).unwrap(), table("v = 1"));
	}

	#[test]
	fn test_included_file_is_substituted() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "inc.toml", "port = ${PORT|-8080}");
		let main = write(&dir, "main.toml", "__include = \"inc.toml\"");

		let vars: VarMap = [("PORT", "9000")].into_iter().collect();
		let loaded = crate::config::parser::read_toml(&main, &vars, true).unwrap();
		assert_eq!(loaded["port"].as_integer(), Some(9000));
	}

	#[test]
	fn test_included_file_unresolved_names_that_file() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir, "inc.toml", "v = \"${NOPE}\"");
		let main = write(&dir, "main.toml", "__include = \"inc.toml\"");

		let err = load(&main, true).unwrap_err();
		assert!(err.to_string().contains("inc.toml"));
	}
}
