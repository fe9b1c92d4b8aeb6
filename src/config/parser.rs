use crate::config::include::expand_file_includes;
use crate::error::{Result, WeaveError};
use crate::subst::substitute;
use crate::vars::VarMap;
use serde_json::{Map, Number, Value as Json};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Origin reported for text that did not come from a file.
pub const INLINE_SOURCE: &str = "<inline>";

/// Read a source file, distinguishing a missing file from other I/O failures.
pub fn read_source(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|source| read_error(path, source))
}

pub(crate) fn read_error(path: &Path, source: std::io::Error) -> WeaveError {
	if source.kind() == std::io::ErrorKind::NotFound {
		WeaveError::SourceNotFound {
			path: path.to_path_buf(),
		}
	} else {
		WeaveError::SourceRead {
			path: path.to_path_buf(),
			source,
		}
	}
}

/// Read, substitute, parse and include-expand a TOML file.
pub fn read_toml(path: &Path, vars: &VarMap, strict: bool) -> Result<Table> {
	tracing::debug!(path = %path.display(), "reading TOML file");
	let content = read_source(path)?;
	let table = parse_text(&content, vars, strict, Some(path))?;
	expand_file_includes(table, path, vars, strict)
}

/// Substitute and parse in-memory TOML text.
///
/// Include directives are left in place since there is no directory to
/// resolve them against.
pub fn substitute_and_parse(content: &str, vars: &VarMap, strict: bool) -> Result<Table> {
	parse_text(content, vars, strict, None)
}

/// Substitute then parse. `path` names the origin in errors.
pub(crate) fn parse_text(content: &str, vars: &VarMap, strict: bool, path: Option<&Path>) -> Result<Table> {
	let substituted = substitute(content, vars, strict).map_err(|e| match path {
		Some(path) => e.in_file(path),
		None => e,
	})?;

	toml::from_str::<Table>(&substituted).map_err(|source| WeaveError::Syntax {
		path: path.map_or_else(|| PathBuf::from(INLINE_SOURCE), Path::to_path_buf),
		source,
	})
}

/// Render a parsed table as JSON, keeping key order.
pub fn to_json(table: &Table) -> Json {
	Json::Object(
		table
			.iter()
			.map(|(k, v)| (k.clone(), value_to_json(v)))
			.collect::<Map<_, _>>(),
	)
}

/// Render one TOML value as JSON. Datetimes become strings.
pub fn value_to_json(value: &Value) -> Json {
	match value {
		Value::String(s) => Json::String(s.clone()),
		Value::Integer(i) => Json::from(*i),
		Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
		Value::Boolean(b) => Json::Bool(*b),
		Value::Datetime(dt) => Json::String(dt.to_string()),
		Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
		Value::Table(table) => to_json(table),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn vars(pairs: &[(&str, &str)]) -> VarMap {
		pairs.iter().copied().collect()
	}

	#[test]
	fn test_parse_empty() {
		let table = substitute_and_parse("", &VarMap::new(), true).unwrap();
		assert!(table.is_empty());
	}

	#[test]
	fn test_parse_substituted_values() {
		let content = r#"
name = "${APP|-demo}"
[database]
host = "$DB_HOST"
port = ${DB_PORT|-5432}
"#;
		let table = substitute_and_parse(content, &vars(&[("DB_HOST", "db.local")]), true).unwrap();

		assert_eq!(table["name"].as_str(), Some("demo"));
		assert_eq!(table["database"]["host"].as_str(), Some("db.local"));
		assert_eq!(table["database"]["port"].as_integer(), Some(5432));
	}

	#[test]
	fn test_parse_error_names_inline_origin() {
		let result = substitute_and_parse("key = ", &VarMap::new(), true);

		match result.unwrap_err() {
			WeaveError::Syntax { path, .. } => assert_eq!(path, PathBuf::from(INLINE_SOURCE)),
			other => panic!("Expected Syntax error, got {other:?}"),
		}
	}

	#[test]
	fn test_substituted_value_breaking_syntax_is_parse_error() {
		let result = substitute_and_parse("port = ${PORT}", &vars(&[("PORT", "not a number")]), true);
		assert!(matches!(result.unwrap_err(), WeaveError::Syntax { .. }));
	}

	#[test]
	fn test_unresolved_in_file_names_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("env.toml");
		std::fs::write(&path, "a = \"${MISSING}\"").unwrap();

		let err = read_toml(&path, &VarMap::new(), true).unwrap_err();
		assert!(err.to_string().contains("$MISSING"));
		assert!(err.to_string().contains("env.toml"));
	}

	#[test]
	fn test_missing_file() {
		let result = read_toml(Path::new("/nonexistent/env.toml"), &VarMap::new(), true);
		assert!(matches!(result.unwrap_err(), WeaveError::SourceNotFound { .. }));
	}

	#[test]
	fn test_to_json_keeps_order_and_datetimes() {
		let table = substitute_and_parse(
			"z = 1\na = [true, 1.5]\nwhen = 1979-05-27T07:32:00Z\n[t]\nk = \"v\"",
			&VarMap::new(),
			true,
		)
		.unwrap();

		let rendered = to_json(&table);
		assert_eq!(
			rendered,
			json!({"z": 1, "a": [true, 1.5], "when": "1979-05-27T07:32:00Z", "t": {"k": "v"}})
		);
		let keys: Vec<_> = rendered.as_object().unwrap().keys().cloned().collect();
		assert_eq!(keys, vec!["z", "a", "when", "t"]);
	}
}
