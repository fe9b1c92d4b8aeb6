use crate::error::{Result, WeaveError};
use crate::subst::expand_known;
use crate::vars::{EnvSnapshot, VarMap};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static ENV_LINE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?:export\s+)?(?P<name>[\w\-.]+)\s*=(?P<value>.*)$").expect("env line pattern is valid")
});

/// Read variables from a `.env`-style file.
///
/// A missing path (or a path that is not a file) yields an empty mapping.
pub fn read_env_file(path: Option<&Path>, env: &EnvSnapshot, strict: bool) -> Result<VarMap> {
	let Some(path) = path.filter(|p| p.is_file()) else {
		return Ok(VarMap::new());
	};

	let content = std::fs::read_to_string(path).map_err(|source| WeaveError::SourceRead {
		path: path.to_path_buf(),
		source,
	})?;

	parse_env_str(&content, env, strict).map_err(|e| e.in_file(path))
}

/// Parse `.env` content.
///
/// Supports an optional `export ` prefix, single or double quoted values
/// (double quotes unescape `\n`, `\t`, `\"` and `\\`), inline `#` comments
/// after unquoted values (`\#` keeps a literal hash) and `$VAR` expansion
/// against the environment snapshot. Lines without `=` or whose name starts
/// with a digit are skipped.
pub fn parse_env_str(content: &str, env: &EnvSnapshot, strict: bool) -> Result<VarMap> {
	let expansion_vars = VarMap::from(env);
	let mut vars = VarMap::new();
	let mut duplicates = BTreeSet::new();

	for raw in content.lines() {
		let line = raw.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let line = expand_known(line, &expansion_vars);
		let Some(caps) = ENV_LINE.captures(&line) else {
			continue;
		};

		let name = &caps["name"];
		if name.starts_with(|c: char| c.is_ascii_digit()) {
			continue;
		}

		let value = parse_value(&caps["value"]);
		if vars.insert(name, value).is_some() {
			duplicates.insert(name.to_string());
		}
	}

	if !duplicates.is_empty() {
		if strict {
			return Err(WeaveError::duplicates(duplicates, None));
		}
		tracing::warn!(?duplicates, "variables defined several times, last definition wins");
	}

	Ok(vars)
}

fn parse_value(raw: &str) -> String {
	let value = raw.trim_start();
	if value.starts_with('"') || value.starts_with('\'') {
		unquote(value)
	} else {
		strip_inline_comment(value)
	}
}

/// Strip matching quotes; double-quoted values get simple escape processing.
fn unquote(value: &str) -> String {
	let value = value.trim();
	let mut chars = value.chars();
	let (first, last) = (chars.next(), chars.next_back());

	match (first, last) {
		(Some('\''), Some('\'')) => value[1..value.len() - 1].to_string(),
		(Some('"'), Some('"')) => unescape_double_quoted(&value[1..value.len() - 1]),
		_ => value.to_string(),
	}
}

fn unescape_double_quoted(inner: &str) -> String {
	let mut out = String::with_capacity(inner.len());
	let mut chars = inner.chars().peekable();

	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		match chars.peek() {
			Some('n') => out.push('\n'),
			Some('t') => out.push('\t'),
			Some('"') => out.push('"'),
			Some('\\') => out.push('\\'),
			_ => {
				out.push(c);
				continue;
			}
		}
		chars.next();
	}

	out
}

/// Cut an unquoted value at the first unescaped `#`.
fn strip_inline_comment(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	let mut escaped = false;

	for c in value.chars() {
		if escaped {
			out.push(c);
			escaped = false;
		} else if c == '\\' {
			escaped = true;
		} else if c == '#' {
			break;
		} else {
			out.push(c);
		}
	}

	out.trim().to_string()
}
