//! Variable substitution for configuration text.
//!
//! This module handles:
//! - Tokenizing `$$`, `$<digits>`, `${NAME|-default}` and `$NAME|default`
//! - Resolving references against a [`VarMap`]
//! - Rebuilding the text in a single pass from the collected edits

pub mod scanner;

pub use scanner::{Token, TokenKind, scan};

use crate::error::{Result, WeaveError};
use crate::vars::VarMap;
use std::collections::BTreeSet;
use std::ops::Range;

/// A replacement of `span` in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
	span: Range<usize>,
	replacement: String,
}

/// Outcome of resolving every token of a text.
#[derive(Debug, Default)]
struct Resolution {
	edits: Vec<Edit>,
	unresolved: BTreeSet<String>,
}

fn resolve(text: &str, vars: &VarMap) -> Resolution {
	let mut resolution = Resolution::default();

	for token in scan(text) {
		let replacement = match token.kind {
			TokenKind::Escape { literal } => Some(literal),
			TokenKind::Reference { name, default, .. } => {
				match vars.get(&name).map(str::to_string).or(default) {
					Some(value) => Some(value),
					None => {
						resolution.unresolved.insert(name);
						None
					}
				}
			}
		};

		if let Some(replacement) = replacement {
			resolution.edits.push(Edit {
				span: token.span,
				replacement,
			});
		}
	}

	resolution
}

/// Apply non-overlapping, source-ordered edits in one rebuild.
fn apply_edits(text: &str, edits: &[Edit]) -> String {
	let mut out = String::with_capacity(text.len());
	let mut last = 0;

	for edit in edits {
		out.push_str(&text[last..edit.span.start]);
		out.push_str(&edit.replacement);
		last = edit.span.end;
	}
	out.push_str(&text[last..]);

	out
}

/// Substitute every placeholder in `text`.
///
/// In strict mode any reference with no value and no default fails with an
/// error listing every such name. Otherwise those placeholders are kept
/// verbatim.
pub fn substitute(text: &str, vars: &VarMap, strict: bool) -> Result<String> {
	let resolution = resolve(text, vars);

	if !resolution.unresolved.is_empty() {
		if strict {
			return Err(WeaveError::unresolved(resolution.unresolved, None));
		}
		tracing::warn!(
			unresolved = ?resolution.unresolved,
			"variables are not defined, keeping placeholders"
		);
	}

	Ok(apply_edits(text, &resolution.edits))
}

/// Replace defined `$NAME` and `${NAME}` references and leave everything
/// else as written.
///
/// Escapes are not collapsed and defaults are never applied. A bare
/// `$NAME|text` only has its `$NAME` part replaced.
pub fn expand_known(text: &str, vars: &VarMap) -> String {
	let mut edits = Vec::new();

	for token in scan(text) {
		let TokenKind::Reference { name, default, braced } = token.kind else {
			continue;
		};
		let Some(value) = vars.get(&name) else {
			continue;
		};

		let span = match (braced, default) {
			(_, None) => token.span,
			(false, Some(_)) => token.span.start..token.span.start + 1 + name.len(),
			(true, Some(_)) => continue,
		};
		edits.push(Edit {
			span,
			replacement: value.to_string(),
		});
	}

	apply_edits(text, &edits)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn vars(pairs: &[(&str, &str)]) -> VarMap {
		pairs.iter().copied().collect()
	}

	#[test]
	fn test_identity_without_placeholders() {
		let text = "name = \"demo\"\n[server]\nport = 80\n";
		assert_eq!(substitute(text, &VarMap::new(), true).unwrap(), text);
	}

	#[test]
	fn test_defined_variable() {
		let out = substitute("${X}", &vars(&[("X", "v")]), true).unwrap();
		assert_eq!(out, "v");
	}

	#[test]
	fn test_value_wins_over_default() {
		let out = substitute("${X|-d}", &vars(&[("X", "v")]), true).unwrap();
		assert_eq!(out, "v");
	}

	#[test]
	fn test_default_used_when_undefined() {
		let out = substitute("${X|-d}", &VarMap::new(), true).unwrap();
		assert_eq!(out, "d");
	}

	#[test]
	fn test_empty_value_is_defined() {
		let out = substitute("[${X|-d}]", &vars(&[("X", "")]), true).unwrap();
		assert_eq!(out, "[]");
	}

	#[test]
	fn test_bare_reference_and_default() {
		let env = vars(&[("USER", "app")]);
		let out = substitute("u = \"$USER\"\nh = \"$HOST|localhost\"", &env, true).unwrap();
		assert_eq!(out, "u = \"app\"\nh = \"localhost\"");
	}

	#[test]
	fn test_strict_unresolved_is_batched() {
		let err = substitute("a = \"${B}\"\nb = \"$A\"\nc = \"${B}\"", &VarMap::new(), true).unwrap_err();
		match err {
			WeaveError::UnresolvedVariables { names, file } => {
				assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
				assert!(file.is_none());
			}
			other => panic!("Expected UnresolvedVariables error, got {other:?}"),
		}
	}

	#[test]
	fn test_non_strict_keeps_placeholder() {
		let out = substitute("a = \"${X}\"\nb = \"$Y\"", &VarMap::new(), false).unwrap();
		assert_eq!(out, "a = \"${X}\"\nb = \"$Y\"");
	}

	#[test]
	fn test_escaped_dollar_regardless_of_mode() {
		let env = vars(&[("abc", "nope")]);
		assert_eq!(substitute("$$abc", &env, true).unwrap(), "$abc");
		assert_eq!(substitute("$$abc", &VarMap::new(), false).unwrap(), "$abc");
	}

	#[test]
	fn test_digit_escape() {
		let out = substitute("y = \"$1def\"", &VarMap::new(), true).unwrap();
		assert_eq!(out, "y = \"1def\"");
	}

	#[test]
	fn test_substituted_values_are_not_rescanned() {
		let env = vars(&[("A", "${B}"), ("B", "never")]);
		let out = substitute("${A} $A", &env, true).unwrap();
		assert_eq!(out, "${B} ${B}");
	}

	#[test]
	fn test_overlapping_names_resolve_independently() {
		let env = vars(&[("HOST", "h"), ("HOST_NAME", "hn")]);
		let out = substitute("$HOST_NAME $HOST ${HOST}", &env, true).unwrap();
		assert_eq!(out, "hn h h");
	}

	#[test]
	fn test_expand_known_keeps_unknown() {
		let out = expand_known("$KNOWN/$UNKNOWN", &vars(&[("KNOWN", "k")]));
		assert_eq!(out, "k/$UNKNOWN");
	}

	#[test]
	fn test_expand_known_skips_escapes_and_defaults() {
		let env = vars(&[("K", "k")]);
		assert_eq!(expand_known("pa$$word abc$1def", &env), "pa$$word abc$1def");
		assert_eq!(expand_known("${MISSING|-x} $MISSING|y", &env), "${MISSING|-x} $MISSING|y");
		assert_eq!(expand_known("${K|-x} $K|y ${K}", &env), "${K|-x} k|y k");
	}
}
