use std::ops::Range;

/// Separator between name and default inside `${NAME|-default}`.
pub const BRACED_DEFAULT_SEPARATOR: &str = "|-";

/// Separator between name and default after `$NAME|default`.
pub const BARE_DEFAULT_SEPARATOR: char = '|';

/// What a scanned `$` token means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
	/// `$$` or `$<digits>`: replaced by `literal`, never looked up.
	Escape { literal: String },

	/// `${NAME}` / `${NAME|-default}` or `$NAME` / `$NAME|default`.
	Reference {
		name: String,
		default: Option<String>,
		braced: bool,
	},
}

/// A placeholder found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	/// Byte span of the whole token in the original text.
	pub span: Range<usize>,

	pub kind: TokenKind,

	/// Quote character immediately before the token, if any.
	pub quote: Option<char>,
}

fn is_name_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn is_quote(c: char) -> bool {
	c == '"' || c == '\''
}

/// Scan `text` left to right and return every placeholder token.
///
/// Tokens never overlap and are returned in source order. A `$` that does
/// not start a valid token is left as plain text.
pub fn scan(text: &str) -> Vec<Token> {
	let mut tokens = Vec::new();
	let mut pos = 0;

	while let Some(offset) = text[pos..].find('$') {
		let start = pos + offset;
		let quote = text[..start].chars().next_back().filter(|c| is_quote(*c));

		match scan_token(text, start, quote) {
			Some(token) => {
				pos = token.span.end;
				tokens.push(token);
			}
			None => pos = start + 1,
		}
	}

	tokens
}

fn scan_token(text: &str, start: usize, quote: Option<char>) -> Option<Token> {
	let rest = &text[start + 1..];
	let next = rest.chars().next()?;

	let (len, kind) = if next == '$' {
		(
			2,
			TokenKind::Escape {
				literal: "$".to_string(),
			},
		)
	} else if next.is_ascii_digit() {
		let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
		(1 + digits.len(), TokenKind::Escape { literal: digits })
	} else if next == '{' {
		scan_braced(rest)?
	} else if is_name_char(next) {
		scan_bare(rest, quote)
	} else {
		return None;
	};

	Some(Token {
		span: start..start + len,
		kind,
		quote,
	})
}

/// `rest` starts at `{`. Returns the token length including the leading `$`.
fn scan_braced(rest: &str) -> Option<(usize, TokenKind)> {
	let close = rest.find('}')?;
	let inner = &rest[1..close];

	let (name, default) = match inner.find(BRACED_DEFAULT_SEPARATOR) {
		Some(idx) => (
			&inner[..idx],
			Some(inner[idx + BRACED_DEFAULT_SEPARATOR.len()..].to_string()),
		),
		None => (inner, None),
	};

	if name.is_empty() || !name.chars().all(is_name_char) {
		return None;
	}

	Some((
		1 + close + 1,
		TokenKind::Reference {
			name: name.to_string(),
			default,
			braced: true,
		},
	))
}

/// `rest` starts at the first name character.
///
/// A bare default runs up to the quote that opened the token, or up to
/// whitespace when the token is unquoted.
fn scan_bare(rest: &str, quote: Option<char>) -> (usize, TokenKind) {
	let name_len: usize = rest
		.chars()
		.take_while(|c| is_name_char(*c))
		.map(char::len_utf8)
		.sum();
	let name = &rest[..name_len];
	let mut len = 1 + name_len;

	let mut default = None;
	let after = &rest[name_len..];
	if let Some(value) = after.strip_prefix(BARE_DEFAULT_SEPARATOR) {
		let value_len: usize = value
			.chars()
			.take_while(|c| match quote {
				Some(q) => *c != q && *c != '\n',
				None => !c.is_whitespace(),
			})
			.map(char::len_utf8)
			.sum();
		default = Some(value[..value_len].to_string());
		len += BARE_DEFAULT_SEPARATOR.len_utf8() + value_len;
	}

	(
		len,
		TokenKind::Reference {
			name: name.to_string(),
			default,
			braced: false,
		},
	)
}
