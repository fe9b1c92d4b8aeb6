use crate::error::{Result, WeaveError};
use crate::schema::types::{EnumDecl, FieldType, Primitive, Scalar, Schema};
use crate::schema::value::{ConfigObject, Typed};
use toml::{Table, Value};

/// Strings that convert to `true` for boolean fields.
pub const BOOL_TRUE_VALUES: [&str; 6] = ["true", "1", "yes", "y", "on", "t"];

/// Build a [`ConfigObject`] for `schema` from a parsed table.
///
/// Every declared field is converted first; a key in `table` that the schema
/// does not declare fails afterwards with [`WeaveError::UnknownField`].
pub fn coerce_table(schema: &Schema, table: &Table, prefix: &str) -> Result<ConfigObject> {
	let mut fields = Vec::with_capacity(schema.fields().len());

	for decl in schema.fields() {
		let path = child_path(prefix, &decl.name);
		let value = match table.get(&decl.name) {
			Some(value) => coerce_value(&decl.ty, value, &path)?,
			None => decl.default.clone().unwrap_or_else(|| decl.ty.zero_value()),
		};
		fields.push((decl.name.clone(), value));
	}

	if let Some(unknown) = table.keys().find(|key| schema.field(key).is_none()) {
		return Err(WeaveError::UnknownField {
			field: child_path(prefix, unknown),
		});
	}

	Ok(ConfigObject::new(schema.name().to_string(), fields))
}

/// Convert one raw value to the declared type. `path` names it in errors.
pub fn coerce_value(ty: &FieldType, value: &Value, path: &str) -> Result<Typed> {
	match ty {
		FieldType::Primitive(Primitive::Str) => Ok(Typed::Str(render_string(value))),
		FieldType::Primitive(Primitive::Int) => to_int(value, path).map(Typed::Int),
		FieldType::Primitive(Primitive::Float) => to_float(value, path).map(Typed::Float),
		FieldType::Primitive(Primitive::Bool) => Ok(Typed::Bool(to_bool(value))),
		FieldType::Primitive(Primitive::Any) => Ok(Typed::Raw(value.clone())),
		FieldType::Primitive(Primitive::None) => Ok(Typed::None),
		FieldType::Optional(inner) => coerce_value(inner, value, path),
		FieldType::Union(members) => coerce_union(members, value, path),
		FieldType::Literal(allowed) => coerce_literal(ty, allowed, value, path),
		FieldType::Enum(decl) => coerce_enum(decl, value, path),
		FieldType::List(item) => {
			coerce_items(item.as_deref(), expect_array(value, ty, path)?, path).map(Typed::List)
		}
		FieldType::Set(item) => {
			let items = coerce_items(item.as_deref(), expect_array(value, ty, path)?, path)?;
			let mut unique = Vec::with_capacity(items.len());
			for item in items {
				if !unique.contains(&item) {
					unique.push(item);
				}
			}
			Ok(Typed::Set(unique))
		}
		FieldType::Tuple(types) => {
			let items = expect_array(value, ty, path)?;
			let converted = items
				.iter()
				.enumerate()
				.map(|(idx, item)| match types {
					None => Ok(Typed::Str(render_string(item))),
					Some(types) => match types.get(idx) {
						Some(ty) => coerce_value(ty, item, &index_path(path, idx)),
						None => Ok(Typed::Raw(item.clone())),
					},
				})
				.collect::<Result<Vec<_>>>()?;
			Ok(Typed::Tuple(converted))
		}
		FieldType::Map(inner) => {
			let Value::Table(table) = value else {
				return Err(type_mismatch(&ty.describe(), value, path));
			};
			table
				.iter()
				.map(|(key, item)| {
					let converted = match inner {
						None => Typed::Raw(item.clone()),
						Some(ty) => coerce_value(ty, item, &child_path(path, key))?,
					};
					Ok((key.clone(), converted))
				})
				.collect::<Result<_>>()
				.map(Typed::Map)
		}
		FieldType::Nested(schema) => match value {
			Value::Table(table) => coerce_table(schema, table, path).map(Typed::Object),
			_ => Ok(Typed::Object(schema.empty_object())),
		},
	}
}

fn coerce_union(members: &[FieldType], value: &Value, path: &str) -> Result<Typed> {
	let mut last_error = None;

	for member in members.iter().filter(|m| !m.is_none()) {
		match coerce_value(member, value, path) {
			Ok(converted) => return Ok(converted),
			Err(e) => last_error = Some(e),
		}
	}

	match last_error {
		Some(e) => Err(e),
		None => Ok(Typed::Raw(value.clone())),
	}
}

fn coerce_literal(ty: &FieldType, allowed: &[Scalar], value: &Value, path: &str) -> Result<Typed> {
	let Some(sample) = allowed.first() else {
		return Ok(Typed::Raw(value.clone()));
	};

	let converted = match sample {
		Scalar::Bool(_) => Some(Scalar::Bool(to_bool(value))),
		Scalar::Int(_) => to_int(value, path).ok().map(Scalar::Int),
		Scalar::Float(_) => to_float(value, path).ok().map(Scalar::Float),
		Scalar::Str(_) => Some(Scalar::Str(render_string(value))),
	};

	let matched = converted
		.and_then(|c| allowed.iter().find(|a| a.loose_eq(&c)))
		.or_else(|| match value {
			Value::String(s) => allowed.iter().find(|a| a.to_string() == *s),
			_ => None,
		});

	match matched {
		Some(scalar) => Ok(Typed::from(scalar.clone())),
		None => Err(WeaveError::conversion(
			path,
			format!("Value {} not in allowed {}", repr(value), ty.describe()),
		)),
	}
}

fn coerce_enum(decl: &EnumDecl, value: &Value, path: &str) -> Result<Typed> {
	let members = decl.members();

	let found = match value {
		Value::String(s) => {
			let upper = s.to_uppercase();
			members
				.iter()
				.find(|(name, _)| name == s)
				.or_else(|| members.iter().find(|(name, _)| *name == upper))
				.or_else(|| members.iter().find(|(_, v)| v.to_string() == *s))
		}
		other => scalar_of(other).and_then(|scalar| members.iter().find(|(_, v)| v.loose_eq(&scalar))),
	};

	match found {
		Some((name, member_value)) => Ok(decl.value_of(name, member_value)),
		None => Err(WeaveError::conversion(
			path,
			format!("{} is not a valid {}", repr(value), decl.name()),
		)),
	}
}

fn coerce_items(item: Option<&FieldType>, items: &[Value], path: &str) -> Result<Vec<Typed>> {
	items
		.iter()
		.enumerate()
		.map(|(idx, value)| match item {
			None => Ok(Typed::Str(render_string(value))),
			Some(ty) => coerce_value(ty, value, &index_path(path, idx)),
		})
		.collect()
}

fn expect_array<'a>(value: &'a Value, ty: &FieldType, path: &str) -> Result<&'a [Value]> {
	match value {
		Value::Array(items) => Ok(items),
		other => Err(type_mismatch(&ty.describe(), other, path)),
	}
}

fn type_mismatch(expected: &str, value: &Value, path: &str) -> WeaveError {
	WeaveError::conversion(path, format!("Expected {expected}, got {}", value.type_str()))
}

/// Truthiness of a raw value. Strings count as true only for the
/// recognized truthy spellings.
pub fn to_bool(value: &Value) -> bool {
	match value {
		Value::Boolean(b) => *b,
		Value::String(s) => BOOL_TRUE_VALUES.contains(&s.to_lowercase().as_str()),
		Value::Integer(i) => *i != 0,
		Value::Float(f) => *f != 0.0,
		Value::Array(items) => !items.is_empty(),
		Value::Table(table) => !table.is_empty(),
		Value::Datetime(_) => true,
	}
}

fn to_int(value: &Value, path: &str) -> Result<i64> {
	match value {
		Value::Integer(i) => Ok(*i),
		Value::Boolean(b) => Ok(i64::from(*b)),
		Value::Float(f) => {
			let truncated = f.trunc();
			if f.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
				Ok(truncated as i64)
			} else {
				Err(WeaveError::conversion(
					path,
					format!("Cannot convert {} to int", render_float(*f)),
				))
			}
		}
		Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
			WeaveError::conversion(path, format!("Cannot convert {} to int", repr(value)))
		}),
		other => Err(type_mismatch("int", other, path)),
	}
}

fn to_float(value: &Value, path: &str) -> Result<f64> {
	match value {
		Value::Float(f) => Ok(*f),
		Value::Integer(i) => Ok(*i as f64),
		Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
		Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
			WeaveError::conversion(path, format!("Cannot convert {} to float", repr(value)))
		}),
		other => Err(type_mismatch("float", other, path)),
	}
}

/// The string form of a raw value. Containers render as compact JSON.
pub fn render_string(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Integer(i) => i.to_string(),
		Value::Float(f) => render_float(*f),
		Value::Boolean(b) => b.to_string(),
		Value::Datetime(dt) => dt.to_string(),
		Value::Array(_) | Value::Table(_) => crate::config::value_to_json(value).to_string(),
	}
}

/// Floats always keep a fractional part: `8.0`, not `8`.
pub(crate) fn render_float(f: f64) -> String {
	if f.is_nan() {
		"nan".to_string()
	} else if f.is_infinite() {
		let sign = if f > 0.0 { "" } else { "-" };
		format!("{sign}inf")
	} else if f.fract() == 0.0 && f.abs() < 1e16 {
		format!("{f:.1}")
	} else {
		f.to_string()
	}
}

fn scalar_of(value: &Value) -> Option<Scalar> {
	match value {
		Value::Boolean(b) => Some(Scalar::Bool(*b)),
		Value::Integer(i) => Some(Scalar::Int(*i)),
		Value::Float(f) => Some(Scalar::Float(*f)),
		Value::String(s) => Some(Scalar::Str(s.clone())),
		_ => None,
	}
}

fn repr(value: &Value) -> String {
	match value {
		Value::String(s) => format!("'{s}'"),
		other => render_string(other),
	}
}

fn child_path(prefix: &str, name: &str) -> String {
	if prefix.is_empty() {
		name.to_string()
	} else {
		format!("{prefix}.{name}")
	}
}

fn index_path(path: &str, idx: usize) -> String {
	format!("{path}[{idx}]")
}
