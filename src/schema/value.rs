use crate::config::value_to_json;
use crate::error::{Result, WeaveError};
use crate::schema::types::Scalar;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeMap;

/// A resolved enum member.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
	pub enum_name: String,
	pub member: String,
	pub value: Scalar,
}

/// A value produced by schema coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Typed {
	None,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	Enum(EnumValue),
	List(Vec<Typed>),
	Map(BTreeMap<String, Typed>),
	/// Insertion ordered, without duplicates.
	Set(Vec<Typed>),
	Tuple(Vec<Typed>),
	Object(ConfigObject),
	/// Kept exactly as parsed.
	Raw(toml::Value),
}

impl Typed {
	pub fn is_none(&self) -> bool {
		matches!(self, Typed::None)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Typed::Str(s) => Some(s),
			Typed::Raw(toml::Value::String(s)) => Some(s),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Typed::Int(i) => Some(*i),
			Typed::Raw(toml::Value::Integer(i)) => Some(*i),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Typed::Float(f) => Some(*f),
			Typed::Raw(toml::Value::Float(f)) => Some(*f),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Typed::Bool(b) => Some(*b),
			Typed::Raw(toml::Value::Boolean(b)) => Some(*b),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&EnumValue> {
		match self {
			Typed::Enum(e) => Some(e),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&ConfigObject> {
		match self {
			Typed::Object(obj) => Some(obj),
			_ => None,
		}
	}

	/// Elements of a list, set or tuple.
	pub fn as_items(&self) -> Option<&[Typed]> {
		match self {
			Typed::List(items) | Typed::Set(items) | Typed::Tuple(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&BTreeMap<String, Typed>> {
		match self {
			Typed::Map(map) => Some(map),
			_ => None,
		}
	}

	/// Child addressed by a key or an index.
	pub fn child(&self, key: &str) -> Option<Typed> {
		match self {
			Typed::Object(obj) => obj.get(key).cloned(),
			Typed::Map(map) => map.get(key).cloned(),
			Typed::List(items) | Typed::Set(items) | Typed::Tuple(items) => {
				items.get(key.parse::<usize>().ok()?).cloned()
			}
			Typed::Raw(toml::Value::Table(table)) => table.get(key).cloned().map(Typed::Raw),
			Typed::Raw(toml::Value::Array(items)) => items
				.get(key.parse::<usize>().ok()?)
				.cloned()
				.map(Typed::Raw),
			_ => None,
		}
	}

	/// Plain JSON rendering. Enum members render as their value.
	pub fn to_json(&self) -> Json {
		match self {
			Typed::None => Json::Null,
			Typed::Bool(b) => Json::Bool(*b),
			Typed::Int(i) => Json::from(*i),
			Typed::Float(f) => float_json(*f),
			Typed::Str(s) => Json::String(s.clone()),
			Typed::Enum(e) => scalar_json(&e.value),
			Typed::List(items) | Typed::Set(items) | Typed::Tuple(items) => {
				Json::Array(items.iter().map(Typed::to_json).collect())
			}
			Typed::Map(map) => Json::Object(
				map.iter()
					.map(|(k, v)| (k.clone(), v.to_json()))
					.collect::<Map<_, _>>(),
			),
			Typed::Object(obj) => obj.as_json(),
			Typed::Raw(value) => value_to_json(value),
		}
	}
}

fn float_json(f: f64) -> Json {
	Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

fn scalar_json(scalar: &Scalar) -> Json {
	match scalar {
		Scalar::Bool(b) => Json::Bool(*b),
		Scalar::Int(i) => Json::from(*i),
		Scalar::Float(f) => float_json(*f),
		Scalar::Str(s) => Json::String(s.clone()),
	}
}

impl From<bool> for Typed {
	fn from(value: bool) -> Self {
		Typed::Bool(value)
	}
}

impl From<i64> for Typed {
	fn from(value: i64) -> Self {
		Typed::Int(value)
	}
}

impl From<i32> for Typed {
	fn from(value: i32) -> Self {
		Typed::Int(value.into())
	}
}

impl From<f64> for Typed {
	fn from(value: f64) -> Self {
		Typed::Float(value)
	}
}

impl From<&str> for Typed {
	fn from(value: &str) -> Self {
		Typed::Str(value.to_string())
	}
}

impl From<String> for Typed {
	fn from(value: String) -> Self {
		Typed::Str(value)
	}
}

impl From<Scalar> for Typed {
	fn from(value: Scalar) -> Self {
		match value {
			Scalar::Bool(b) => Typed::Bool(b),
			Scalar::Int(i) => Typed::Int(i),
			Scalar::Float(f) => Typed::Float(f),
			Scalar::Str(s) => Typed::Str(s),
		}
	}
}

impl From<Vec<Typed>> for Typed {
	fn from(value: Vec<Typed>) -> Self {
		Typed::List(value)
	}
}

impl From<ConfigObject> for Typed {
	fn from(value: ConfigObject) -> Self {
		Typed::Object(value)
	}
}

/// A Config Object: a schema instance with every declared field populated,
/// in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigObject {
	schema: String,
	fields: Vec<(String, Typed)>,
}

impl ConfigObject {
	pub(crate) fn new(schema: String, fields: Vec<(String, Typed)>) -> Self {
		ConfigObject { schema, fields }
	}

	/// Name of the schema this object was built from.
	pub fn schema_name(&self) -> &str {
		&self.schema
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, &Typed)> {
		self.fields.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn get(&self, name: &str) -> Option<&Typed> {
		self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
	}

	pub fn str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Typed::as_str)
	}

	pub fn int(&self, name: &str) -> Option<i64> {
		self.get(name).and_then(Typed::as_int)
	}

	pub fn float(&self, name: &str) -> Option<f64> {
		self.get(name).and_then(Typed::as_float)
	}

	pub fn bool(&self, name: &str) -> Option<bool> {
		self.get(name).and_then(Typed::as_bool)
	}

	pub fn object(&self, name: &str) -> Option<&ConfigObject> {
		self.get(name).and_then(Typed::as_object)
	}

	/// Walk a dotted path such as `database.hosts.0.name`.
	pub fn lookup(&self, path: &str) -> Option<Typed> {
		let mut segments = path.split('.');
		let mut current = self.get(segments.next()?)?.clone();
		for segment in segments {
			current = current.child(segment)?;
		}
		Some(current)
	}

	/// Recursive plain mapping of the object, nested objects included.
	pub fn as_json(&self) -> Json {
		Json::Object(
			self.fields
				.iter()
				.map(|(k, v)| (k.clone(), v.to_json()))
				.collect::<Map<_, _>>(),
		)
	}

	/// Deserialize the plain mapping into a serde type.
	pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
		serde_json::from_value(self.as_json()).map_err(WeaveError::Deserialize)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;
	use serde_json::json;

	fn sample() -> ConfigObject {
		let inner = ConfigObject::new(
			"Db".to_string(),
			vec![
				("host".to_string(), Typed::from("localhost")),
				("port".to_string(), Typed::Int(5432)),
			],
		);
		let mut tags = toml::Table::new();
		tags.insert("env".to_string(), toml::Value::String("prod".to_string()));

		ConfigObject::new(
			"App".to_string(),
			vec![
				("debug".to_string(), Typed::Bool(true)),
				("ratio".to_string(), Typed::Float(0.5)),
				("db".to_string(), Typed::Object(inner)),
				(
					"ports".to_string(),
					Typed::List(vec![Typed::Int(80), Typed::Int(443)]),
				),
				("tags".to_string(), Typed::Raw(toml::Value::Table(tags))),
				("missing".to_string(), Typed::None),
			],
		)
	}

	#[test]
	fn test_accessors() {
		let obj = sample();
		assert_eq!(obj.bool("debug"), Some(true));
		assert_eq!(obj.float("ratio"), Some(0.5));
		assert_eq!(obj.object("db").and_then(|db| db.str("host")), Some("localhost"));
		assert_eq!(obj.int("debug"), None);
		assert!(obj.get("missing").is_some_and(Typed::is_none));
		assert!(obj.get("nope").is_none());
	}

	#[test]
	fn test_lookup() {
		let obj = sample();
		assert_eq!(obj.lookup("db.port"), Some(Typed::Int(5432)));
		assert_eq!(obj.lookup("ports.1"), Some(Typed::Int(443)));
		assert_eq!(obj.lookup("tags.env").as_ref().and_then(Typed::as_str), Some("prod"));
		assert_eq!(obj.lookup("db.nope"), None);
		assert_eq!(obj.lookup("ports.9"), None);
	}

	#[test]
	fn test_as_json() {
		assert_eq!(
			sample().as_json(),
			json!({
				"debug": true,
				"ratio": 0.5,
				"db": {"host": "localhost", "port": 5432},
				"ports": [80, 443],
				"tags": {"env": "prod"},
				"missing": null,
			})
		);
	}

	#[test]
	fn test_enum_renders_value() {
		let value = Typed::Enum(EnumValue {
			enum_name: "Level".to_string(),
			member: "HIGH".to_string(),
			value: Scalar::Int(3),
		});
		assert_eq!(value.to_json(), json!(3));
	}

	#[test]
	fn test_deserialize() {
		#[derive(Debug, Deserialize)]
		struct Db {
			host: String,
			port: u16,
		}

		#[derive(Debug, Deserialize)]
		struct App {
			debug: bool,
			db: Db,
			ports: Vec<u16>,
		}

		let app: App = sample().deserialize().unwrap();
		assert!(app.debug);
		assert_eq!(app.db.host, "localhost");
		assert_eq!(app.db.port, 5432);
		assert_eq!(app.ports, vec![80, 443]);
	}

	#[test]
	fn test_deserialize_error() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Wrong {
			debug: String,
		}

		let err = sample().deserialize::<Wrong>().unwrap_err();
		assert!(matches!(err, WeaveError::Deserialize(_)));
	}
}
