use crate::schema::value::{ConfigObject, EnumValue, Typed};
use std::fmt;
use std::sync::Arc;

/// A scalar used for literal sets and enum member values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
}

impl Scalar {
	/// Equality that treats `1` and `1.0` as the same value.
	pub fn loose_eq(&self, other: &Scalar) -> bool {
		match (self, other) {
			(Scalar::Int(a), Scalar::Float(b)) | (Scalar::Float(b), Scalar::Int(a)) => (*a as f64) == *b,
			_ => self == other,
		}
	}
}

impl fmt::Display for Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scalar::Bool(b) => write!(f, "{b}"),
			Scalar::Int(i) => write!(f, "{i}"),
			Scalar::Float(x) => write!(f, "{}", crate::schema::coerce::render_float(*x)),
			Scalar::Str(s) => write!(f, "{s}"),
		}
	}
}

impl From<bool> for Scalar {
	fn from(value: bool) -> Self {
		Scalar::Bool(value)
	}
}

impl From<i64> for Scalar {
	fn from(value: i64) -> Self {
		Scalar::Int(value)
	}
}

impl From<i32> for Scalar {
	fn from(value: i32) -> Self {
		Scalar::Int(value.into())
	}
}

impl From<f64> for Scalar {
	fn from(value: f64) -> Self {
		Scalar::Float(value)
	}
}

impl From<&str> for Scalar {
	fn from(value: &str) -> Self {
		Scalar::Str(value.to_string())
	}
}

impl From<String> for Scalar {
	fn from(value: String) -> Self {
		Scalar::Str(value)
	}
}

/// A named finite set of members, each with a scalar value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
	name: String,
	members: Vec<(String, Scalar)>,
}

impl EnumDecl {
	pub fn new<N, V>(name: impl Into<String>, members: impl IntoIterator<Item = (N, V)>) -> Self
	where
		N: Into<String>,
		V: Into<Scalar>,
	{
		EnumDecl {
			name: name.into(),
			members: members
				.into_iter()
				.map(|(n, v)| (n.into(), v.into()))
				.collect(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn members(&self) -> &[(String, Scalar)] {
		&self.members
	}

	/// The typed value for the member called `name`.
	pub fn member(&self, name: &str) -> Option<Typed> {
		self.members
			.iter()
			.find(|(member, _)| member == name)
			.map(|(member, value)| self.value_of(member, value))
	}

	pub(crate) fn value_of(&self, member: &str, value: &Scalar) -> Typed {
		Typed::Enum(EnumValue {
			enum_name: self.name.clone(),
			member: member.to_string(),
			value: value.clone(),
		})
	}
}

/// Scalar building blocks of the declared-type grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
	Str,
	Int,
	Float,
	Bool,
	/// Unconstrained: the value is kept exactly as given.
	Any,
	/// The "none" member of a union.
	None,
}

/// A declared field type.
///
/// Collection variants carry `None` when declared without parameters
/// (a plain `list`, `dict`, `set` or `tuple`).
#[derive(Debug, Clone)]
pub enum FieldType {
	Primitive(Primitive),
	Optional(Box<FieldType>),
	/// Members are tried in declaration order.
	Union(Vec<FieldType>),
	Literal(Vec<Scalar>),
	Enum(Arc<EnumDecl>),
	List(Option<Box<FieldType>>),
	Map(Option<Box<FieldType>>),
	Set(Option<Box<FieldType>>),
	Tuple(Option<Vec<FieldType>>),
	Nested(Arc<Schema>),
}

impl FieldType {
	pub fn str() -> Self {
		FieldType::Primitive(Primitive::Str)
	}

	pub fn int() -> Self {
		FieldType::Primitive(Primitive::Int)
	}

	pub fn float() -> Self {
		FieldType::Primitive(Primitive::Float)
	}

	pub fn bool() -> Self {
		FieldType::Primitive(Primitive::Bool)
	}

	pub fn any() -> Self {
		FieldType::Primitive(Primitive::Any)
	}

	pub fn none() -> Self {
		FieldType::Primitive(Primitive::None)
	}

	pub fn optional(inner: FieldType) -> Self {
		FieldType::Optional(Box::new(inner))
	}

	pub fn union(members: impl IntoIterator<Item = FieldType>) -> Self {
		FieldType::Union(members.into_iter().collect())
	}

	pub fn literal<V: Into<Scalar>>(allowed: impl IntoIterator<Item = V>) -> Self {
		FieldType::Literal(allowed.into_iter().map(Into::into).collect())
	}

	pub fn enumeration(decl: EnumDecl) -> Self {
		FieldType::Enum(Arc::new(decl))
	}

	pub fn list(item: FieldType) -> Self {
		FieldType::List(Some(Box::new(item)))
	}

	pub fn plain_list() -> Self {
		FieldType::List(None)
	}

	pub fn map(value: FieldType) -> Self {
		FieldType::Map(Some(Box::new(value)))
	}

	pub fn plain_map() -> Self {
		FieldType::Map(None)
	}

	pub fn set(item: FieldType) -> Self {
		FieldType::Set(Some(Box::new(item)))
	}

	pub fn plain_set() -> Self {
		FieldType::Set(None)
	}

	pub fn tuple(items: impl IntoIterator<Item = FieldType>) -> Self {
		FieldType::Tuple(Some(items.into_iter().collect()))
	}

	pub fn plain_tuple() -> Self {
		FieldType::Tuple(None)
	}

	pub fn nested(schema: Arc<Schema>) -> Self {
		FieldType::Nested(schema)
	}

	/// The value used when a field is absent and declares no default.
	pub fn zero_value(&self) -> Typed {
		match self {
			FieldType::Primitive(Primitive::Str) => Typed::Str(String::new()),
			FieldType::Primitive(Primitive::Int) => Typed::Int(0),
			FieldType::Primitive(Primitive::Float) => Typed::Float(0.0),
			FieldType::Primitive(Primitive::Bool) => Typed::Bool(false),
			FieldType::Primitive(Primitive::Any | Primitive::None) => Typed::None,
			FieldType::Optional(_) => Typed::None,
			FieldType::Union(members) => {
				if members.iter().any(FieldType::is_none) {
					Typed::None
				} else {
					members.first().map(FieldType::zero_value).unwrap_or(Typed::None)
				}
			}
			FieldType::Literal(allowed) => allowed.first().cloned().map(Typed::from).unwrap_or(Typed::None),
			FieldType::Enum(decl) => decl
				.members()
				.first()
				.map(|(member, value)| decl.value_of(member, value))
				.unwrap_or(Typed::None),
			FieldType::List(_) => Typed::List(Vec::new()),
			FieldType::Map(_) => Typed::Map(Default::default()),
			FieldType::Set(_) => Typed::Set(Vec::new()),
			FieldType::Tuple(_) => Typed::Tuple(Vec::new()),
			FieldType::Nested(schema) => Typed::Object(schema.empty_object()),
		}
	}

	pub fn is_none(&self) -> bool {
		matches!(self, FieldType::Primitive(Primitive::None))
	}

	/// Short type name, as shown in conversion errors.
	pub fn describe(&self) -> String {
		match self {
			FieldType::Primitive(Primitive::Str) => "str".to_string(),
			FieldType::Primitive(Primitive::Int) => "int".to_string(),
			FieldType::Primitive(Primitive::Float) => "float".to_string(),
			FieldType::Primitive(Primitive::Bool) => "bool".to_string(),
			FieldType::Primitive(Primitive::Any) => "any".to_string(),
			FieldType::Primitive(Primitive::None) => "none".to_string(),
			FieldType::Optional(inner) => format!("optional[{}]", inner.describe()),
			FieldType::Union(members) => members
				.iter()
				.map(FieldType::describe)
				.collect::<Vec<_>>()
				.join(" | "),
			FieldType::Literal(allowed) => format!("literal[{}]", join_scalars(allowed)),
			FieldType::Enum(decl) => decl.name().to_string(),
			FieldType::List(_) => "list".to_string(),
			FieldType::Map(_) => "dict".to_string(),
			FieldType::Set(_) => "set".to_string(),
			FieldType::Tuple(_) => "tuple".to_string(),
			FieldType::Nested(schema) => schema.name().to_string(),
		}
	}
}

fn join_scalars(values: &[Scalar]) -> String {
	values
		.iter()
		.map(Scalar::to_string)
		.collect::<Vec<_>>()
		.join(", ")
}

/// One declared field of a schema.
#[derive(Debug, Clone)]
pub struct FieldDecl {
	pub name: String,
	pub ty: FieldType,
	pub default: Option<Typed>,
}

/// Schema Declaration: an ordered set of fields for one configuration model.
///
/// Built once with [`SchemaBuilder`] and shared behind an `Arc`.
#[derive(Debug)]
pub struct Schema {
	name: String,
	fields: Vec<FieldDecl>,
}

impl Schema {
	pub fn builder(name: impl Into<String>) -> SchemaBuilder {
		SchemaBuilder {
			name: name.into(),
			fields: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn fields(&self) -> &[FieldDecl] {
		&self.fields
	}

	pub fn field(&self, name: &str) -> Option<&FieldDecl> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Construct an instance with no input: every field takes its default.
	pub fn empty_object(&self) -> ConfigObject {
		let fields = self
			.fields
			.iter()
			.map(|f| {
				let value = f.default.clone().unwrap_or_else(|| f.ty.zero_value());
				(f.name.clone(), value)
			})
			.collect();
		ConfigObject::new(self.name.clone(), fields)
	}
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
	name: String,
	fields: Vec<FieldDecl>,
}

impl SchemaBuilder {
	/// Declare a field. Redeclaring a name replaces the earlier declaration in place.
	pub fn field(self, name: impl Into<String>, ty: FieldType) -> Self {
		self.push(FieldDecl {
			name: name.into(),
			ty,
			default: None,
		})
	}

	/// Declare a field with a static default used when the input lacks it.
	pub fn field_with_default(
		self,
		name: impl Into<String>,
		ty: FieldType,
		default: impl Into<Typed>,
	) -> Self {
		self.push(FieldDecl {
			name: name.into(),
			ty,
			default: Some(default.into()),
		})
	}

	fn push(mut self, decl: FieldDecl) -> Self {
		match self.fields.iter_mut().find(|f| f.name == decl.name) {
			Some(existing) => *existing = decl,
			None => self.fields.push(decl),
		}
		self
	}

	pub fn build(self) -> Arc<Schema> {
		Arc::new(Schema {
			name: self.name,
			fields: self.fields,
		})
	}
}
