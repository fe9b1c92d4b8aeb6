//! Typed schemas for configuration trees.
//!
//! This module handles:
//! - Declaring configuration models as ordered field sets ([`Schema`])
//! - Coercing a parsed TOML table into a [`ConfigObject`]
//! - Reading values back through accessors, dotted lookups, JSON or serde

pub mod coerce;
pub mod types;
pub mod value;

pub use coerce::{coerce_table, coerce_value};
pub use types::{EnumDecl, FieldDecl, FieldType, Primitive, Scalar, Schema, SchemaBuilder};
pub use value::{ConfigObject, EnumValue, Typed};

use crate::error::Result;

impl Schema {
	/// Coerce a top-level table into an instance of this schema.
	pub fn coerce(&self, table: &toml::Table) -> Result<ConfigObject> {
		coerce_table(self, table, "")
	}
}
