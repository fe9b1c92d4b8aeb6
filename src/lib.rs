//! tomlweave - TOML configuration loading with variables, includes and typed schemas.
//!
//! This library provides:
//! - `.env` file reading merged with the process environment
//! - `$VAR`, `${VAR|-default}` substitution in TOML text
//! - Recursive `__include` expansion with cycle detection
//! - Coercion of the parsed tree into declared schemas
//!
//! # Example
//!
//! ```no_run
//! use tomlweave::config::{LoadOptions, load};
//! use tomlweave::schema::{FieldType, Schema};
//!
//! let database = Schema::builder("Database")
//!     .field("host", FieldType::str())
//!     .field_with_default("port", FieldType::int(), 5432)
//!     .build();
//!
//! let schema = Schema::builder("App")
//!     .field("debug", FieldType::bool())
//!     .field("database", FieldType::nested(database))
//!     .build();
//!
//! let config = load(&schema, LoadOptions::new().toml_file("env.toml")).unwrap();
//!
//! if let Some(port) = config.lookup("database.port").and_then(|v| v.as_int()) {
//!     println!("Database port: {port}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod subst;
pub mod vars;

pub use config::{LoadOptions, Loader, load, load_async};
pub use error::{ErrorEntry, Result, WeaveError};
pub use schema::{ConfigObject, FieldType, Schema, Typed};
