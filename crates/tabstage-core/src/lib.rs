//! Tabstage Core - engine abstractions shared by the staging engine and its drivers
//!
//! This crate defines the capability the staging engine consumes from an
//! embedded relational store:
//!
//! - `DatabaseDriver` - opens a store from a `ConnectionConfig`
//! - `Connection` - execute/query, transactions, whole-database export
//! - `Transaction` - statement execution plus prepared bulk execution
//! - `SchemaIntrospection` - table listing and column metadata
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod driver;
mod error;
mod schema;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use schema::*;
pub use types::*;
