//! SQLite engine handle implementation

mod connection;
mod driver;

pub use connection::{SqliteConnection, SqliteOptions, SqliteTransaction};
pub use driver::SqliteDriver;
