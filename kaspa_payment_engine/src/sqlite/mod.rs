//! SQLite database module for the Kaspa payment engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
