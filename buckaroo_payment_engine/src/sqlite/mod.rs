//! SQLite database module for the payment engine.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;

#[cfg(test)]
mod tests;
