//! SQL generation module.
//!
//! - [`generator`] - lowers query models into statements
//! - [`statement`] - the relational statement tree
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
mod emit;
pub mod generator;
pub mod statement;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, SqlDialect, UnknownDialect};
pub use generator::{QueryParameter, SqlGenerator};
pub use statement::{FromItem, JoinItem, JoinKind, OrderItem, SelectItem, SelectStatement};
pub use token::{Token, TokenStream};
