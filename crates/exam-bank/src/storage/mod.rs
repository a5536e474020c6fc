//! Storage module for the problem bank
//!
//! Provides SQLite-based persistence for parsed questions.

mod database;

pub use database::{ProblemStore, ProblemWriter};
