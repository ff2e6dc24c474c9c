//! Shared database repository test infrastructure
//!
//! Tests run against fast in-memory SQLite databases with the real
//! migrations applied, so the schema under test always matches production.

pub mod harness;
