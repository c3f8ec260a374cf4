//! Core types shared across BigLeague facilities
//!
//! This crate holds the canonical field keys and event names used by the
//! structured logging facility and by log assertions in tests.

pub mod schema;
