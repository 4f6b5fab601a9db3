//! Structured-logging vocabulary.
//!
//! Every log call in the crate carries an `event` name from [`events`] and a
//! `component` field, plus the field keys defined in [`fields`]. The library
//! never installs a global subscriber; binaries and tests initialize
//! `tracing_subscriber` once at the process boundary.

pub mod events;
pub mod fields;
