//! weave library crate.
//!
//! Two building blocks for assembling one commit history out of several
//! fetched locations:
//!
//! - [`zipper`]: merges per-location record sequences, zipping records that
//!   mirrors of the same repository both reported.
//! - [`changes`]: a commit's file changes, parsed once on first access and
//!   shared across threads.
//!
//! [`record`] provides a concrete record type and zip strategy, and the
//! `weave` binary wires both together behind a small CLI.

pub mod changes;
pub mod config;
pub mod record;
pub mod telemetry;
pub mod zipper;
