//! VCS vocabulary for weave.
//!
//! This crate holds the plain value types shared by the zipper, the lazy
//! change set, and the `weave` binary. It carries no merge or parse logic;
//! producing these values (running `git log`, fetching remotes) is the
//! caller's job.
//!
//! # Crate layout
//!
//! - [`types`]: [`ChangeType`], [`FileStatusInfo`], [`PathChange`],
//!   [`RepositoryLocation`], [`Revision`].

pub mod types;

pub use types::{ChangeType, FileStatusInfo, PathChange, RepositoryLocation, Revision};
