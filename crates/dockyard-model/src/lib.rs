//! # dockyard-model
//!
//! Metadata records for containers and images: portable and host
//! configuration, port tokens, network settings, lifecycle state, and the
//! summary views served to remote clients.
//!
//! Records written by older daemons load without loss. Deprecated fields
//! (`PortSpecs`, `PortMapping`) are read once and folded into their
//! replacements; they are never written back.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod api;
pub mod cell;
pub mod config;
pub mod container;
pub mod host_config;
pub mod image;
pub mod network;
pub mod port;
mod serde_helpers;
pub mod state;
