//! # dockyard-store
//!
//! Persists metadata records as JSON files under the data directory:
//!
//! ```text
//! <data-dir>/containers/<id>/config.json      container record
//! <data-dir>/containers/<id>/hostconfig.json  host configuration
//! <data-dir>/graph/<id>/json                  image record
//! <data-dir>/repositories.json                repository tags
//! ```
//!
//! Every write goes to a temporary sibling first and is then renamed over the
//! target, so a reader never sees a truncated record.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod fs;
pub mod repositories;
pub mod store;
