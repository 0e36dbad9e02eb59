// Library crate: the curve kernel, the transactional edit engine and the
// headless harness. The binary only parses arguments and drives a batch.

pub mod command;
pub mod config;
pub mod context;
pub mod derive;
pub mod events;
pub mod fixtures;
pub mod geometry;
pub mod harness;
pub mod persistence;
pub mod plugin;
pub mod store;
pub mod transaction;
pub mod validation;
