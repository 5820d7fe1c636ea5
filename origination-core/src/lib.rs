#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod clients;
pub mod config;
pub mod entities;
pub mod events;
pub mod framework;
pub mod idempotency;
pub mod pipeline;
pub mod repository;
pub mod status_machine;

#[cfg(test)]
pub(crate) mod testing;
