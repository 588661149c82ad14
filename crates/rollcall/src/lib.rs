//! Attendance check-in core: session registry, scan classification, the
//! per-person photo-provisioning state machine, and the messaging
//! coordination layer that drives the conversational photo exchange.
//!
//! Persistent storage, the messaging platform client, token-image
//! composition, and media storage are collaborator traits; the API service
//! provides concrete implementations.

pub mod attendance;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod messaging;
pub mod photos;
pub mod reports;
pub mod tasks;
pub mod telemetry;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;
