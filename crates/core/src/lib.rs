//! `authproxy-core`: identity primitives shared by the proxy crates.
//!
//! This crate contains **pure domain** types (no HTTP, no I/O).

pub mod error;
pub mod id;
pub mod identity;

pub use error::DomainError;
pub use id::{OrganisationId, SubjectId, UserId};
pub use identity::Identity;
