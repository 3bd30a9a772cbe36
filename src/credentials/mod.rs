//! # Credentials
//!
//! Persistence of binding credentials into an external secret store.

pub mod decorator;

pub use decorator::{credential_key, CredentialAugmentingDecorator};
