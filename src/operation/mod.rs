//! # Operations
//!
//! Asynchronous operation bookkeeping: the opaque [`OperationToken`] handed to the
//! marketplace and the [`OperationState`] machine a token resolves to when polled.

pub mod state;
pub mod token;

pub use state::{LastOperation, LastOperationState, OperationState};
pub use token::{OperationToken, OperationType, TokenError};
