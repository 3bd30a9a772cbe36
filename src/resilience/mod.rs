//! # Resilience Module
//!
//! Retry support for startup-order-sensitive dependencies, such as a secret store
//! whose DNS name is not resolvable until it finishes starting.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use service_broker::resilience::{retry_while, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::exponential(Duration::from_millis(500), 5);
//!
//! let value = retry_while(
//!     &policy,
//!     "credential_store_connect",
//!     |err: &String| err.contains("no such host"),
//!     || async { Ok::<_, String>("connected") },
//! )
//! .await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod retry;

pub use retry::{retry_while, RetryPolicy};
