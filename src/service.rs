//! Collaborator contracts the daily planner talks to once credentials are in hand.
//!
//! - [`tasks`]: the task source whose list answers go through the normalizer.
//! - [`calendar`]: capability-scoped calendar client plus request signing.
//! - [`mail`]: read-only mailbox client for labelled messages.
//! - [`model`]: language-model contract and the boundary classification feeding the retry
//!   engine.

pub mod calendar;
pub mod mail;
pub mod model;
pub mod tasks;

#[cfg(feature = "reqwest")] mod api;

pub use calendar::*;
pub use mail::*;
pub use model::*;
pub use tasks::*;

// self
use crate::_prelude::*;

/// Boxed future returned by collaborator calls.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;
