//! Provider-facing descriptors (data), client registrations, and strategies (behavior).
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering HTTPS-only
//! endpoints, supported grant flags, client authentication preferences, and polling
//! quirks. `registration` loads the OAuth client material issued by the provider.
//! `strategy` defines [`ProviderStrategy`], the hook flows use to classify token-endpoint
//! failures and device-poll signals.

pub mod descriptor;
pub mod registration;
pub mod strategy;

pub use descriptor::*;
pub use registration::*;
pub use strategy::*;
