//! Hint-aware retry engine for quota-limited remote APIs.
//!
//! [`RetryPolicy`] classifies failures into [`ErrorClass`] values and computes waits,
//! [`ResilientInvoker`] drives the bounded attempt loop, and [`hint`] extracts the
//! server-provided delay from quota error payloads.

pub mod hint;
pub mod invoker;
pub mod policy;

pub use hint::*;
pub use invoker::*;
pub use policy::*;
