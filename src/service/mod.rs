//! The service delegate: the embedding application's entry point.
//!
//! - [`Service`] - trait for implementing the main routine (async, cancelable)
//! - [`ServiceFn`] - function-backed service implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)

mod service;
mod service_fn;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
