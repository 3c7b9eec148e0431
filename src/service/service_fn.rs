//! Function-backed service (`ServiceFn`).
//!
//! [`ServiceFn`] wraps a closure `F: Fn(Vec<String>, CancellationToken) -> Fut`,
//! producing a fresh future per start. No hidden state is carried across
//! restarts; share state explicitly with an `Arc` inside the closure if you
//! need it to survive a reload.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::service::service::Service;

/// Function-backed service implementation.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use servitor::{ServiceFn, ServiceRef};
///
/// let svc: ServiceRef = ServiceFn::arc("worker", |_args: Vec<String>, ctx: CancellationToken| async move {
///     ctx.cancelled().await;
/// });
/// assert_eq!(svc.name(), "worker");
/// ```
#[derive(Debug)]
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new function-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when you immediately need a [`ServiceRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(Vec<String>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, args: Vec<String>, ctx: CancellationToken) {
        (self.f)(args, ctx).await;
    }
}
