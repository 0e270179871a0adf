//! Tower adapter: run every request of a [`tower::Service`] through a
//! [`ResilienceStack`] under one fixed key.
//!
//! The retry stage re-invokes the wrapped service, so the service and its
//! requests must be `Clone`. Each call clones the service out of the layer,
//! the usual pattern for middlewares whose inner future may run more than
//! once.

use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::{Layer, Service};

use breakwater_core::ResilienceError;

use crate::stack::ResilienceStack;

/// Layer wrapping a service so every call runs through `stack` under `key`.
pub struct ResilienceLayer<E> {
    stack: ResilienceStack<E>,
    key: String,
}

impl<E> ResilienceLayer<E> {
    pub fn new(stack: ResilienceStack<E>, key: impl Into<String>) -> Self {
        Self {
            stack,
            key: key.into(),
        }
    }
}

impl<E> Clone for ResilienceLayer<E> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            key: self.key.clone(),
        }
    }
}

impl<S, E> Layer<S> for ResilienceLayer<E> {
    type Service = ResilienceService<S, E>;

    fn layer(&self, inner: S) -> Self::Service {
        ResilienceService {
            inner,
            stack: self.stack.clone(),
            key: self.key.clone(),
        }
    }
}

/// A service running every request through the resilience pipeline.
pub struct ResilienceService<S, E> {
    inner: S,
    stack: ResilienceStack<E>,
    key: String,
}

impl<S: Clone, E> Clone for ResilienceService<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stack: self.stack.clone(),
            key: self.key.clone(),
        }
    }
}

impl<S, Req, E> Service<Req> for ResilienceService<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send,
    S::Response: Send,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = ResilienceError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(ResilienceError::Operation)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let stack = self.stack.clone();
        let key = self.key.clone();

        Box::pin(async move {
            stack
                .run(&key, move || {
                    let mut service = service.clone();
                    let req = req.clone();
                    async move { service.call(req).await }
                })
                .await
        })
    }
}
