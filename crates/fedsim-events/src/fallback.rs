//! Fallback adapter: a source that never fails.

use std::future::Future;
use std::time::Duration;

use fedsim_core::{validate_event, Event};
use tracing::warn;

use crate::{EventRequest, EventSource, EventSourceError};

/// Wraps a source so that errors, malformed events and calls exceeding
/// `timeout` all resolve to [`Event::fallback`].
pub struct WithFallback<S> {
    inner: S,
    timeout: Duration,
}

impl<S: EventSource> WithFallback<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn attempt(&self, request: EventRequest) -> Result<Event, EventSourceError> {
        let event = tokio::time::timeout(self.timeout, self.inner.generate(request))
            .await
            .map_err(|_| EventSourceError::Timeout(self.timeout))??;
        validate_event(&event)?;
        Ok(event)
    }
}

impl<S: EventSource> EventSource for WithFallback<S> {
    fn generate(
        &self,
        request: EventRequest,
    ) -> impl Future<Output = Result<Event, EventSourceError>> + Send {
        async move {
            match self.attempt(request).await {
                Ok(event) => Ok(event),
                Err(err) => {
                    warn!(%err, year = request.year, quarter = request.quarter, "event source failed, using fallback event");
                    Ok(Event::fallback())
                }
            }
        }
    }
}
