use std::future::Future;
use std::sync::Arc;

use crate::proxy::ProxyConfig;
use crate::youtube::{SourceFactory, TranscriptSource};
use crate::{Result, TranscriptError};

/// Default number of extra attempts after the first one
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Message fragments that mark a failure as transient (proxy hiccup, timeout)
const RETRYABLE_SIGNALS: &[&str] = &["max retries", "timeout", "proxy"];

/// Whether a failure is worth another attempt over a direct connection
pub fn is_retryable(err: &TranscriptError) -> bool {
    let message = err.to_string().to_lowercase();
    RETRYABLE_SIGNALS.iter().any(|signal| message.contains(signal))
}

/// Runs one logical upstream operation with bounded retries.
///
/// Every retryable failure degrades the next attempt to a direct connection. Anything else
/// is returned on the spot, and the last error is returned once attempts run out.
pub struct RetryCoordinator<'a> {
    factory: &'a dyn SourceFactory,
    max_retries: u32,
}

impl<'a> RetryCoordinator<'a> {
    pub fn new(factory: &'a dyn SourceFactory, max_retries: u32) -> Self {
        Self {
            factory,
            max_retries,
        }
    }

    pub async fn run<T, F, Fut>(&self, transport: ProxyConfig, operation: F) -> Result<T>
    where
        F: Fn(Arc<dyn TranscriptSource>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut transport = transport;
        let mut attempt = 0;

        loop {
            let source = self.factory.connect(&transport)?;

            match operation(source).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && is_retryable(&err) => {
                    attempt += 1;
                    tracing::warn!(
                        "Attempt {} via {} failed, retrying with direct connection: {}",
                        attempt,
                        transport,
                        err
                    );
                    transport = ProxyConfig::Direct;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
