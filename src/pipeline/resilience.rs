//! Retry and degradation policies for collaborator calls.

use std::future::Future;

use super::{CollaboratorError, Layer};

/// Run `op`; on malformed output run `fallback` exactly once.
///
/// Any other failure propagates immediately. A malformed fallback result
/// propagates as well; there is never a third attempt.
pub async fn call_with_retry<T, Op, Fb, FbFut>(
    layer: Layer,
    op: Op,
    fallback: Fb,
) -> Result<T, CollaboratorError>
where
    Op: Future<Output = Result<T, CollaboratorError>>,
    Fb: FnOnce() -> FbFut,
    FbFut: Future<Output = Result<T, CollaboratorError>>,
{
    match op.await {
        Err(e) if e.is_malformed() => {
            tracing::warn!(layer = %layer, attempt = 2, error = %e, "Malformed output, retrying once");
            fallback().await
        }
        other => other,
    }
}

/// Run an optional collaborator call, substituting `default` when the
/// collaborator is absent (`op` is `None`) or the call fails.
pub async fn call_degradable<T, F>(label: &str, op: Option<F>, default: T) -> T
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    let Some(op) = op else {
        tracing::debug!(collaborator = label, "Not configured, using default");
        return default;
    };
    match op.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(collaborator = label, error = %e, "Optional lookup failed, using default");
            default
        }
    }
}
