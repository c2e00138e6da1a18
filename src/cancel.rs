//! Cooperative cancellation for pipeline suspension points.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Run `fut` unless `token` fires first.
///
/// Returns `None` when cancelled; the in-flight future is dropped, which for
/// child processes spawned with `kill_on_drop` also terminates them.
pub async fn or_cancel<F>(token: &CancellationToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        out = fut => Some(out),
    }
}
