//! Ctrl+C handling for in-flight requests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often a pending future re-checks the interrupt flag.
pub const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Drives `future` until it completes or `interrupted` is set.
///
/// Returns `None` on interrupt, after dropping the future. The flag is checked
/// before the first poll and then every `poll` while the future is pending.
pub async fn until_interrupted<F: Future>(
    future: F,
    interrupted: &AtomicBool,
    poll: Duration,
) -> Option<F::Output> {
    tokio::pin!(future);
    loop {
        if interrupted.load(Ordering::Relaxed) {
            return None;
        }
        tokio::select! {
            output = &mut future => return Some(output),
            _ = tokio::time::sleep(poll) => {}
        }
    }
}
