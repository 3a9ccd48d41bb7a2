use std::future::Future;
use tracing::warn;

/// Run a best-effort side task (cache write, audit append) detached from the
/// primary request. A failure is logged under the given label and swallowed;
/// the caller never observes it.
pub fn detach<F, E>(label: &'static str, fut: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!(task = label, error = %e, "detached task failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn detached_failure_is_swallowed() {
        detach("test-task", async { Err::<(), _>("boom") });
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn detached_task_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        detach("test-task", async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<(), &str>(())
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
