use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Cancellation and deadline signal for a single call.
///
/// Contexts are cheap to clone. A derived context inherits its parent's
/// cancellation and deadline; cancelling a child never cancels the parent.
///
/// ```
/// use covidapi::Context;
/// use std::time::Duration;
///
/// let (ctx, cancel) = Context::background()
///     .with_timeout(Duration::from_secs(30))
///     .with_cancel();
/// assert!(ctx.check().is_ok());
/// cancel.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a child context and the token that cancels it.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let token = self.token.child_token();
        let child = Self {
            token: token.clone(),
            deadline: self.deadline,
        };
        (child, token)
    }

    /// Keeps the parent's deadline if it is earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        child
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails with [`Error::Cancelled`] or [`Error::DeadlineExceeded`] once the
    /// context is done.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` until it completes or the context fires. When the context
    /// wins, `fut` is dropped, which aborts any request it has in flight.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Error> {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(d) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            _ = deadline => Err(Error::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn never_polled() -> u32 {
        unreachable!("must not be polled")
    }

    async fn explode() -> u32 {
        panic!("transport exploded")
    }

    #[tokio::test]
    async fn background_never_fires() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.remaining(), None);
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[test]
    fn cancelling_parent_cancels_child_only_downwards() {
        let (parent, cancel_parent) = Context::background().with_cancel();
        let (child, cancel_child) = parent.with_cancel();

        cancel_child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let (other_child, _) = parent.with_cancel();
        cancel_parent.cancel();
        assert!(other_child.is_cancelled());
        assert!(matches!(other_child.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = Context::background().with_deadline(now + Duration::from_secs(5));
        let tighter = ctx.with_deadline(now + Duration::from_secs(1));
        let looser = ctx.with_deadline(now + Duration::from_secs(60));
        assert_eq!(tighter.deadline(), Some(now + Duration::from_secs(1)));
        assert_eq!(looser.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[test]
    fn cancel_keeps_parent_deadline() {
        let now = Instant::now();
        let ctx = Context::background().with_deadline(now + Duration::from_secs(5));
        let (child, _) = ctx.with_cancel();
        assert_eq!(child.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn expired_deadline_fails_before_polling() {
        let ctx = Context::background().with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
        let result = ctx.run(never_polled()).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn run_stops_at_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let started = Instant::now();
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let (ctx, cancel) = Context::background().with_cancel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
        let started = Instant::now();
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancelled_future_is_dropped() {
        struct Flag(std::sync::Arc<std::sync::atomic::AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let dropped = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Flag(dropped.clone());
        let (ctx, cancel) = Context::background().with_cancel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let result = ctx
            .run(async move {
                let _flag = flag;
                std::future::pending::<()>().await
            })
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    #[should_panic(expected = "transport exploded")]
    async fn panics_are_not_reported_as_cancellation() {
        let _ = Context::background().run(explode()).await;
    }
}
