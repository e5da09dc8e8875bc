use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{Fuse, FuturesUnordered};
use futures::{Future, Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::{interval, MissedTickBehavior};

/// Hands out `per_second` permits, refilled every second.
///
/// Permits are forgotten once their download completes, so at most
/// `per_second` downloads start in any one-second window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
}

impl RateLimiter {
    pub fn new(per_second: usize) -> Self {
        let permits = Arc::new(Semaphore::new(per_second));

        let refill: Weak<Semaphore> = Arc::downgrade(&permits);
        tokio::spawn(async move {
            let mut ticks = interval(Duration::from_secs(1));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                // Limiter dropped, crawl is over
                let Some(permits) = refill.upgrade() else {
                    break;
                };
                let available = permits.available_permits();
                permits.add_permits(per_second.saturating_sub(available));
            }
        });

        Self { permits }
    }

    pub fn try_acquire_owned(&self) -> Result<OwnedSemaphorePermit, TryAcquireError> {
        self.permits.clone().try_acquire_owned()
    }
}

pin_project! {
    pub struct PermittedFuture<F> {
        #[pin]
        fut: F,
        permit: Option<OwnedSemaphorePermit>,
    }

    impl<F> PinnedDrop for PermittedFuture<F> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(p) = this.permit.take() { p.forget() }
        }
    }
}

impl<F> Future for PermittedFuture<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        self.project().fut.poll(cx)
    }
}

pin_project! {
    /// Like `buffer_unordered`, but a future only starts once a permit is available.
    pub struct RateLimited<St>
    where
        St: Stream,
    {
        #[pin]
        stream: Fuse<St>,
        in_progress: FuturesUnordered<PermittedFuture<St::Item>>,
        limiter: RateLimiter,
    }
}

impl<St> Stream for RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    type Item = <St::Item as Future>::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        let mut starved = false;
        loop {
            let permit = match this.limiter.try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    starved = true;
                    break;
                }
            };
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(fut)) => this.in_progress.push(PermittedFuture {
                    permit: Some(permit),
                    fut,
                }),
                // Unused permit goes back to the semaphore
                Poll::Ready(None) | Poll::Pending => break,
            }
        }

        match this.in_progress.poll_next_unpin(cx) {
            x @ Poll::Pending | x @ Poll::Ready(Some(_)) => return x,
            Poll::Ready(None) => {}
        }

        if this.stream.is_done() {
            Poll::Ready(None)
        } else {
            if starved {
                // Nothing in flight to wake us up, check again after a refill
                let waker = cx.waker().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    waker.wake();
                });
            }
            Poll::Pending
        }
    }
}

pub trait RateLimitedExt: Stream {
    fn rate_limited(self, limiter: RateLimiter) -> RateLimited<Self>
    where
        Self::Item: Future,
        Self: Sized,
    {
        RateLimited {
            stream: self.fuse(),
            in_progress: FuturesUnordered::new(),
            limiter,
        }
    }
}

impl<T: ?Sized> RateLimitedExt for T where T: Stream {}
