//! Minimum spacing between outbound model calls.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide pacing state, shared by `Arc` between every generation path.
///
/// The interval check and the reservation of the slot happen under one lock,
/// so two concurrent callers can never both pass the check.
#[derive(Debug)]
pub struct RateLimiter {
  min_interval: Duration,
  last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
  pub fn new(min_interval: Duration) -> Self {
    Self { min_interval, last_request: Mutex::new(None) }
  }

  /// Reserve the next call slot. On refusal returns how long until the
  /// interval since the previous call has elapsed.
  pub async fn try_acquire(&self) -> Result<(), Duration> {
    let mut last = self.last_request.lock().await;
    let now = Instant::now();
    if let Some(prev) = *last {
      let elapsed = now.saturating_duration_since(prev);
      if elapsed < self.min_interval {
        return Err(self.min_interval - elapsed);
      }
    }
    *last = Some(now);
    Ok(())
  }

  #[cfg(test)]
  pub async fn last_request(&self) -> Option<Instant> {
    *self.last_request.lock().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn second_call_inside_interval_is_refused() {
    let l = RateLimiter::new(Duration::from_secs(15));
    assert_eq!(l.last_request().await, None);
    assert!(l.try_acquire().await.is_ok());

    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(l.try_acquire().await, Err(Duration::from_secs(11)));

    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(l.try_acquire().await.is_ok());
  }

  #[tokio::test(start_paused = true)]
  async fn zero_interval_never_refuses() {
    let l = RateLimiter::new(Duration::ZERO);
    for _ in 0..3 {
      assert!(l.try_acquire().await.is_ok());
    }
  }

  #[tokio::test(start_paused = true)]
  async fn concurrent_callers_get_one_slot() {
    let l = std::sync::Arc::new(RateLimiter::new(Duration::from_secs(15)));
    let (a, b) = tokio::join!(l.try_acquire(), l.try_acquire());
    assert!(a.is_ok() ^ b.is_ok());
  }
}
