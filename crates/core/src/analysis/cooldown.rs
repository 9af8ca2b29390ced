//! Minimum spacing between calls into the external model.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide call spacer shared by every orchestrator operation.
///
/// The lock is held while waiting, so concurrent callers queue behind each other and each one
/// starts at least `window` after the previous one started.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_call: Mutex::new(None),
        }
    }

    /// Waits until the window since the previous call has elapsed, then records this call.
    ///
    /// Returns how long the caller was held back.
    pub async fn wait(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.window;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_not_delayed() {
        let cooldown = Cooldown::new(Duration::from_secs(10));
        assert_eq!(cooldown.wait().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_out_the_remaining_window() {
        let cooldown = Cooldown::new(Duration::from_secs(10));
        cooldown.wait().await;

        tokio::time::advance(Duration::from_secs(4)).await;
        let start = Instant::now();
        let waited = cooldown.wait().await;

        assert_eq!(waited, Duration::from_secs(6));
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn call_after_window_is_not_delayed() {
        let cooldown = Cooldown::new(Duration::from_secs(10));
        cooldown.wait().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cooldown.wait().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced_strictly() {
        let cooldown = Arc::new(Cooldown::new(Duration::from_secs(10)));
        let origin = Instant::now();

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let cooldown = Arc::clone(&cooldown);
                tokio::spawn(async move {
                    cooldown.wait().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for task in tasks {
            starts.push(task.await.unwrap() - origin);
        }
        starts.sort();

        assert_eq!(starts[0], Duration::ZERO);
        assert!(starts[1] >= Duration::from_secs(10));
        assert!(starts[2] >= Duration::from_secs(20));
    }
}
