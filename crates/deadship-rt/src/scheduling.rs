//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Runtime helpers supporting the simulator."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Simple async rate limiter that paces virtual time against the wall clock.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
    period: Duration,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_configured_period() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100));
        let first = limiter.tick().await;
        let second = limiter.tick().await;
        assert_eq!(second.duration_since(first), Duration::from_millis(100));
        assert_eq!(limiter.period(), Duration::from_millis(100));
    }
}
