//! 시계 추상화.
//!
//! 만료 판정은 모두 주입된 [`Clock`]을 통해 현재 시각을 얻습니다.
//! 테스트에서는 [`ManualClock`]으로 시간을 직접 움직입니다.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// 현재 시각 제공자.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 움직이는 시계.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 시각을 지정합니다.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// 시각을 앞으로 움직입니다.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(11) + Duration::minutes(59));
        assert_eq!(clock.now(), start + Duration::minutes(719));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
