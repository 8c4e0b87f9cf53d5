//! Process-wide daily translation quota.
//!
//! One `QuotaTracker` is shared (behind an `Arc`) by every job in the
//! process. The counter resets at UTC midnight: the first request on a new
//! UTC day clears the previous day's usage.

use crate::error::{AutodubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct QuotaTracker {
    limit: u64,
    used: AtomicU64,
    day: Mutex<NaiveDate>,
}

impl QuotaTracker {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: AtomicU64::new(0),
            day: Mutex::new(Utc::now().date_naive()),
        }
    }

    pub fn shared(limit: u64) -> Arc<Self> {
        Arc::new(Self::new(limit))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used())
    }

    /// Reserve `units` requests for `today`, failing without side effects
    /// when the reservation would exceed the limit.
    pub fn try_acquire_on(&self, today: NaiveDate, units: u64) -> Result<()> {
        self.roll_over(today);

        let mut current = self.used.load(Ordering::SeqCst);
        loop {
            let next = current + units;
            if next > self.limit {
                return Err(AutodubError::QuotaExceeded {
                    used: current,
                    limit: self.limit,
                });
            }
            match self
                .used
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => {
                    debug!("Translation quota: {}/{}", next, self.limit);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn try_acquire(&self, units: u64) -> Result<()> {
        self.try_acquire_on(Utc::now().date_naive(), units)
    }

    fn roll_over(&self, today: NaiveDate) {
        let mut day = match self.day.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if today > *day {
            info!("New UTC day {}, resetting translation quota", today);
            *day = today;
            self.used.store(0, Ordering::SeqCst);
        }
    }
}

/// Wraps a translator so every call is charged against a shared quota.
/// Calls past the limit fail before reaching the provider.
pub struct QuotaLimitedTranslator<T> {
    inner: T,
    quota: Arc<QuotaTracker>,
}

impl<T: Translator> QuotaLimitedTranslator<T> {
    pub fn new(inner: T, quota: Arc<QuotaTracker>) -> Self {
        Self { inner, quota }
    }
}

#[async_trait]
impl<T: Translator> Translator for QuotaLimitedTranslator<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        // One batch is one request against the provider.
        self.quota.try_acquire(1)?;
        self.inner.translate_batch(texts, source_lang, target_lang).await
    }

    fn supported_languages(&self) -> &[&str] {
        self.inner.supported_languages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_limit() {
        let quota = QuotaTracker::new(2);
        assert!(quota.try_acquire(1).is_ok());
        assert!(quota.try_acquire(1).is_ok());
        let err = quota.try_acquire(1).unwrap_err();
        assert!(matches!(err, AutodubError::QuotaExceeded { used: 2, limit: 2 }));
        assert_eq!(quota.remaining(), 0);
    }

    #[test]
    fn test_resets_on_new_day() {
        let quota = QuotaTracker::new(1);
        let today = Utc::now().date_naive();
        assert!(quota.try_acquire_on(today, 1).is_ok());
        assert!(quota.try_acquire_on(today, 1).is_err());

        let tomorrow = today.succ_opt().unwrap();
        assert!(quota.try_acquire_on(tomorrow, 1).is_ok());
        assert_eq!(quota.used(), 1);
    }

    #[test]
    fn test_concurrent_acquire_never_overshoots() {
        let quota = QuotaTracker::shared(50);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let quota = Arc::clone(&quota);
                std::thread::spawn(move || (0..20).filter(|_| quota.try_acquire(1).is_ok()).count())
            })
            .collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 50);
        assert_eq!(quota.used(), 50);
    }
}
