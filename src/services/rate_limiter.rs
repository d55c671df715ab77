//! In-memory rate limiting
//!
//! - Failed admin logins: 5 per username per 15 minutes
//! - Public form submissions (contact, newsletter): 10 per IP per minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::RwLock;

const MAX_FAILED_LOGINS: usize = 5;
const LOGIN_WINDOW_MINUTES: i64 = 15;
const MAX_FORM_SUBMISSIONS: usize = 10;
const FORM_WINDOW_MINUTES: i64 = 1;

pub struct LoginRateLimiter {
    failed_logins: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
    form_submissions: RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            failed_logins: RwLock::new(HashMap::new()),
            form_submissions: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `login` (username or email, case-insensitive) is locked out
    pub async fn is_login_limited(&self, login: &str) -> bool {
        let cutoff = Utc::now() - Duration::minutes(LOGIN_WINDOW_MINUTES);
        let mut attempts = self.failed_logins.write().await;
        let times = attempts.entry(login.to_lowercase()).or_default();
        times.retain(|t| *t > cutoff);
        times.len() >= MAX_FAILED_LOGINS
    }

    pub async fn record_failed_login(&self, login: &str) {
        self.failed_logins
            .write()
            .await
            .entry(login.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Forget failures after a successful login
    pub async fn clear_failed_logins(&self, login: &str) {
        self.failed_logins.write().await.remove(&login.to_lowercase());
    }

    /// Count a public form submission from `ip`; returns false when over the limit
    pub async fn allow_form_submission(&self, ip: IpAddr) -> bool {
        let now = Utc::now();
        let cutoff = now - Duration::minutes(FORM_WINDOW_MINUTES);
        let mut submissions = self.form_submissions.write().await;
        let times = submissions.entry(ip).or_default();
        times.retain(|t| *t > cutoff);
        if times.len() >= MAX_FORM_SUBMISSIONS {
            return false;
        }
        times.push(now);
        true
    }

    /// Drop expired entries; run periodically
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let login_cutoff = now - Duration::minutes(LOGIN_WINDOW_MINUTES);
        let form_cutoff = now - Duration::minutes(FORM_WINDOW_MINUTES);

        self.failed_logins.write().await.retain(|_, times| {
            times.retain(|t| *t > login_cutoff);
            !times.is_empty()
        });
        self.form_submissions.write().await.retain(|_, times| {
            times.retain(|t| *t > form_cutoff);
            !times.is_empty()
        });
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_lockout_after_five_failures() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            limiter.record_failed_login("editor").await;
        }
        assert!(!limiter.is_login_limited("editor").await);

        limiter.record_failed_login("EDITOR").await;
        assert!(limiter.is_login_limited("Editor").await);
        assert!(!limiter.is_login_limited("someone-else").await);

        limiter.clear_failed_logins("editor").await;
        assert!(!limiter.is_login_limited("editor").await);
    }

    #[tokio::test]
    async fn test_form_submissions_per_ip() {
        let limiter = LoginRateLimiter::new();
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let other: IpAddr = "203.0.113.10".parse().unwrap();

        for _ in 0..MAX_FORM_SUBMISSIONS {
            assert!(limiter.allow_form_submission(ip).await);
        }
        assert!(!limiter.allow_form_submission(ip).await);
        assert!(limiter.allow_form_submission(other).await);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_entries() {
        let limiter = LoginRateLimiter::new();
        for _ in 0..5 {
            limiter.record_failed_login("admin").await;
        }
        limiter.cleanup().await;
        assert!(limiter.is_login_limited("admin").await);
    }
}
