//! Background publisher for scheduled content

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::blog::BlogService;
use super::property::PropertyService;

pub struct Scheduler {
    blog: Arc<BlogService>,
    properties: Arc<PropertyService>,
}

impl Scheduler {
    pub fn new(blog: Arc<BlogService>, properties: Arc<PropertyService>) -> Self {
        Self { blog, properties }
    }

    /// Publish everything due at `now`; returns how many records changed
    pub async fn run_once(&self, now: DateTime<Utc>) -> usize {
        let mut published = 0;

        match self.blog.publish_due(now).await {
            Ok(n) => published += n,
            Err(e) => tracing::error!("Scheduled blog publishing failed: {}", e),
        }
        match self.properties.publish_due(now).await {
            Ok(n) => published += n,
            Err(e) => tracing::error!("Scheduled property publishing failed: {}", e),
        }

        if published > 0 {
            tracing::info!("Scheduler published {} record(s)", published);
        }
        published
    }

    /// Run every `interval_seconds` until the runtime shuts down
    pub fn spawn(self, interval_seconds: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));
            loop {
                interval.tick().await;
                self.run_once(Utc::now()).await;
            }
        })
    }
}
