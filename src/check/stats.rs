use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::Check;
use crate::aggregator::Aggregator;
use crate::api::{ClientFactory, Endpoint, HttpClient};
use crate::config::StatsInstance;
use crate::metrics::parse_metric;
use crate::types::Status;

pub const SERVICE_CHECK_NAME: &str = "vault.can_connect";

/// Scrapes a plain-text stats page and classifies every numeric line
pub struct StatsCheck {
    instance: StatsInstance,
    client: Arc<dyn HttpClient>,
    interval: u64,
}

impl StatsCheck {
    pub fn new(
        instance: StatsInstance,
        factory: &dyn ClientFactory,
        default_interval: u64,
    ) -> Result<Self> {
        let endpoint = Endpoint::new(
            instance.stats_url.as_str(),
            instance.ssl_verify,
            Duration::from_secs(instance.timeout),
        );
        let client = factory
            .build(&endpoint)
            .map_err(|e| anyhow!("cannot build client for {}: {}", instance.stats_url, e))?;
        let interval = instance.interval_secs.unwrap_or(default_interval);
        Ok(Self {
            instance,
            client,
            interval,
        })
    }

    fn service_check_tags(&self) -> Vec<String> {
        let mut tags = vec![format!("url:{}", self.instance.stats_url)];
        tags.extend(self.instance.tags.iter().cloned());
        tags
    }

    fn critical(&self, aggregator: &mut Aggregator, message: String) -> anyhow::Error {
        let tags = self.service_check_tags();
        let status = Status::Critical;
        aggregator.service_check(SERVICE_CHECK_NAME, status, Some(message.clone()), &tags);
        anyhow!(message)
    }
}

#[async_trait]
impl Check for StatsCheck {
    fn name(&self) -> &str {
        "vault"
    }

    async fn run(&mut self, aggregator: &mut Aggregator) -> Result<()> {
        let url = &self.instance.stats_url;
        let response = match self.client.get(url, &[]).await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, error = %e, "Stats request failed");
                let message = format!("Unable to connect to {}: {}", url, e);
                return Err(self.critical(aggregator, message));
            }
        };
        if !response.is_success() {
            return Err(self.critical(
                aggregator,
                format!("{} returned a status of {}", url, response.status),
            ));
        }

        let mut submitted = 0usize;
        for (stat, value) in parse_stats(&response.body) {
            let parsed = match parse_metric(stat) {
                Ok(p) => p,
                Err(e) => return Err(self.critical(aggregator, e.to_string())),
            };
            let mut tags = parsed.tags;
            tags.extend(self.instance.tags.iter().cloned());
            aggregator.submit(&parsed.name, value, &tags, parsed.method, None);
            submitted += 1;
        }

        debug!(url = %url, metrics = submitted, "Collected stats");
        aggregator.service_check(SERVICE_CHECK_NAME, Status::Ok, None, &self.service_check_tags());
        Ok(())
    }

    fn interval_secs(&self) -> u64 {
        self.interval
    }
}

/// `name: value` pairs with a numeric value. Histogram summaries and
/// anything else that does not parse as a number are skipped.
pub fn parse_stats(body: &str) -> impl Iterator<Item = (&str, f64)> {
    body.lines().filter_map(|line| {
        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim().parse::<f64>().ok()?;
        Some((name, value))
    })
}
