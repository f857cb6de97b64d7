pub mod aci;
pub mod stats;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::aggregator::Aggregator;
use crate::api::{ClientFactory, SessionCache};
use crate::config::Config;

/// Trait for all configured checks.
///
/// A check talks to one monitored system per run and writes metric samples
/// and service checks into the aggregator it is handed.
#[async_trait]
pub trait Check: Send + Sync {
    /// Name used in logs (e.g., "cisco_aci", "vault")
    fn name(&self) -> &str;

    /// Run once. Submissions made before an error are kept.
    async fn run(&mut self, aggregator: &mut Aggregator) -> Result<()>;

    /// Run interval in seconds
    fn interval_secs(&self) -> u64;
}

/// Create one check per configured instance
pub fn create_checks(
    config: &Config,
    cache: Arc<SessionCache>,
    factory: Arc<dyn ClientFactory>,
) -> Result<Vec<Box<dyn Check>>> {
    let mut checks: Vec<Box<dyn Check>> = Vec::new();
    let default_interval = config.agent.default_interval_secs;

    for instance in &config.cisco_aci {
        checks.push(Box::new(aci::AciCheck::new(
            instance.clone(),
            cache.clone(),
            factory.clone(),
            default_interval,
        )?));
    }

    for instance in &config.vault {
        checks.push(Box::new(stats::StatsCheck::new(
            instance.clone(),
            factory.as_ref(),
            default_interval,
        )?));
    }

    tracing::info!(count = checks.len(), "Initialized checks");
    Ok(checks)
}
