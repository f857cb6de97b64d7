pub mod capacity;
pub mod fabric;
pub mod metrics;
pub mod tenant;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info};

use super::Check;
use crate::aggregator::Aggregator;
use crate::api::{
    ApiError, ClientFactory, Credentials, Endpoint, SessionCache, SessionPool, SharedPool,
};
use crate::attributes::{children, extract_attributes, object_class};
use crate::config::AciInstance;
use crate::types::{Event, Status};
use crate::zero::can_be_zero;

use self::metrics::{lookup, metric_name, StatClass};
use self::tenant::EventCursor;

pub const SERVICE_CHECK_NAME: &str = "cisco_aci.can_connect";

/// Collects tenant, fabric and capacity metrics from one controller cluster
pub struct AciCheck {
    instance: AciInstance,
    urls: Vec<String>,
    cache: Arc<SessionCache>,
    factory: Arc<dyn ClientFactory>,
    events: EventCursor,
    interval: u64,
}

impl AciCheck {
    pub fn new(
        instance: AciInstance,
        cache: Arc<SessionCache>,
        factory: Arc<dyn ClientFactory>,
        default_interval: u64,
    ) -> Result<Self> {
        let urls = instance.urls()?;
        let interval = instance.interval_secs.unwrap_or(default_interval);
        Ok(Self {
            instance,
            urls,
            cache,
            factory,
            events: EventCursor::new(Utc::now()),
            interval,
        })
    }

    fn service_check_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.urls.iter().map(|u| format!("url:{}", u)).collect();
        tags.push("cisco".to_string());
        tags.extend(self.instance.tags.iter().cloned());
        tags
    }

    /// The cached pool for this configuration, built on first use
    fn pool(&self) -> SharedPool {
        self.cache.get_or_insert_with(self.instance.content_hash(), || {
            let timeout = Duration::from_secs(self.instance.timeout);
            let endpoints = self
                .urls
                .iter()
                .map(|u| Endpoint::new(u.as_str(), self.instance.ssl_verify, timeout))
                .collect();
            let credentials = Credentials {
                username: self.instance.username.clone(),
                password: self.instance.pwd.clone(),
            };
            SessionPool::new(endpoints, credentials, self.factory.clone())
        })
    }
}

#[async_trait]
impl Check for AciCheck {
    fn name(&self) -> &str {
        "cisco_aci"
    }

    async fn run(&mut self, aggregator: &mut Aggregator) -> Result<()> {
        info!("Starting Cisco Check");
        let start = Instant::now();
        let sc_tags = self.service_check_tags();

        let pool = self.pool();
        let mut api = pool.lock().await;

        // Client construction happens inside login, so a bad TLS setup lands here too
        if let Err(e) = api.login().await {
            error!(error = %e, "Cannot login to the Cisco ACI");
            aggregator.service_check(
                SERVICE_CHECK_NAME,
                Status::Critical,
                Some(format!("aci login returned a status of {}", e)),
                &sc_tags,
            );
            return Err(e.into());
        }

        let outcome = {
            let mut ctx = Collection::new(&api, &self.instance.tags, aggregator);
            collect_all(&mut ctx, &self.instance.tenant, &mut self.events).await
        };

        if let Err((phase, e)) = outcome {
            api.close();
            error!(phase, error = %e, "Collection failed");
            aggregator.service_check(
                SERVICE_CHECK_NAME,
                Status::Critical,
                Some(format!("aci {} operations failed, returning a status of {}", phase, e)),
                &sc_tags,
            );
            return Err(anyhow::Error::new(e).context(format!("aci {} collection failed", phase)));
        }

        aggregator.service_check(SERVICE_CHECK_NAME, Status::Ok, None, &sc_tags);
        api.close();

        if self.instance.report_timing {
            info!(elapsed_ms = start.elapsed().as_millis() as u64, "finished running Cisco Check");
        } else {
            info!("finished running Cisco Check");
        }
        Ok(())
    }

    fn interval_secs(&self) -> u64 {
        self.interval
    }
}

async fn collect_all(
    ctx: &mut Collection<'_>,
    tenants: &[String],
    events: &mut EventCursor,
) -> Result<(), (&'static str, ApiError)> {
    tenant::collect(ctx, tenants, events).await.map_err(|e| ("tenant", e))?;
    fabric::collect(ctx).await.map_err(|e| ("fabric", e))?;
    capacity::collect(ctx).await.map_err(|e| ("capacity", e))
}

/// State shared by the collection phases of a single run
pub struct Collection<'a> {
    pub api: &'a SessionPool,
    instance_tags: &'a [String],
    aggregator: &'a mut Aggregator,
}

impl<'a> Collection<'a> {
    pub fn new(
        api: &'a SessionPool,
        instance_tags: &'a [String],
        aggregator: &'a mut Aggregator,
    ) -> Self {
        Self {
            api,
            instance_tags,
            aggregator,
        }
    }

    /// Walk `objects` and their children, submitting every stats object
    /// whose class appears in `table`
    pub fn submit_stats(
        &mut self,
        objects: &[Value],
        table: &'static [StatClass],
        scope: &str,
        tags: &[String],
        hostname: Option<&str>,
    ) {
        for obj in objects {
            if let Some(metrics) = object_class(obj).and_then(|class| lookup(table, class)) {
                let attrs = extract_attributes(obj);
                for m in metrics {
                    let value = attrs.get(m.attribute);
                    if !can_be_zero(m.attribute, value, &attrs) {
                        continue;
                    }
                    let Some(value) = value.and_then(as_number) else {
                        debug!(attribute = m.attribute, "Skipping non-numeric stat");
                        continue;
                    };
                    let tags = self.tags_for(tags, hostname);
                    self.aggregator
                        .submit(&metric_name(scope, m.suffix), value, &tags, m.method, hostname);
                }
            }
            self.submit_stats(children(obj), table, scope, tags, hostname);
        }
    }

    pub fn gauge(&mut self, suffix: &str, value: f64, tags: &[String], hostname: Option<&str>) {
        let tags = self.tags_for(tags, hostname);
        self.aggregator
            .gauge(&format!("{}.{}", metrics::METRIC_PREFIX, suffix), value, &tags, hostname);
    }

    /// Submit an event with the same tagging rules as metrics
    pub fn event(&mut self, mut event: Event, tags: &[String], hostname: Option<&str>) {
        event.tags = self.tags_for(tags, hostname).into_iter().collect();
        event.hostname = hostname.map(str::to_string);
        self.aggregator.event(event);
    }

    fn tags_for(&self, tags: &[String], hostname: Option<&str>) -> Vec<String> {
        let mut all = Vec::with_capacity(tags.len() + self.instance_tags.len() + 1);
        all.extend_from_slice(tags);
        all.extend_from_slice(self.instance_tags);
        if hostname.is_some() {
            all.push("cisco".to_string());
        }
        all
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool() -> SessionPool {
        let credentials = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        SessionPool::new(vec![], credentials, Arc::new(crate::api::ReqwestFactory))
    }

    fn health(avg: &str, cnt: &str) -> Value {
        json!({
            "fvTenant": {
                "attributes": {"dn": "uni/tn-acme", "name": "acme"},
                "children": [
                    {"fvOverallHealthHist15min": {"attributes": {
                        "healthAvg": avg, "healthMax": "97", "cnt": cnt
                    }}},
                    {"fvFltCounter15min": {"attributes": {
                        "critcountLast": "0", "majcountLast": "2"
                    }}},
                    {"fvRsBd": {"attributes": {"tnFvBDName": "default"}}}
                ]
            }
        })
    }

    #[test]
    fn walks_children_and_tags_samples() {
        let pool = pool();
        let instance_tags = vec!["env:prod".to_string()];
        let mut agg = Aggregator::new();
        let mut ctx = Collection::new(&pool, &instance_tags, &mut agg);

        let tags = vec!["tenant:acme".to_string()];
        ctx.submit_stats(&[health("95", "4")], metrics::TENANT_STATS, "tenant", &tags, None);

        let avg: Vec<_> = agg.metrics_named("cisco_aci.tenant.health.avg").collect();
        assert_eq!(avg.len(), 1);
        assert_eq!(avg[0].value, 95.0);
        assert_eq!(avg[0].tags.as_slice(), ["tenant:acme", "env:prod"]);
        // *Last attributes are reported even at zero
        assert_eq!(agg.metrics_named("cisco_aci.tenant.fault_counter.critical").count(), 1);
        assert_eq!(agg.metrics_named("cisco_aci.tenant.fault_counter.major").count(), 1);
        // healthMin is absent
        assert_eq!(agg.metrics_named("cisco_aci.tenant.health.min").count(), 0);
    }

    #[test]
    fn zero_without_observations_is_suppressed() {
        let pool = pool();
        let mut agg = Aggregator::new();
        let mut ctx = Collection::new(&pool, &[], &mut agg);

        ctx.submit_stats(&[health("0", "0")], metrics::TENANT_STATS, "tenant", &[], None);

        assert_eq!(agg.metrics_named("cisco_aci.tenant.health.avg").count(), 0);
        assert_eq!(agg.metrics_named("cisco_aci.tenant.health.max").count(), 1);
    }

    #[test]
    fn hostname_adds_cisco_tag() {
        let pool = pool();
        let mut agg = Aggregator::new();
        let mut ctx = Collection::new(&pool, &[], &mut agg);

        let tags = vec!["node_id:101".to_string()];
        ctx.gauge("capacity.leaf.vrf.utilized", 12.0, &tags, Some("pod-1-node-101"));

        let sample = agg.metrics().next().unwrap();
        assert_eq!(sample.name, "cisco_aci.capacity.leaf.vrf.utilized");
        assert_eq!(sample.hostname.as_deref(), Some("pod-1-node-101"));
        assert_eq!(sample.tags.as_slice(), ["node_id:101", "cisco"]);
    }
}
