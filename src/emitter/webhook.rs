use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

use crate::config::WebhookConfig;
use crate::types::Submission;
use super::Emitter;

/// Posts each batch as JSON to a collector endpoint
pub struct WebhookEmitter {
    url: String,
    headers: std::collections::HashMap<String, String>,
    hostname: String,
    client: reqwest::Client,
}

impl WebhookEmitter {
    pub fn new(config: &WebhookConfig, hostname: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            headers: config.headers.clone(),
            hostname: hostname.to_string(),
            client,
        })
    }

    fn payload(&self, batch: &[Submission]) -> serde_json::Value {
        json!({
            "hostname": &self.hostname,
            "timestamp": Utc::now().to_rfc3339(),
            "submissions": batch,
        })
    }
}

#[async_trait]
impl Emitter for WebhookEmitter {
    fn name(&self) -> &str { "webhook" }

    async fn emit(&self, batch: &[Submission]) -> Result<()> {
        let mut req = self.client.post(&self.url).json(&self.payload(batch));
        for (k, v) in &self.headers {
            req = req.header(k, v);
        }

        req.send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::types::Status;

    #[test]
    fn payload_shape() {
        let config = WebhookConfig {
            enabled: true,
            url: "http://127.0.0.1:9/ingest".into(),
            headers: Default::default(),
            timeout_secs: 1,
        };
        let emitter = WebhookEmitter::new(&config, "collector-1").unwrap();

        let mut agg = Aggregator::new();
        agg.rate("vault.http.rq_total", 4.0, &["stat_prefix:ingress".into()], None);
        agg.service_check("vault.can_connect", Status::Critical, Some("down".into()), &[]);
        let payload = emitter.payload(&agg.drain());

        assert_eq!(payload["hostname"], "collector-1");
        let subs = payload["submissions"].as_array().unwrap();
        assert_eq!(subs[0]["type"], "metric");
        assert_eq!(subs[0]["method"], "rate");
        assert_eq!(subs[0]["tags"][0], "stat_prefix:ingress");
        assert_eq!(subs[1]["type"], "service_check");
        assert_eq!(subs[1]["status"], "Critical");
    }
}
