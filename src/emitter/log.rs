use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Status, Submission};
use super::Emitter;

/// Writes every submission to the log
pub struct LogEmitter;

#[async_trait]
impl Emitter for LogEmitter {
    fn name(&self) -> &str { "log" }

    async fn emit(&self, batch: &[Submission]) -> Result<()> {
        let mut metrics = 0usize;
        for submission in batch {
            match submission {
                Submission::Metric(m) => {
                    metrics += 1;
                    tracing::debug!(
                        metric = %m.name,
                        value = m.value,
                        method = %m.method,
                        tags = ?m.tags,
                        hostname = m.hostname.as_deref().unwrap_or(""),
                        "metric"
                    );
                }
                Submission::ServiceCheck(sc) if sc.status == Status::Ok => {
                    tracing::info!(
                        check = %sc.name,
                        status = %sc.status,
                        tags = ?sc.tags,
                        "service check"
                    );
                }
                Submission::Event(e) => {
                    tracing::info!(
                        title = %e.title,
                        alert_type = %e.alert_type,
                        tags = ?e.tags,
                        hostname = e.hostname.as_deref().unwrap_or(""),
                        "event"
                    );
                }
                Submission::ServiceCheck(sc) => {
                    tracing::warn!(
                        check = %sc.name,
                        status = %sc.status,
                        message = sc.message.as_deref().unwrap_or(""),
                        tags = ?sc.tags,
                        "service check"
                    );
                }
            }
        }
        tracing::info!(metrics, total = batch.len(), "Emitted batch");
        Ok(())
    }
}
