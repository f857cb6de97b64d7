pub mod log;
pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::OutputConfig;
use crate::types::Submission;

/// Trait for submission delivery channels
#[async_trait]
pub trait Emitter: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Deliver one batch produced by a single check run
    async fn emit(&self, batch: &[Submission]) -> Result<()>;
}

/// Fans each batch out to every configured emitter
pub struct Dispatcher {
    emitters: Vec<Box<dyn Emitter>>,
}

impl Dispatcher {
    pub fn new(config: &OutputConfig, hostname: &str) -> Result<Self> {
        let mut emitters: Vec<Box<dyn Emitter>> = vec![Box::new(log::LogEmitter)];

        if let Some(ref wc) = config.webhook {
            if wc.enabled {
                emitters.push(Box::new(webhook::WebhookEmitter::new(wc, hostname)?));
            }
        }

        tracing::info!(emitters = emitters.len(), "Initialized emitters");
        Ok(Self { emitters })
    }

    pub fn with_emitters(emitters: Vec<Box<dyn Emitter>>) -> Self {
        Self { emitters }
    }

    /// Emitter failures are logged and do not stop the other emitters
    pub async fn dispatch(&self, batch: &[Submission]) {
        if batch.is_empty() {
            return;
        }
        for emitter in &self.emitters {
            if let Err(e) = emitter.emit(batch).await {
                tracing::error!(emitter = emitter.name(), error = %e, "Failed to emit batch");
            }
        }
    }
}
