//! The check orchestrator.
//!
//! One call runs the single-shot pipeline encode → exchange → decode → apply
//! and always produces exactly one verdict, resolving every pipeline error
//! through the configured failure policy. The gate holds only read-only
//! configuration and the optional block-log sink, so concurrent checks are
//! independent; each owns its own connection and buffers.

use std::sync::Arc;

use thiserror::Error;

use crate::applier::{self, InvalidStatus};
use crate::blocklog::BlockLog;
use crate::config::GateConfig;
use crate::decoder::{self, DecodeError};
use crate::encoder::build_check_payload;
use crate::wire::{self, WireError};
use crate::{BlockResponse, RequestFacts, Verdict};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Status(#[from] InvalidStatus),
}

#[derive(Clone)]
pub struct Gate {
    config: Arc<GateConfig>,
    block_log: Option<Arc<BlockLog>>,
}

impl Gate {
    /// Build a gate from an immutable configuration. The block log, when
    /// configured, is opened here; an unopenable file disables it with a
    /// warning rather than failing construction.
    pub fn new(config: GateConfig) -> Self {
        let block_log = match config.block_log_file.as_deref() {
            Some(path) => match BlockLog::open(path, config.block_log_max_bytes) {
                Ok(log) => Some(Arc::new(log)),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to open block log; block logging to file disabled");
                    None
                }
            },
            None => None,
        };
        Self {
            config: Arc::new(config),
            block_log,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run one check for one logical request. Callers must invoke this at
    /// most once per request; dropping the returned future abandons the
    /// in-flight exchange and closes its socket.
    pub async fn check(&self, facts: &RequestFacts) -> Verdict {
        if !self.config.enabled {
            return Verdict::Allow;
        }
        match self.run_pipeline(facts).await {
            Ok(verdict) => {
                if let Verdict::Block(response) = &verdict {
                    self.log_block(facts, response);
                }
                verdict
            }
            Err(err) => self.resolve_failure(err),
        }
    }

    async fn run_pipeline(&self, facts: &RequestFacts) -> Result<Verdict, CheckError> {
        let payload = build_check_payload(facts, self.config.max_body_bytes);
        tracing::debug!(bytes = payload.len(), "built check payload");

        let raw = wire::exchange(&self.config, &payload).await?;
        tracing::debug!(bytes = raw.len(), "received decision response");

        let decision = decoder::decode(&raw)?;
        tracing::debug!(
            code = decision.code,
            headers = decision.headers.len(),
            body_bytes = decision.body.len(),
            "decoded decision"
        );

        Ok(applier::apply(decision)?)
    }

    fn resolve_failure(&self, err: CheckError) -> Verdict {
        if self.config.fail_open {
            tracing::warn!(error = %err, "check failed, allowing request (fail-open)");
            Verdict::Allow
        } else {
            tracing::warn!(error = %err, "check failed, blocking request (fail-closed)");
            Verdict::Block(BlockResponse::internal_error())
        }
    }

    fn log_block(&self, facts: &RequestFacts, response: &BlockResponse) {
        if !self.config.log_blocked {
            return;
        }
        tracing::warn!(
            client = %facts.client_address,
            method = %facts.method,
            url = %facts.url,
            status = response.status,
            body_bytes = response.body.len(),
            "request blocked by decision service"
        );
        if let Some(log) = &self.block_log {
            log.record(facts, response.status, response.body.len());
        }
    }
}
