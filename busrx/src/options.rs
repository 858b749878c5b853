//! Tuning options and their presence-based merge onto client defaults.

use std::time::Duration;

use busrx_client::PushHandlerOptions;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Caller-overridable tuning knobs layered onto receiver client defaults.
///
/// An unset field is not an override: the merged value falls back to
/// whatever the receiver client considers default. The merge is strictly
/// presence-based; a field set to the client's own default value still
/// counts as an override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedOptions {
    /// Maximum number of concurrent push handler invocations
    pub max_concurrent_calls: Option<u32>,
    /// Upper bound on automatic message-lock renewal while a handler runs
    pub max_auto_renew_duration: Option<Duration>,
}

impl ReducedOptions {
    /// Merge these overrides onto the given defaults, field by field.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Configuration` if `max_concurrent_calls` is set
    /// to zero. No other validation is performed.
    pub fn merge_onto(&self, defaults: PushHandlerOptions) -> Result<PushHandlerOptions> {
        if self.max_concurrent_calls == Some(0) {
            return Err(StreamError::Configuration(
                "max_concurrent_calls must be positive".to_string(),
            ));
        }
        Ok(PushHandlerOptions {
            max_concurrent_calls: self
                .max_concurrent_calls
                .unwrap_or(defaults.max_concurrent_calls),
            max_auto_renew_duration: self
                .max_auto_renew_duration
                .unwrap_or(defaults.max_auto_renew_duration),
            fault_handler: defaults.fault_handler,
        })
    }
}
