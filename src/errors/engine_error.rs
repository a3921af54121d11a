//! Custom error types for the engine

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid opportunity {id}: {reason}")]
    InvalidOpportunity {
        id: String,
        reason: String,
    },

    #[error("Inverted prices on opportunity {id}: buy {buy} >= sell {sell}")]
    InvertedPrices {
        id: String,
        buy: Decimal,
        sell: Decimal,
    },

    #[error("Non-positive volume on opportunity {id}: {volume}")]
    NonPositiveVolume {
        id: String,
        volume: Decimal,
    },

    #[error("Estimation failed in {component}: {message}")]
    Estimation {
        component: &'static str,
        message: String,
    },

    #[error("Collaborator {name} failed")]
    Collaborator {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Persistence error: {context}")]
    Persistence {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Circuit breaker active: {reason}")]
    CircuitBreakerOpen {
        reason: String,
        cooldown_remaining: Duration,
    },
}

impl EngineError {
    /// Input errors are caller bugs and must not be retried.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidOpportunity { .. }
                | EngineError::InvertedPrices { .. }
                | EngineError::NonPositiveVolume { .. }
        )
    }

    pub fn estimation(component: &'static str, message: impl Into<String>) -> Self {
        EngineError::Estimation {
            component,
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
