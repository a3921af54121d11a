//! Observer notifications emitted by the engine

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use super::{CompositionStrategy, ModelWeights};

#[derive(Debug, Clone, Serialize)]
pub enum EngineEvent {
    ProfitCalculated {
        opportunity_id: String,
        risk_adjusted_profit: Decimal,
        profitability: f64,
    },
    BundleComposed {
        bundle_id: String,
        strategy: CompositionStrategy,
        size: usize,
        net_profit: Decimal,
        is_valid: bool,
    },
    CompositionRejected {
        strategy: CompositionStrategy,
        opportunities_considered: usize,
    },
    SuccessEstimated {
        bundle_id: String,
        success_probability: f64,
        submit: bool,
    },
    ModelUpdated {
        bundle_id: String,
        error: f64,
        weights: ModelWeights,
    },
    NetworkRefreshed {
        slot: u64,
        congestion: f64,
    },
}

/// Optional observer channel. Dropped receivers are ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(sender: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
