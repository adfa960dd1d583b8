//! Outgoing signals for metrics and effects pipelines.
//!
//! The negotiation core emits a [`Signal`] for every completed or failed
//! trade. What consumes them (metrics, visual effects) is outside the
//! simulation; [`SignalBuffer`] simply collects them until drained.

use serde::{Deserialize, Serialize};

use hearth_types::{AgentId, SocietyId};

/// A named scalar emitted by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal identifier, e.g. `trade.success`.
    pub signal_id: String,
    /// Emitted value.
    pub value: f32,
    /// Agent the signal is about.
    pub subject: AgentId,
    /// Counterpart, if any.
    pub target: Option<AgentId>,
    /// Society of the subject.
    pub society: SocietyId,
    /// Free-form context (resource or need id).
    pub context_id: String,
}

/// Receiver of emitted signals. Must not block or fail.
pub trait SignalSink {
    /// Emit one signal.
    fn emit(&mut self, signal: Signal);
}

/// Signal sink that collects everything it receives.
#[derive(Debug, Clone, Default)]
pub struct SignalBuffer {
    /// Collected signals in emission order.
    signals: Vec<Signal>,
}

impl SignalBuffer {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    /// Collected signals in emission order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Sum of values of all signals named `signal_id`.
    pub fn total(&self, signal_id: &str) -> f32 {
        self.signals
            .iter()
            .filter(|s| s.signal_id == signal_id)
            .map(|s| s.value)
            .sum()
    }

    /// Remove and return all collected signals.
    pub fn drain(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}

impl SignalSink for SignalBuffer {
    fn emit(&mut self, signal: Signal) {
        self.signals.push(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(id: &str, value: f32) -> Signal {
        Signal {
            signal_id: id.to_owned(),
            value,
            subject: AgentId::new(0),
            target: None,
            society: SocietyId::new(0),
            context_id: "water".to_owned(),
        }
    }

    #[test]
    fn totals_by_signal_id() {
        let mut buffer = SignalBuffer::new();
        buffer.emit(signal("trade.success", 2.0));
        buffer.emit(signal("trade.success", 1.5));
        buffer.emit(signal("trade.failed", 1.0));
        assert!((buffer.total("trade.success") - 3.5).abs() < f32::EPSILON);
        assert_eq!(buffer.drain().len(), 3);
        assert!(buffer.signals().is_empty());
    }
}
