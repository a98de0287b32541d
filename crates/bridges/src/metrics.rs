//! Metrics for the rollup processor and DeFi bridges.

use metrics::{Counter, Gauge, Histogram, counter, gauge, histogram};

/// Rollup processor metrics
#[derive(Clone)]
pub struct ProcessorMetrics {
    /// Conversions accepted by the processor
    pub conversions: Counter,

    /// Conversions rejected by validation or by the bridge
    pub conversions_rejected: Counter,

    /// Asynchronous interactions awaiting finalisation
    pub pending_interactions: Gauge,

    /// Asynchronous interactions finalised
    pub interactions_finalised: Counter,

    /// Input amount per conversion, as an f64 approximation
    pub conversion_input: Histogram,
}

impl Default for ProcessorMetrics {
    fn default() -> Self {
        Self {
            conversions: counter!("rollup_processor_conversions"),
            conversions_rejected: counter!("rollup_processor_conversions_rejected"),
            pending_interactions: gauge!("rollup_processor_pending_interactions"),
            interactions_finalised: counter!("rollup_processor_interactions_finalised"),
            conversion_input: histogram!("rollup_processor_conversion_input"),
        }
    }
}

impl ProcessorMetrics {
    /// Record an accepted conversion
    #[inline]
    pub fn record_conversion(&self, input: f64) {
        self.conversions.increment(1);
        self.conversion_input.record(input);
    }

    /// Record a rejected conversion
    #[inline]
    pub fn record_rejection(&self) {
        self.conversions_rejected.increment(1);
    }

    /// Record a finalised interaction
    #[inline]
    pub fn record_finalised(&self) {
        self.interactions_finalised.increment(1);
    }

    #[inline]
    pub fn set_pending(&self, pending: usize) {
        self.pending_interactions.set(pending as f64);
    }
}

/// Per-bridge metrics, labelled with the bridge name.
#[derive(Clone)]
pub struct BridgeMetrics {
    pub converts: Counter,
    pub finalisations: Counter,
    pub pools_registered: Counter,
    pub venue_errors: Counter,
}

impl BridgeMetrics {
    pub fn new(bridge: &'static str) -> Self {
        Self {
            converts: counter!("defi_bridge_converts", "bridge" => bridge),
            finalisations: counter!("defi_bridge_finalisations", "bridge" => bridge),
            pools_registered: counter!("defi_bridge_pools_registered", "bridge" => bridge),
            venue_errors: counter!("defi_bridge_venue_errors", "bridge" => bridge),
        }
    }

    #[inline]
    pub fn record_convert(&self) {
        self.converts.increment(1);
    }

    #[inline]
    pub fn record_finalisation(&self) {
        self.finalisations.increment(1);
    }

    #[inline]
    pub fn record_pool_registered(&self) {
        self.pools_registered.increment(1);
    }

    #[inline]
    pub fn record_venue_error(&self) {
        self.venue_errors.increment(1);
    }
}
