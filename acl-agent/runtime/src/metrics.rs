use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

#[derive(Clone, Debug)]
pub struct DataplaneMetrics {
    updates: Family<UpdateLabels, Counter>,
    applies: Counter,
    apply_failures: Counter,
    unknown_endpoints: Counter,
    pending_endpoints: Gauge,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct UpdateLabels {
    kind: String,
}

// === impl DataplaneMetrics ===

impl DataplaneMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let updates = Family::default();
        prom.register(
            "updates",
            "Count of datastore updates by kind",
            updates.clone(),
        );

        let applies = Counter::default();
        prom.register(
            "applies",
            "Count of passes that applied all pending endpoints",
            applies.clone(),
        );

        let apply_failures = Counter::default();
        prom.register(
            "apply_failures",
            "Count of passes stopped by a backend failure",
            apply_failures.clone(),
        );

        let unknown_endpoints = Counter::default();
        prom.register(
            "unknown_endpoints",
            "Count of endpoints deferred because the backend did not know them",
            unknown_endpoints.clone(),
        );

        let pending_endpoints = Gauge::default();
        prom.register(
            "pending_endpoints",
            "Gauge of endpoints waiting to be applied",
            pending_endpoints.clone(),
        );

        Self {
            updates,
            applies,
            apply_failures,
            unknown_endpoints,
            pending_endpoints,
        }
    }

    pub(crate) fn update(&self, kind: &str) {
        self.updates
            .get_or_create(&UpdateLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    pub(crate) fn applied(&self) {
        self.applies.inc();
    }

    pub(crate) fn apply_failed(&self) {
        self.apply_failures.inc();
    }

    pub(crate) fn unknown_endpoints(&self, n: usize) {
        self.unknown_endpoints.inc_by(n as u64);
    }

    pub(crate) fn set_pending(&self, n: usize) {
        self.pending_endpoints.set(n as i64);
    }
}
