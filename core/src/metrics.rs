use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct AutoLinkCounters {
    pub runs: u64,
    pub edges_created: u64,
    pub edges_failed: u64,
    pub suggestions: u64,
    pub latencies: VecDeque<u64>, // microseconds
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingCounters {
    pub requests: u64,
    pub fallbacks: u64,
}

/// Shared counters for the best-effort paths. Cloning shares the same state.
#[derive(Clone)]
pub struct LinkMetrics {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    auto_link: AutoLinkCounters,
    embedding: EmbeddingCounters,
    max_history: usize,
}

impl LinkMetrics {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                auto_link: AutoLinkCounters::default(),
                embedding: EmbeddingCounters::default(),
                max_history: max_history.max(1),
            })),
        }
    }

    pub fn record_auto_link(&self, latency_us: u64, created: usize, failed: usize, suggested: usize) {
        let mut state = self.state.lock().unwrap();
        state.auto_link.runs += 1;
        state.auto_link.edges_created += created as u64;
        state.auto_link.edges_failed += failed as u64;
        state.auto_link.suggestions += suggested as u64;
        state.auto_link.latencies.push_back(latency_us);
        if state.auto_link.latencies.len() > state.max_history {
            state.auto_link.latencies.pop_front();
        }
    }

    pub fn record_embedding(&self, fell_back: bool) {
        let mut state = self.state.lock().unwrap();
        state.embedding.requests += 1;
        if fell_back {
            state.embedding.fallbacks += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().unwrap();
        let a = &state.auto_link;
        let e = &state.embedding;

        let mut sorted_latencies: Vec<u64> = a.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        let fallback_rate = if e.requests > 0 {
            e.fallbacks as f32 / e.requests as f32
        } else {
            0.0
        };

        MetricsSnapshot {
            auto_link_runs: a.runs,
            edges_created: a.edges_created,
            edges_failed: a.edges_failed,
            suggestions: a.suggestions,
            p50: percentile(&sorted_latencies, 50.0),
            p95: percentile(&sorted_latencies, 95.0),
            p99: percentile(&sorted_latencies, 99.0),
            history_count: a.latencies.len(),
            embedding_requests: e.requests,
            embedding_fallback_rate: fallback_rate,
        }
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub auto_link_runs: u64,
    pub edges_created: u64,
    pub edges_failed: u64,
    pub suggestions: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
    pub embedding_requests: u64,
    pub embedding_fallback_rate: f32,
}
