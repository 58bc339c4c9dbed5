use std::env;
use std::sync::Arc;
use std::time::Instant;

use ingestion::embedding::DeterministicEmbedder;
use ingestion::processor::{LinkMode, NodePipeline};
use jobs::AutoLinker;
use meshflow_core::model::Node;
use prototypes::synthetic_workspace;
use storage::autolink::AutoLinkEngine;
use storage::lock::NodeLocks;
use storage::repo::{GraphStore, Repository};

const WORKSPACE: u64 = 1;
const DIMS: usize = 64;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn percentile_ns(samples: &[u128], p: f64) -> u128 {
    if samples.is_empty() {
        return 0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let rank = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[rank]
}

fn fmt_ns(ns: u128) -> String {
    if ns >= 1_000_000 {
        format!("{:.3} ms", ns as f64 / 1_000_000.0)
    } else if ns >= 1_000 {
        format!("{:.3} us", ns as f64 / 1_000.0)
    } else {
        format!("{ns} ns")
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let node_count = env_u64("MESHFLOW_BENCH_NODES", 2_000);
    let topics = env_u64("MESHFLOW_BENCH_TOPICS", 16);
    let workers = env_usize("MESHFLOW_BENCH_WORKERS", 8);
    let ops_per_worker = env_usize("MESHFLOW_BENCH_OPS_PER_WORKER", 50);

    let repo = Arc::new(Repository::new());
    let seed = synthetic_workspace(WORKSPACE, node_count, topics, DIMS);
    for node in seed.nodes {
        repo.put_node(node).await.unwrap();
    }
    for edge in seed.edges {
        repo.put_edge(edge).await.unwrap();
    }

    let locks = NodeLocks::new();
    let linker = AutoLinker::new(repo.clone(), AutoLinkEngine::default()).with_locks(locks.clone());
    let mut pipeline = NodePipeline::with_components(
        repo.clone(),
        Arc::new(DeterministicEmbedder::new(DIMS)),
        LinkMode::Inline(linker.clone()),
    );
    pipeline.set_locks(locks);
    let pipeline = Arc::new(pipeline);

    let scenario_start = Instant::now();
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(ops_per_worker);
            for op in 0..ops_per_worker {
                // Workers revisit a small id range so updates contend on nodes.
                let id = node_count + 1 + ((worker_id * ops_per_worker + op) % 64) as u64;
                let node = Node::new(
                    id,
                    WORKSPACE,
                    format!("Runtime note {id}"),
                    format!("worker={worker_id} op={op}"),
                );

                let begin = Instant::now();
                pipeline.upsert_node(node).await.unwrap();
                latencies.push(begin.elapsed().as_nanos());
            }
            latencies
        }));
    }

    let mut samples = Vec::new();
    for handle in handles {
        samples.extend(handle.await.unwrap());
    }

    let total_elapsed = scenario_start.elapsed();
    let throughput = if total_elapsed.as_secs_f64() > 0.0 {
        samples.len() as f64 / total_elapsed.as_secs_f64()
    } else {
        0.0
    };
    let metrics = linker.metrics().snapshot();

    println!("=== Operational Latency Benchmark (upsert + inline auto-link) ===");
    println!(
        "config: nodes={}, topics={}, workers={}, ops_per_worker={}",
        node_count, topics, workers, ops_per_worker
    );
    println!(
        "workload: upserts={}, elapsed={:.3}s, throughput={:.2} ops/s",
        samples.len(),
        total_elapsed.as_secs_f64(),
        throughput
    );
    println!(
        "upsert latency: p50={}, p95={}, p99={}",
        fmt_ns(percentile_ns(&samples, 0.50)),
        fmt_ns(percentile_ns(&samples, 0.95)),
        fmt_ns(percentile_ns(&samples, 0.99))
    );
    println!(
        "auto-link: runs={}, created={}, failed={}, p50={}us, p99={}us",
        metrics.auto_link_runs, metrics.edges_created, metrics.edges_failed, metrics.p50, metrics.p99
    );
}
