use crate::Positions;
use meshflow_core::config::AnimationConfig;
use meshflow_core::model::{NodeId, Position};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Eased positions at `elapsed` into a run of `duration`.
///
/// Exact at both ends: `elapsed == 0` returns `start`, `elapsed >= duration`
/// returns `target`. Nodes missing from `start` do not move.
pub fn interpolate(start: &Positions, target: &Positions, elapsed: Duration, duration: Duration) -> Positions {
    let progress = if duration.is_zero() {
        1.0
    } else {
        elapsed.as_secs_f64() / duration.as_secs_f64()
    };
    let k = ease_out_cubic(progress);

    target
        .iter()
        .map(|(id, to)| {
            let from = start.get(id).copied().unwrap_or(*to);
            let at = Position::new(from.x * (1.0 - k) + to.x * k, from.y * (1.0 - k) + to.y * k);
            (*id, at)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub positions: Positions,
    /// Linear time progress in `[0, 1]`.
    pub progress: f64,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationOutcome {
    pub frames: usize,
    pub completed: bool,
    /// Positions of the last emitted frame, if any.
    pub positions: Option<Positions>,
}

pub struct AnimationHandle {
    token: CancellationToken,
    task: JoinHandle<AnimationOutcome>,
}

impl AnimationHandle {
    /// Stops after the frame in flight, if any.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn finished(self) -> AnimationOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Animation task failed: {}", e);
                AnimationOutcome {
                    frames: 0,
                    completed: false,
                    positions: None,
                }
            }
        }
    }
}

struct Running {
    generation: u64,
    token: CancellationToken,
}

/// Runs eased transitions on a fixed frame interval.
///
/// At most one animation per node set is live: starting another for the same
/// set cancels the previous one.
#[derive(Clone)]
pub struct Animator {
    config: AnimationConfig,
    running: Arc<Mutex<HashMap<Vec<NodeId>, Running>>>,
    generations: Arc<AtomicU64>,
}

impl Animator {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            running: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.config.duration_ms)
    }

    /// Animations currently registered.
    pub fn active(&self) -> usize {
        self.running.lock().unwrap().len()
    }

    /// Spawns the frame loop on the current Tokio runtime; `on_frame` receives
    /// every frame, starting with the `start` positions.
    pub fn animate<F>(&self, start: Positions, target: Positions, mut on_frame: F) -> AnimationHandle
    where
        F: FnMut(&AnimationFrame) + Send + 'static,
    {
        let key: Vec<NodeId> = target.keys().copied().collect();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        {
            let mut running = self.running.lock().unwrap();
            let previous = running.insert(
                key.clone(),
                Running {
                    generation,
                    token: token.clone(),
                },
            );
            if let Some(previous) = previous {
                debug!("Superseding animation for {} nodes", key.len());
                previous.token.cancel();
            }
        }

        let duration = self.duration();
        let frame_interval = Duration::from_millis(self.config.frame_interval_ms.max(1));
        let running = self.running.clone();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let started = Instant::now();
            let mut frames = 0;
            let mut last_positions = None;

            let completed = loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        debug!("Animation cancelled after {} frames", frames);
                        break false;
                    }
                    _ = ticker.tick() => {
                        let elapsed = started.elapsed().min(duration);
                        let positions = interpolate(&start, &target, elapsed, duration);
                        let last = elapsed >= duration;
                        let frame = AnimationFrame {
                            positions,
                            progress: if duration.is_zero() {
                                1.0
                            } else {
                                elapsed.as_secs_f64() / duration.as_secs_f64()
                            },
                            last,
                        };
                        on_frame(&frame);
                        frames += 1;
                        last_positions = Some(frame.positions);
                        if last {
                            break true;
                        }
                    }
                }
            };

            let mut running = running.lock().unwrap();
            if running.get(&key).map(|r| r.generation) == Some(generation) {
                running.remove(&key);
            }

            AnimationOutcome {
                frames,
                completed,
                positions: last_positions,
            }
        });

        AnimationHandle { token, task }
    }

    /// Like [`Animator::animate`], delivering frames over a channel instead.
    pub fn animate_frames(
        &self,
        start: Positions,
        target: Positions,
    ) -> (AnimationHandle, mpsc::UnboundedReceiver<AnimationFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = self.animate(start, target, move |frame| {
            // Receiver gone means nobody is watching; the run still finishes.
            let _ = sender.send(frame.clone());
        });
        (handle, receiver)
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(points: &[(NodeId, f64, f64)]) -> Positions {
        points
            .iter()
            .map(|(id, x, y)| (*id, Position::new(*x, *y)))
            .collect()
    }

    #[test]
    fn test_ease_out_cubic_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_interpolation_is_exact_at_both_ends() {
        let start = positions(&[(1, 0.0, 0.0), (2, 10.0, 10.0), (3, 20.0, 20.0)]);
        let target = positions(&[(1, 100.0, 100.0), (2, 110.0, 90.0), (3, 90.0, 110.0)]);
        let duration = Duration::from_millis(1000);

        assert_eq!(interpolate(&start, &target, Duration::ZERO, duration), start);
        assert_eq!(interpolate(&start, &target, duration, duration), target);
        assert_eq!(
            interpolate(&start, &target, Duration::from_millis(5000), duration),
            target
        );
    }

    #[test]
    fn test_interpolation_midpoint_is_eased() {
        let start = positions(&[(1, 0.0, 0.0)]);
        let target = positions(&[(1, 100.0, 0.0)]);

        let mid = interpolate(&start, &target, Duration::from_millis(500), Duration::from_millis(1000));
        assert!((mid[&1].x - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_new_nodes_appear_at_target() {
        let start = Positions::new();
        let target = positions(&[(4, 5.0, 6.0)]);
        let frame = interpolate(&start, &target, Duration::ZERO, Duration::from_millis(100));
        assert_eq!(frame, target);
    }
}
