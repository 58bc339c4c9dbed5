use crate::bounds::separate_coincident;
use crate::Positions;
use meshflow_core::config::{CanvasConfig, ForceConfig};
use meshflow_core::model::{Edge, Node, NodeId, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use storage::index::AdjacencyGraph;

const DISTANCE_MIN_SQ: f64 = 1.0;
const JIGGLE: f64 = 1e-6;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const RELAXATION_PASSES: usize = 500;

#[derive(Debug, Clone, Copy, Default)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

/// Velocity-decay simulation with link, many-body, center and collision forces.
///
/// Every tick cools `alpha` towards zero; the number of ticks is fixed by the
/// caller, so the run always terminates.
pub struct Simulation {
    ids: Vec<NodeId>,
    bodies: Vec<Body>,
    links: Vec<(usize, usize)>,
    degree: Vec<usize>,
    alpha: f64,
    center: (f64, f64),
    config: ForceConfig,
}

impl Simulation {
    pub fn new(nodes: &[Node], edges: &[Edge], config: &ForceConfig, canvas: &CanvasConfig) -> Self {
        let center = canvas.center();
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let jitter = config.initial_jitter.abs();

        let mut points = Vec::with_capacity(nodes.len());
        for node in nodes {
            let start = match node.position.filter(Position::is_finite) {
                Some(position) => position,
                None => Position::new(
                    center.0 + rng.gen_range(-jitter..=jitter),
                    center.1 + rng.gen_range(-jitter..=jitter),
                ),
            };
            points.push((node.id, start));
        }
        separate_coincident(&mut points, 1.0);

        let index: HashMap<NodeId, usize> = points
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (*id, i))
            .collect();

        let graph = AdjacencyGraph::from_edges(edges.iter().filter(|edge| {
            edge.source != edge.target
                && index.contains_key(&edge.source)
                && index.contains_key(&edge.target)
        }));
        let links: Vec<(usize, usize)> = graph
            .edges()
            .into_iter()
            .map(|(source, target)| (index[&source], index[&target]))
            .collect();

        let mut degree = vec![0; points.len()];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }

        Self {
            ids: points.iter().map(|(id, _)| *id).collect(),
            bodies: points
                .iter()
                .map(|(_, p)| Body {
                    x: p.x,
                    y: p.y,
                    ..Default::default()
                })
                .collect(),
            links,
            degree,
            alpha: 1.0,
            center,
            config: config.clone(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn tick(&mut self) {
        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.apply_collision();

        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            body.vx *= keep;
            body.vy *= keep;
            body.x += body.vx;
            body.y += body.vy;
        }
    }

    fn apply_links(&mut self) {
        let distance = self.config.link_distance;
        let strength = self.config.link_strength * self.alpha;

        for &(s, t) in &self.links {
            let (source, target) = (self.bodies[s], self.bodies[t]);
            let mut dx = target.x + target.vx - source.x - source.vx;
            let mut dy = target.y + target.vy - source.y - source.vy;
            if dx == 0.0 {
                dx = JIGGLE;
            }
            if dy == 0.0 {
                dy = JIGGLE;
            }
            let length = (dx * dx + dy * dy).sqrt();
            let pull = (length - distance) / length * strength;
            dx *= pull;
            dy *= pull;

            // The better-connected endpoint moves less.
            let bias = self.degree[s] as f64 / (self.degree[s] + self.degree[t]) as f64;
            self.bodies[t].vx -= dx * bias;
            self.bodies[t].vy -= dy * bias;
            self.bodies[s].vx += dx * (1.0 - bias);
            self.bodies[s].vy += dy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self) {
        let strength = self.config.charge_strength * self.alpha;
        let n = self.bodies.len();
        let mut deltas = vec![(0.0, 0.0); n];

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                if dx == 0.0 && dy == 0.0 {
                    let angle = (i * n + j) as f64 * GOLDEN_ANGLE;
                    dx = JIGGLE * angle.cos();
                    dy = JIGGLE * angle.sin();
                }
                let mut l = dx * dx + dy * dy;
                if l < DISTANCE_MIN_SQ {
                    l = (DISTANCE_MIN_SQ * l).sqrt();
                }
                let w = strength / l;
                deltas[i].0 += dx * w;
                deltas[i].1 += dy * w;
            }
        }

        for (body, (dvx, dvy)) in self.bodies.iter_mut().zip(deltas) {
            body.vx += dvx;
            body.vy += dvy;
        }
    }

    fn apply_center(&mut self) {
        if self.bodies.is_empty() {
            return;
        }
        let n = self.bodies.len() as f64;
        let (sum_x, sum_y) = self
            .bodies
            .iter()
            .fold((0.0, 0.0), |(x, y), body| (x + body.x, y + body.y));
        let shift_x = (sum_x / n - self.center.0) * self.config.center_strength;
        let shift_y = (sum_y / n - self.center.1) * self.config.center_strength;
        for body in &mut self.bodies {
            body.x -= shift_x;
            body.y -= shift_y;
        }
    }

    fn apply_collision(&mut self) {
        let min = self.config.collision_radius;
        if min <= 0.0 {
            return;
        }
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.bodies[i], self.bodies[j]);
                let mut dx = (a.x + a.vx) - (b.x + b.vx);
                let mut dy = (a.y + a.vy) - (b.y + b.vy);
                let l2 = dx * dx + dy * dy;
                if l2 >= min * min {
                    continue;
                }
                if l2 == 0.0 {
                    dx = JIGGLE;
                    dy = JIGGLE;
                }
                let l = (dx * dx + dy * dy).sqrt();
                let k = (min - l) / l * 0.5;
                self.bodies[i].vx += dx * k;
                self.bodies[i].vy += dy * k;
                self.bodies[j].vx -= dx * k;
                self.bodies[j].vy -= dy * k;
            }
        }
    }

    /// Positional sweep that pushes overlapping pairs apart until none remain.
    pub fn relax_collisions(&mut self) {
        let min = self.config.collision_radius;
        if min <= 0.0 {
            return;
        }
        let target = min * (1.0 + 1e-6);
        let n = self.bodies.len();

        for _ in 0..RELAXATION_PASSES {
            let mut moved = false;
            for i in 0..n {
                for j in (i + 1)..n {
                    let (a, b) = (self.bodies[i], self.bodies[j]);
                    let dx = b.x - a.x;
                    let dy = b.y - a.y;
                    let d = (dx * dx + dy * dy).sqrt();
                    if d >= min {
                        continue;
                    }
                    let (ux, uy) = if d > 1e-9 {
                        (dx / d, dy / d)
                    } else {
                        let angle = (i * n + j) as f64 * GOLDEN_ANGLE;
                        (angle.cos(), angle.sin())
                    };
                    let push = (target - d) / 2.0;
                    self.bodies[i].x -= ux * push;
                    self.bodies[i].y -= uy * push;
                    self.bodies[j].x += ux * push;
                    self.bodies[j].y += uy * push;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }

    pub fn positions(&self) -> Positions {
        self.ids
            .iter()
            .zip(&self.bodies)
            .map(|(id, body)| (*id, Position::new(body.x, body.y)))
            .collect()
    }
}

pub fn layout(nodes: &[Node], edges: &[Edge], config: &ForceConfig, canvas: &CanvasConfig) -> Positions {
    let mut simulation = Simulation::new(nodes, edges, config, canvas);
    simulation.run(config.ticks);
    simulation.relax_collisions();
    simulation.positions()
}
