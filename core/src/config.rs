pub use config::ConfigError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    #[default]
    Deterministic,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Deterministic,
            url: "http://localhost:11434/v1/embeddings".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dimensions: 768,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkingConfig {
    /// Matches at or above this score become edges.
    pub auto_link_threshold: f32,
    /// Matches in `[suggest_threshold, auto_link_threshold)` are only surfaced.
    pub suggest_threshold: f32,
    /// Fan-out cap: edges created per auto-link pass.
    pub max_auto_links: usize,
    pub max_suggestions: usize,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            auto_link_threshold: 0.82,
            suggest_threshold: 0.68,
            max_auto_links: 5,
            max_suggestions: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClusteringConfig {
    pub passes: usize,
    /// Fixed RNG seed for centroid sampling. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            passes: 10,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl CanvasConfig {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ForceConfig {
    pub link_distance: f64,
    pub link_strength: f64,
    pub charge_strength: f64,
    pub center_strength: f64,
    pub collision_radius: f64,
    pub ticks: usize,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
    /// Spread of the random start position for nodes without one.
    pub initial_jitter: f64,
    pub seed: Option<u64>,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            link_distance: 150.0,
            link_strength: 0.5,
            charge_strength: -300.0,
            center_strength: 0.05,
            collision_radius: 55.0,
            ticks: 300,
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
            initial_jitter: 100.0,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RadialConfig {
    pub radius: f64,
}

impl Default for RadialConfig {
    fn default() -> Self {
        Self { radius: 300.0 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HierarchicalConfig {
    pub level_offset: f64,
    pub sibling_spacing: f64,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            level_offset: 150.0,
            sibling_spacing: 200.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SemanticLayoutConfig {
    /// Minimum cosine similarity to a group leader to join its group.
    pub group_threshold: f32,
    pub cell_size: f64,
    pub ring_radius: f64,
}

impl Default for SemanticLayoutConfig {
    fn default() -> Self {
        Self {
            group_threshold: 0.75,
            cell_size: 400.0,
            ring_radius: 80.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LayoutConfig {
    pub canvas: CanvasConfig,
    pub force: ForceConfig,
    pub radial: RadialConfig,
    pub hierarchical: HierarchicalConfig,
    pub semantic: SemanticLayoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration_ms: u64,
    pub frame_interval_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000,
            frame_interval_ms: 16,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub linking: LinkingConfig,
    pub clustering: ClusteringConfig,
    pub layout: LayoutConfig,
    pub animation: AnimationConfig,
}

impl AppConfig {
    /// Loads `config/default`, then `config/{RUN_MODE}`, then `MESHFLOW__*` env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join(&run_mode).to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("MESHFLOW")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let linking = &self.linking;
        for (name, value) in [
            ("linking.auto_link_threshold", linking.auto_link_threshold),
            ("linking.suggest_threshold", linking.suggest_threshold),
            (
                "layout.semantic.group_threshold",
                self.layout.semantic.group_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Message(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if linking.suggest_threshold > linking.auto_link_threshold {
            return Err(ConfigError::Message(format!(
                "linking.suggest_threshold ({}) must not exceed linking.auto_link_threshold ({})",
                linking.suggest_threshold, linking.auto_link_threshold
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Message(
                "embedding.dimensions must be positive".to_string(),
            ));
        }
        if self.clustering.passes == 0 || self.layout.force.ticks == 0 {
            return Err(ConfigError::Message(
                "clustering.passes and layout.force.ticks must be positive".to_string(),
            ));
        }
        if self.animation.frame_interval_ms == 0 {
            return Err(ConfigError::Message(
                "animation.frame_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
