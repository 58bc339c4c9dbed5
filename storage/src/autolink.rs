//! Threshold-based link planning.
//!
//! The engine never writes anything: it turns a node, its workspace candidates and
//! the current edge set into [`EdgeDirective`]s plus non-committing suggestions.

use crate::index::similarity::rank;
use crate::index::AdjacencyGraph;
use meshflow_core::config::LinkingConfig;
use meshflow_core::model::{EdgeDirective, EdgeKey, Node, SimilarityResult};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoLinkPlan {
    pub directives: Vec<EdgeDirective>,
    /// Scores in `[suggest_threshold, auto_link_threshold)` for unconnected pairs.
    pub suggestions: Vec<SimilarityResult>,
    /// Matches above the auto-link threshold that were already connected.
    pub skipped_existing: usize,
}

impl AutoLinkPlan {
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty() && self.suggestions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AutoLinkEngine {
    config: LinkingConfig,
}

impl AutoLinkEngine {
    pub fn new(config: LinkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinkingConfig {
        &self.config
    }

    /// Plans edges for `node` against `candidates` of the same workspace.
    ///
    /// Already-connected matches above the threshold occupy fan-out slots, so a
    /// node never accumulates more than `max_auto_links` auto-link partners and a
    /// re-run over an unchanged snapshot plans nothing new.
    pub fn plan(&self, node: &Node, candidates: &[Node], existing: &AdjacencyGraph) -> AutoLinkPlan {
        let Some(query) = node.embedding() else {
            return AutoLinkPlan::default();
        };

        let peers = candidates
            .iter()
            .filter(|candidate| candidate.id != node.id && candidate.workspace_id == node.workspace_id)
            .filter_map(|candidate| candidate.embedding().map(|embedding| (candidate.id, embedding)));

        let matches = rank(peers, query, self.config.suggest_threshold, usize::MAX);

        let mut plan = AutoLinkPlan::default();
        let mut planned: HashSet<EdgeKey> = HashSet::new();
        let mut linked = 0usize;

        for matched in matches {
            let connected = existing.contains(node.id, matched.node_id);

            if matched.score >= self.config.auto_link_threshold {
                if connected {
                    plan.skipped_existing += 1;
                    linked += 1;
                    continue;
                }
                if linked >= self.config.max_auto_links {
                    continue;
                }
                if planned.insert(EdgeKey::new(node.id, matched.node_id)) {
                    plan.directives.push(EdgeDirective {
                        workspace_id: node.workspace_id,
                        source: node.id,
                        target: matched.node_id,
                        similarity: matched.score,
                    });
                    linked += 1;
                }
            } else if !connected && plan.suggestions.len() < self.config.max_suggestions {
                plan.suggestions.push(matched);
            }
        }

        plan
    }
}

impl Default for AutoLinkEngine {
    fn default() -> Self {
        Self::new(LinkingConfig::default())
    }
}
