use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type NodeId = u64;
pub type EdgeId = u64;
pub type WorkspaceId = u64;

/// Canvas coordinates. Layout only proposes these; `Node::position` is the record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One node of a structured rich document (ProseMirror-style tree).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RichNode {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RichNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<serde_json::Value>,
}

impl RichNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn block(kind: impl Into<String>, content: Vec<RichNode>) -> Self {
        Self {
            kind: kind.into(),
            content,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeContent {
    Text(String),
    Rich(RichNode),
}

impl Default for NodeContent {
    fn default() -> Self {
        NodeContent::Text(String::new())
    }
}

impl From<&str> for NodeContent {
    fn from(value: &str) -> Self {
        NodeContent::Text(value.to_string())
    }
}

impl From<String> for NodeContent {
    fn from(value: String) -> Self {
        NodeContent::Text(value)
    }
}

impl From<RichNode> for NodeContent {
    fn from(value: RichNode) -> Self {
        NodeContent::Rich(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub workspace_id: WorkspaceId,
    pub title: String,
    #[serde(default)]
    pub content: NodeContent,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn new(
        id: NodeId,
        workspace_id: WorkspaceId,
        title: impl Into<String>,
        content: impl Into<NodeContent>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            workspace_id,
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            position: None,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Embedding usable for similarity. Empty vectors count as absent.
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding
            .as_deref()
            .filter(|embedding| !embedding.is_empty())
    }

    pub fn is_embedded(&self) -> bool {
        self.embedding().is_some()
    }
}

/// Unordered node pair. `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(NodeId, NodeId);

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub workspace_id: WorkspaceId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub similarity: Option<f32>,
    #[serde(default)]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(id: EdgeId, workspace_id: WorkspaceId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            workspace_id,
            source,
            target,
            similarity: None,
            label: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub node_id: NodeId,
    pub score: f32,
}

/// Edge creation request emitted by auto-linking. The caller owns durability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeDirective {
    pub workspace_id: WorkspaceId,
    pub source: NodeId,
    pub target: NodeId,
    pub similarity: f32,
}

impl EdgeDirective {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_unordered() {
        assert_eq!(EdgeKey::new(3, 7), EdgeKey::new(7, 3));
        assert_ne!(EdgeKey::new(3, 7), EdgeKey::new(3, 8));
    }

    #[test]
    fn empty_embedding_counts_as_absent() {
        let node = Node::new(1, 1, "empty", "").with_embedding(Vec::new());
        assert!(!node.is_embedded());
        let node = node.with_embedding(vec![0.5, 0.5]);
        assert!(node.is_embedded());
    }

    #[test]
    fn node_content_deserializes_plain_and_rich() {
        let plain: NodeContent = serde_json::from_str(r#""just text""#).unwrap();
        assert_eq!(plain, NodeContent::Text("just text".to_string()));

        let rich: NodeContent = serde_json::from_str(
            r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"hi","marks":[{"type":"bold"}]}]}]}"#,
        )
        .unwrap();
        match rich {
            NodeContent::Rich(doc) => {
                assert_eq!(doc.kind, "doc");
                assert_eq!(doc.content[0].content[0].text.as_deref(), Some("hi"));
            }
            other => panic!("expected rich content, got {:?}", other),
        }
    }
}
