use meshflow_core::model::{Node, NodeContent, RichNode};

const HARD_BREAK_KINDS: [&str; 2] = ["hardBreak", "hard_break"];

/// Interprets raw stored content: a serialized rich document or plain text.
pub fn detect_content(raw: &str) -> NodeContent {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(doc) = serde_json::from_str::<RichNode>(trimmed) {
            if !doc.kind.is_empty() {
                return NodeContent::Rich(doc);
            }
        }
    }
    NodeContent::Text(raw.to_string())
}

pub fn extract_text(content: &NodeContent) -> String {
    match content {
        NodeContent::Text(text) => text.trim().to_string(),
        NodeContent::Rich(doc) => extract_rich_text(doc),
    }
}

/// Concatenates leaf text in document order. Marks are ignored; block
/// boundaries become newlines.
pub fn extract_rich_text(doc: &RichNode) -> String {
    let mut out = String::new();
    walk(doc, &mut out);
    out.trim().to_string()
}

fn walk(node: &RichNode, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(text);
        return;
    }
    if HARD_BREAK_KINDS.contains(&node.kind.as_str()) {
        out.push('\n');
        return;
    }

    for child in &node.content {
        walk(child, out);
        let is_block = child.text.is_none() && !HARD_BREAK_KINDS.contains(&child.kind.as_str());
        if is_block && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

/// Text fed to the embedding provider: title, body, then tags.
pub fn embedding_input(node: &Node) -> String {
    let mut parts = Vec::with_capacity(3);
    let title = node.title.trim();
    if !title.is_empty() {
        parts.push(title.to_string());
    }
    let body = extract_text(&node.content);
    if !body.is_empty() {
        parts.push(body);
    }
    if !node.tags.is_empty() {
        parts.push(node.tags.join(" "));
    }
    parts.join("\n")
}
