//! Serializable tree summaries of a content tree.

use serde::{Deserialize, Serialize};

use super::node::{Node, TRANSLUCENT_BINDER_ID};

/// `{id, title, shortId, contents}` summary of a node.
///
/// `contents` is present exactly for binders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "shortId")]
    pub short_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<TreeNode>>,
}

/// Summarize `node`. Child titles come from the parent's overrides when set.
pub fn model_to_tree(node: &Node) -> TreeNode {
    to_tree(node, None)
}

fn to_tree(node: &Node, title: Option<String>) -> TreeNode {
    let id = match node {
        Node::TranslucentBinder(_) => Some(TRANSLUCENT_BINDER_ID.to_string()),
        _ => node.ident_hash(),
    };
    let contents = node.children().map(|children| {
        children
            .with_titles()
            .map(|(child, title)| to_tree(child, title.map(str::to_string)))
            .collect()
    });
    TreeNode {
        id,
        title: title.or_else(|| node.title().map(str::to_string)),
        short_id: node.metadata().short_id.clone(),
        contents,
    }
}

/// Ids of a tree in pre-order, skipping translucent binders.
pub fn flatten_tree_to_ident_hashes(tree: &TreeNode) -> Vec<String> {
    let mut ids = Vec::new();
    let mut stack = vec![tree];
    while let Some(item) = stack.pop() {
        match (&item.id, &item.contents) {
            (Some(id), Some(_)) if id == TRANSLUCENT_BINDER_ID => {}
            (Some(id), _) => ids.push(id.clone()),
            (None, _) => {}
        }
        if let Some(contents) = &item.contents {
            stack.extend(contents.iter().rev());
        }
    }
    ids
}
