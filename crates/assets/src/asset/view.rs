//! Declarative view fragments.
//!
//! A fragment is a tree of UI elements stored as JSON:
//!
//! ```json
//! {
//!   "element": "VBox",
//!   "id": "splash",
//!   "properties": { "spacing": 8 },
//!   "children": [{ "element": "ProgressBar", "id": "progress" }]
//! }
//! ```
//!
//! Only the structure is validated here; what an element means is up to the
//! UI that mounts it.

use crate::asset::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewNode {
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    /// Depth-first search for the node carrying `id`.
    pub fn find(&self, id: &str) -> Option<&ViewNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ViewNode::node_count).sum::<usize>()
    }

    fn has_blank_element(&self) -> bool {
        self.element.trim().is_empty() || self.children.iter().any(ViewNode::has_blank_element)
    }
}

#[instrument(level = "trace", skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<ViewNode> {
    let root: ViewNode = serde_json::from_slice(bytes).or_raise(|| ErrorKind::View)?;
    if root.has_blank_element() {
        exn::bail!(ErrorKind::View);
    }
    Ok(root)
}
