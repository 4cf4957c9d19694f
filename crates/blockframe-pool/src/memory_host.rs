//! Headless frame host
//!
//! Tracks frame elements, their placement and every operation performed on
//! them. Used by the replay CLI and by tests to observe exactly how many
//! content fetches and theme pushes the pool caused.

use crate::error::HostError;
use crate::host::{FrameHost, FrameSpec, NodeId};
use crate::types::{PlaceholderId, Src};
use blockframe_protocol::{ChannelId, OutboundMessage};
use serde::Serialize;
use std::collections::HashMap;

/// One recorded host operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    Create { node: NodeId, src: Src, url: String },
    Attach { node: NodeId, placeholder: PlaceholderId },
    Park { node: NodeId },
    Navigate { node: NodeId, url: String },
    Destroy { node: NodeId },
    Post { node: NodeId, message: OutboundMessage },
}

/// State of one headless frame element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNode {
    pub src: Src,
    pub url: String,
    pub channel: ChannelId,
    pub placeholder: Option<PlaceholderId>,
    pub visible: bool,
    /// Number of times content was fetched into this element
    pub loads: u32,
}

/// In-memory [`FrameHost`]
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<NodeId, MemoryNode>,
    ops: Vec<HostOp>,
    next_node: u64,
    fail_next_create: Option<String>,
    fail_next_attach: Option<String>,
}

impl MemoryHost {
    /// Create empty host
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_frame` call fail
    pub fn fail_next_create(&mut self, reason: impl Into<String>) {
        self.fail_next_create = Some(reason.into());
    }

    /// Make the next `attach` call fail
    pub fn fail_next_attach(&mut self, reason: impl Into<String>) {
        self.fail_next_attach = Some(reason.into());
    }

    /// Every operation in call order
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Live frame element
    #[inline]
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(&node)
    }

    /// Number of live frame elements
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }

    /// Frame currently shown in a placeholder
    #[must_use]
    pub fn node_at(&self, placeholder: PlaceholderId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.placeholder == Some(placeholder))
            .map(|(id, _)| *id)
    }

    /// Content fetches issued for `src` (creations plus re-navigations)
    #[must_use]
    pub fn fetch_count(&self, src: &Src) -> usize {
        let mut src_of: HashMap<NodeId, &Src> = HashMap::new();
        let mut count = 0;
        for op in &self.ops {
            match op {
                HostOp::Create { node, src: created, .. } => {
                    src_of.insert(*node, created);
                    if created == src {
                        count += 1;
                    }
                }
                HostOp::Navigate { node, .. } if src_of.get(node) == Some(&src) => count += 1,
                _ => {}
            }
        }
        count
    }

    /// Messages posted to one frame, oldest first
    #[must_use]
    pub fn posted_to(&self, node: NodeId) -> Vec<&OutboundMessage> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                HostOp::Post { node: n, message } if *n == node => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Theme messages posted to any frame
    #[must_use]
    pub fn theme_pushes(&self) -> Vec<(NodeId, &OutboundMessage)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                HostOp::Post { node, message } if matches!(message, OutboundMessage::Theme { .. }) => {
                    Some((*node, message))
                }
                _ => None,
            })
            .collect()
    }

    /// Drop the operation log, keeping live nodes
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    fn live_mut(&mut self, node: NodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes.get_mut(&node).ok_or(HostError::UnknownNode(node))
    }
}

impl FrameHost for MemoryHost {
    fn create_frame(&mut self, spec: &FrameSpec) -> Result<NodeId, HostError> {
        if let Some(reason) = self.fail_next_create.take() {
            return Err(HostError::CreateFailed(reason));
        }

        self.next_node += 1;
        let node = NodeId(self.next_node);
        self.nodes.insert(
            node,
            MemoryNode {
                src: spec.src.clone(),
                url: spec.url.clone(),
                channel: spec.channel,
                placeholder: None,
                visible: false,
                loads: 1,
            },
        );
        self.ops.push(HostOp::Create {
            node,
            src: spec.src.clone(),
            url: spec.url.clone(),
        });
        Ok(node)
    }

    fn attach(&mut self, node: NodeId, placeholder: PlaceholderId) -> Result<(), HostError> {
        if let Some(reason) = self.fail_next_attach.take() {
            return Err(HostError::AttachFailed {
                node,
                placeholder,
                reason,
            });
        }
        if !self.nodes.contains_key(&node) {
            return Err(HostError::UnknownNode(node));
        }

        // A placeholder shows at most one frame.
        for other in self.nodes.values_mut() {
            if other.placeholder == Some(placeholder) {
                other.placeholder = None;
                other.visible = false;
            }
        }

        let entry = self.live_mut(node)?;
        entry.placeholder = Some(placeholder);
        entry.visible = true;
        self.ops.push(HostOp::Attach { node, placeholder });
        Ok(())
    }

    fn park(&mut self, node: NodeId) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.placeholder = None;
            entry.visible = false;
            self.ops.push(HostOp::Park { node });
        }
    }

    fn navigate(&mut self, node: NodeId, url: &str) -> Result<(), HostError> {
        let entry = self.live_mut(node)?;
        entry.url = url.to_string();
        entry.loads += 1;
        self.ops.push(HostOp::Navigate {
            node,
            url: url.to_string(),
        });
        Ok(())
    }

    fn destroy(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_some() {
            self.ops.push(HostOp::Destroy { node });
        }
    }

    fn post(&mut self, node: NodeId, message: &OutboundMessage) -> Result<(), HostError> {
        self.live_mut(node)?;
        self.ops.push(HostOp::Post {
            node,
            message: message.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(src: &str, channel: u64) -> FrameSpec {
        FrameSpec {
            src: Src::new(src).unwrap(),
            url: format!("http://localhost/{src}"),
            channel: ChannelId::new(channel),
        }
    }

    #[test]
    fn attach_moves_node_between_placeholders() {
        let mut host = MemoryHost::new();
        let node = host.create_frame(&spec("a", 1)).unwrap();

        host.attach(node, PlaceholderId(1)).unwrap();
        assert_eq!(host.node_at(PlaceholderId(1)), Some(node));

        host.attach(node, PlaceholderId(2)).unwrap();
        assert_eq!(host.node_at(PlaceholderId(1)), None);
        assert_eq!(host.node_at(PlaceholderId(2)), Some(node));
        assert_eq!(host.node(node).unwrap().loads, 1);
    }

    #[test]
    fn park_hides_without_destroying() {
        let mut host = MemoryHost::new();
        let node = host.create_frame(&spec("a", 1)).unwrap();
        host.attach(node, PlaceholderId(1)).unwrap();

        host.park(node);
        let entry = host.node(node).unwrap();
        assert!(!entry.visible);
        assert_eq!(entry.placeholder, None);
        assert_eq!(host.live_count(), 1);
    }

    #[test]
    fn fetch_count_includes_navigations() {
        let mut host = MemoryHost::new();
        let a = Src::new("a").unwrap();
        let node = host.create_frame(&spec("a", 1)).unwrap();
        host.create_frame(&spec("b", 2)).unwrap();
        host.navigate(node, "http://localhost/a").unwrap();

        assert_eq!(host.fetch_count(&a), 2);
    }

    #[test]
    fn injected_failures_fire_once() {
        let mut host = MemoryHost::new();
        host.fail_next_create("quota");
        assert!(host.create_frame(&spec("a", 1)).is_err());
        assert!(host.create_frame(&spec("a", 2)).is_ok());
    }

    #[test]
    fn post_to_destroyed_node_fails() {
        let mut host = MemoryHost::new();
        let node = host.create_frame(&spec("a", 1)).unwrap();
        host.destroy(node);
        assert_eq!(
            host.post(node, &OutboundMessage::GrabActivate),
            Err(HostError::UnknownNode(node))
        );
    }
}
