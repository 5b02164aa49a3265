//! Transform node hierarchy
//!
//! Nodes live in a slot-map arena owned by [`NodeGraph`]. A node exclusively
//! owns its children (destroying a node destroys its subtree) and keeps a
//! non-owning handle to its parent.
//!
//! Each node caches its derived (world-space) transform. Any local change
//! invalidates the node and every descendant; reads pull the value lazily by
//! recomputing only the dirty part of the ancestor chain. A clean node never
//! has a dirty ancestor, so a dirty node always has dirty descendants.

use std::cell::Cell;
use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{quat_from_angle_axis, Mat4, Quat, Radian, Transform, Vec3};
use crate::scene::{SceneError, SceneResult};

new_key_type! {
    /// Handle to a node in a [`NodeGraph`]
    pub struct NodeId;
}

/// Coordinate space a relative transform is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformSpace {
    /// The node's own axes
    Local,
    /// The parent's axes
    #[default]
    Parent,
    /// World axes
    World,
}

/// A single node: local transform, hierarchy links and derived cache
#[derive(Debug)]
pub struct TransformNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transform,
    inherit_scale: bool,
    /// `None` while stale
    derived: Cell<Option<Transform>>,
}

impl TransformNode {
    fn new(name: String, local: Transform) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            local,
            inherit_scale: true,
            derived: Cell::new(None),
        }
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent node, `None` for roots and detached nodes
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local position relative to the parent
    pub const fn position(&self) -> Vec3 {
        self.local.position
    }

    /// Local orientation relative to the parent
    pub const fn orientation(&self) -> Quat {
        self.local.orientation
    }

    /// Local scale
    pub const fn scale(&self) -> Vec3 {
        self.local.scale
    }

    /// Local transform
    pub const fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// Whether the parent's scale is applied to this node
    pub const fn inherit_scale(&self) -> bool {
        self.inherit_scale
    }

    /// Whether the derived transform needs recomputing
    pub fn is_dirty(&self) -> bool {
        self.derived.get().is_none()
    }

    fn compose(&self, parent: Option<&Transform>) -> Transform {
        match parent {
            None => self.local,
            Some(parent) => {
                let mut derived = parent.combine(&self.local);
                if !self.inherit_scale {
                    derived.scale = self.local.scale;
                }
                derived
            }
        }
    }
}

/// Arena of transform nodes
#[derive(Debug, Default)]
pub struct NodeGraph {
    nodes: SlotMap<NodeId, TransformNode>,
    names: HashMap<String, NodeId>,
}

impl NodeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> SceneResult<&TransformNode> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut TransformNode> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Look a node up by name
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Iterate over all nodes
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TransformNode)> {
        self.nodes.iter()
    }

    /// Create a detached node with an identity transform
    pub fn create_node(&mut self, name: impl Into<String>) -> SceneResult<NodeId> {
        self.insert(name.into(), Transform::identity())
    }

    /// Create a node as a child of `parent`
    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> SceneResult<NodeId> {
        self.create_child_with(parent, name, Vec3::zeros(), Quat::identity())
    }

    /// Create a child with an initial local position and orientation
    pub fn create_child_with(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        position: Vec3,
        orientation: Quat,
    ) -> SceneResult<NodeId> {
        self.node(parent)?;
        let local = Transform { position, orientation, ..Transform::identity() };
        let child = self.insert(name.into(), local)?;
        self.link(parent, child)?;
        Ok(child)
    }

    fn insert(&mut self, name: String, local: Transform) -> SceneResult<NodeId> {
        if self.names.contains_key(&name) {
            return Err(SceneError::DuplicateName(name));
        }
        let id = self.nodes.insert(TransformNode::new(name.clone(), local));
        self.names.insert(name, id);
        log::trace!("Created node {:?}", id);
        Ok(id)
    }

    /// Make `child` a child of `parent`, detaching it from any previous parent
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::HierarchyCycle { parent, child });
        }
        self.unlink(child);
        self.link(parent, child)
    }

    /// Detach `child` from `parent`; the child becomes a root
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(SceneError::NotAChild { parent, child });
        }
        self.unlink(child);
        self.invalidate(child);
        Ok(())
    }

    /// Detach a node from its parent, if any
    pub fn detach(&mut self, id: NodeId) -> SceneResult<()> {
        self.node(id)?;
        self.unlink(id);
        self.invalidate(id);
        Ok(())
    }

    /// Destroy a node and its whole subtree, returning every removed id
    pub fn destroy_node(&mut self, id: NodeId) -> SceneResult<Vec<NodeId>> {
        self.node(id)?;
        self.unlink(id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
                self.names.remove(&node.name);
                removed.push(current);
            }
        }
        log::debug!("Destroyed {} node(s) rooted at {:?}", removed.len(), id);
        Ok(removed)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.invalidate(child);
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.nodes.get(id).and_then(|node| node.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Mark a node and its descendants stale
    fn invalidate(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else { continue };
            // Subtree below a dirty node is already dirty, except for the
            // node we were asked about (it may have just been relinked).
            if node.derived.get().is_none() && current != id {
                continue;
            }
            node.derived.set(None);
            stack.extend(node.children.iter().copied());
        }
    }

    fn modify_local(&mut self, id: NodeId, f: impl FnOnce(&mut Transform)) -> SceneResult<()> {
        f(&mut self.node_mut(id)?.local);
        self.invalidate(id);
        Ok(())
    }

    /// Set the local position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        self.modify_local(id, |local| local.position = position)
    }

    /// Set the local orientation
    pub fn set_orientation(&mut self, id: NodeId, orientation: Quat) -> SceneResult<()> {
        self.modify_local(id, |local| local.orientation = orientation)
    }

    /// Set the local scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> SceneResult<()> {
        self.modify_local(id, |local| local.scale = scale)
    }

    /// Multiply the local scale component-wise
    pub fn scale_by(&mut self, id: NodeId, factor: Vec3) -> SceneResult<()> {
        self.modify_local(id, |local| local.scale = local.scale.component_mul(&factor))
    }

    /// Reset the local orientation to identity
    pub fn reset_orientation(&mut self, id: NodeId) -> SceneResult<()> {
        self.set_orientation(id, Quat::identity())
    }

    /// Choose whether the node inherits its parent's scale
    pub fn set_inherit_scale(&mut self, id: NodeId, inherit: bool) -> SceneResult<()> {
        self.node_mut(id)?.inherit_scale = inherit;
        self.invalidate(id);
        Ok(())
    }

    /// Move the node by `delta` expressed in `space`
    pub fn translate(&mut self, id: NodeId, delta: Vec3, space: TransformSpace) -> SceneResult<()> {
        let delta = match space {
            TransformSpace::Local => self.node(id)?.local.orientation * delta,
            TransformSpace::Parent => delta,
            TransformSpace::World => match self.node(id)?.parent {
                Some(parent) => {
                    let parent_derived = self.derived_transform(parent)?;
                    (parent_derived.orientation.inverse() * delta).component_div(&parent_derived.scale)
                }
                None => delta,
            },
        };
        self.modify_local(id, |local| local.position += delta)
    }

    /// Rotate the node by `angle` around `axis` expressed in `space`
    pub fn rotate(&mut self, id: NodeId, axis: &Vec3, angle: Radian, space: TransformSpace) -> SceneResult<()> {
        let q = quat_from_angle_axis(angle, axis);
        let orientation = self.node(id)?.local.orientation;
        let rotated = match space {
            TransformSpace::Local => orientation * q,
            TransformSpace::Parent => q * orientation,
            TransformSpace::World => {
                let derived = self.derived_orientation(id)?;
                orientation * derived.inverse() * q * derived
            }
        };
        self.set_orientation(id, rotated)
    }

    /// Rotate around the local Y axis
    pub fn yaw(&mut self, id: NodeId, angle: Radian) -> SceneResult<()> {
        self.rotate(id, &Vec3::y(), angle, TransformSpace::Local)
    }

    /// Rotate around the local X axis
    pub fn pitch(&mut self, id: NodeId, angle: Radian) -> SceneResult<()> {
        self.rotate(id, &Vec3::x(), angle, TransformSpace::Local)
    }

    /// Rotate around the local Z axis
    pub fn roll(&mut self, id: NodeId, angle: Radian) -> SceneResult<()> {
        self.rotate(id, &Vec3::z(), angle, TransformSpace::Local)
    }

    /// World-space transform, recomputing stale ancestors as needed
    pub fn derived_transform(&self, id: NodeId) -> SceneResult<Transform> {
        self.resolve(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// World-space position
    pub fn derived_position(&self, id: NodeId) -> SceneResult<Vec3> {
        Ok(self.derived_transform(id)?.position)
    }

    /// World-space orientation
    pub fn derived_orientation(&self, id: NodeId) -> SceneResult<Quat> {
        Ok(self.derived_transform(id)?.orientation)
    }

    /// World-space scale
    pub fn derived_scale(&self, id: NodeId) -> SceneResult<Vec3> {
        Ok(self.derived_transform(id)?.scale)
    }

    /// World matrix of the node
    pub fn full_transform(&self, id: NodeId) -> SceneResult<Mat4> {
        Ok(self.derived_transform(id)?.to_matrix())
    }

    fn resolve(&self, id: NodeId) -> Option<Transform> {
        let node = self.nodes.get(id)?;
        if let Some(derived) = node.derived.get() {
            return Some(derived);
        }

        // Walk up until the first clean ancestor (or the root)
        let mut chain = vec![id];
        let mut cursor = node.parent;
        let mut base = None;
        while let Some(parent_id) = cursor {
            let parent = self.nodes.get(parent_id)?;
            if let Some(derived) = parent.derived.get() {
                base = Some(derived);
                break;
            }
            chain.push(parent_id);
            cursor = parent.parent;
        }

        for &node_id in chain.iter().rev() {
            let node = self.nodes.get(node_id)?;
            let derived = node.compose(base.as_ref());
            node.derived.set(Some(derived));
            base = Some(derived);
        }
        base
    }

    /// Recompute every stale node, parents before children
    ///
    /// Returns the number of nodes recomputed.
    pub fn update(&mut self) -> usize {
        let mut updated = 0;
        let mut stack: Vec<(NodeId, Option<Transform>)> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| (id, None))
            .collect();

        while let Some((id, parent_derived)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            let derived = match node.derived.get() {
                Some(derived) => derived,
                None => {
                    let derived = node.compose(parent_derived.as_ref());
                    node.derived.set(Some(derived));
                    updated += 1;
                    derived
                }
            };
            stack.extend(node.children.iter().map(|&child| (child, Some(derived))));
        }

        if updated > 0 {
            log::trace!("Scene graph update recomputed {} node(s)", updated);
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn chain(graph: &mut NodeGraph) -> (NodeId, NodeId, NodeId) {
        let root = graph.create_node("root").unwrap();
        let mid = graph.create_child(root, "mid").unwrap();
        let leaf = graph.create_child(mid, "leaf").unwrap();
        graph.set_position(root, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        graph.set_orientation(root, quat_from_angle_axis(Radian(HALF_PI), &Vec3::y())).unwrap();
        graph.set_position(mid, Vec3::new(0.0, 0.0, -5.0)).unwrap();
        graph.set_scale(mid, Vec3::new(2.0, 2.0, 2.0)).unwrap();
        graph.set_position(leaf, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        (root, mid, leaf)
    }

    fn assert_composition_holds(graph: &NodeGraph) {
        for (id, node) in graph.iter() {
            let derived = graph.derived_transform(id).unwrap();
            let expected = match node.parent() {
                Some(parent) => graph.derived_transform(parent).unwrap().combine(node.local_transform()),
                None => *node.local_transform(),
            };
            assert_relative_eq!(derived.to_matrix(), expected.to_matrix(), epsilon = EPSILON);
        }
    }

    #[test]
    fn test_derived_is_parent_composed_with_local() {
        let mut graph = NodeGraph::new();
        let (_, _, leaf) = chain(&mut graph);

        assert_composition_holds(&graph);

        // Root yaws 90 degrees: local -Z maps to world -X
        let leaf_pos = graph.derived_position(leaf).unwrap();
        assert_relative_eq!(leaf_pos, Vec3::new(5.0, 0.0, -2.0), epsilon = EPSILON);
        assert_relative_eq!(graph.derived_scale(leaf).unwrap(), Vec3::new(2.0, 2.0, 2.0), epsilon = EPSILON);
    }

    #[test]
    fn test_parent_change_invalidates_descendants() {
        let mut graph = NodeGraph::new();
        let (root, mid, leaf) = chain(&mut graph);
        graph.update();
        assert!(!graph.node(leaf).unwrap().is_dirty());

        graph.set_position(root, Vec3::new(0.0, 3.0, 0.0)).unwrap();
        assert!(graph.node(root).unwrap().is_dirty());
        assert!(graph.node(mid).unwrap().is_dirty());
        assert!(graph.node(leaf).unwrap().is_dirty());

        // Lazy read of the leaf refreshes the whole chain
        let pos = graph.derived_position(leaf).unwrap();
        assert!(!graph.node(root).unwrap().is_dirty());
        assert!(!graph.node(mid).unwrap().is_dirty());
        assert_relative_eq!(pos, Vec3::new(-5.0, 3.0, -2.0), epsilon = EPSILON);
        assert_composition_holds(&graph);
    }

    #[test]
    fn test_sibling_change_leaves_other_branch_clean() {
        let mut graph = NodeGraph::new();
        let root = graph.create_node("root").unwrap();
        let a = graph.create_child(root, "a").unwrap();
        let b = graph.create_child(root, "b").unwrap();
        graph.update();

        graph.set_position(a, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(graph.node(a).unwrap().is_dirty());
        assert!(!graph.node(b).unwrap().is_dirty());
        assert!(!graph.node(root).unwrap().is_dirty());
        assert_eq!(graph.update(), 1);
    }

    #[test]
    fn test_detached_node_uses_local_transform() {
        let mut graph = NodeGraph::new();
        let (_, mid, leaf) = chain(&mut graph);
        graph.detach(leaf).unwrap();

        assert!(graph.node(leaf).unwrap().parent().is_none());
        assert!(graph.node(mid).unwrap().children().is_empty());
        assert_relative_eq!(graph.derived_position(leaf).unwrap(), Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut graph = NodeGraph::new();
        let (root, mid, leaf) = chain(&mut graph);
        let other = graph.create_child(root, "other").unwrap();

        let removed = graph.destroy_node(mid).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!graph.contains(mid));
        assert!(!graph.contains(leaf));
        assert!(graph.contains(other));
        assert_eq!(graph.node(root).unwrap().children(), &[other]);
        assert!(graph.find_by_name("leaf").is_none());
        assert!(matches!(graph.derived_position(leaf), Err(SceneError::NodeNotFound(_))));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = NodeGraph::new();
        let (root, mid, leaf) = chain(&mut graph);

        assert!(matches!(graph.add_child(leaf, root), Err(SceneError::HierarchyCycle { .. })));
        assert!(matches!(graph.add_child(mid, mid), Err(SceneError::HierarchyCycle { .. })));

        // Moving the leaf under the root works and refreshes its derived transform
        graph.update();
        graph.add_child(root, leaf).unwrap();
        assert_eq!(graph.node(leaf).unwrap().parent(), Some(root));
        assert!(graph.node(mid).unwrap().children().is_empty());
        assert_composition_holds(&graph);
    }

    #[test]
    fn test_remove_child_requires_parentage() {
        let mut graph = NodeGraph::new();
        let (root, mid, leaf) = chain(&mut graph);
        assert!(matches!(graph.remove_child(root, leaf), Err(SceneError::NotAChild { .. })));
        graph.remove_child(mid, leaf).unwrap();
        assert!(graph.node(leaf).unwrap().parent().is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut graph = NodeGraph::new();
        graph.create_node("camera_rig").unwrap();
        assert!(matches!(graph.create_node("camera_rig"), Err(SceneError::DuplicateName(_))));
    }

    #[test]
    fn test_translate_in_spaces() {
        let mut graph = NodeGraph::new();
        let (root, mid, _) = chain(&mut graph);

        // Local: mid has identity orientation, so local == parent space
        graph.translate(mid, Vec3::new(0.0, 1.0, 0.0), TransformSpace::Local).unwrap();
        assert_relative_eq!(graph.node(mid).unwrap().position(), Vec3::new(0.0, 1.0, -5.0), epsilon = EPSILON);

        // World: +X in world is +Z in the yawed root's space
        let before = graph.derived_position(mid).unwrap();
        graph.translate(mid, Vec3::new(1.0, 0.0, 0.0), TransformSpace::World).unwrap();
        let after = graph.derived_position(mid).unwrap();
        assert_relative_eq!(after - before, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);

        graph.translate(root, Vec3::new(0.0, 0.0, 2.0), TransformSpace::Parent).unwrap();
        assert_relative_eq!(graph.node(root).unwrap().position(), Vec3::new(10.0, 0.0, 2.0), epsilon = EPSILON);
    }

    #[test]
    fn test_yaw_and_world_rotate() {
        let mut graph = NodeGraph::new();
        let root = graph.create_node("root").unwrap();
        let child = graph.create_child(root, "child").unwrap();
        graph.yaw(root, Radian(HALF_PI)).unwrap();
        graph.rotate(child, &Vec3::y(), Radian(HALF_PI), TransformSpace::World).unwrap();

        let forward = graph.derived_orientation(child).unwrap() * -Vec3::z();
        assert_relative_eq!(forward, Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_no_inherit_scale() {
        let mut graph = NodeGraph::new();
        let (_, mid, leaf) = chain(&mut graph);
        graph.set_inherit_scale(leaf, false).unwrap();
        assert_relative_eq!(graph.derived_scale(leaf).unwrap(), Vec3::new(1.0, 1.0, 1.0), epsilon = EPSILON);
        assert_relative_eq!(graph.derived_scale(mid).unwrap(), Vec3::new(2.0, 2.0, 2.0), epsilon = EPSILON);
    }
}
