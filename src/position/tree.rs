use std::fmt;

use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::bounds::{BoundingBox, ParaxialBoundingBox};
use crate::cache::{Local, ScratchPool};
use crate::error::{ensure_extent, ensure_finite, PositionError, Result};
use crate::math::{matrix, vector, Matrix4, Vector3};

use super::{
    Anchor, IdentityPosition, Placement, PositionHint, PositionId, PositionListener, TreeMode,
};

#[derive(Debug, Clone)]
struct PositionNode {
    placement: Placement,
    parent: Anchor,
    children: Vec<PositionId>,
    valid: bool,
    revision: u64,
    rotation_location: Matrix4,
    transformation: Matrix4,
}

impl PositionNode {
    fn new(placement: Placement, parent: Anchor) -> Self {
        Self {
            placement,
            parent,
            children: Vec::new(),
            valid: false,
            revision: 0,
            rotation_location: Matrix4::identity(),
            transformation: Matrix4::identity(),
        }
    }
}

/// Arena of position nodes linked parent to child.
///
/// Parent links are non-owning [`PositionId`]s; a node whose anchor is
/// [`Anchor::Identity`] sits directly in the world frame.
///
/// Matrices are derived lazily. Any change to a node marks it and every
/// descendant invalid; the next matrix read recomputes the invalid part of
/// the chain from the nearest valid ancestor downwards. A valid node never
/// has an invalid ancestor, so [`is_valid`](Self::is_valid) needs no walk to
/// the root.
///
/// Scratch values used during recomputation are borrowed from the tree's
/// [`ScratchPool`]. The pool mode also decides what listener the tree
/// accepts: a [`Shared`](crate::cache::Shared) tree only takes `Send`
/// listeners and can itself be moved to another thread.
pub struct PositionTree<M: TreeMode = Local> {
    nodes: SlotMap<PositionId, PositionNode>,
    pool: ScratchPool<M>,
    listener: Option<Box<M::Listener>>,
}

impl PositionTree<Local> {
    /// Creates an empty tree with its own single-threaded scratch pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(ScratchPool::new())
    }
}

impl Default for PositionTree<Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: TreeMode> PositionTree<M> {
    /// Creates an empty tree that borrows scratch values from `pool`.
    #[must_use]
    pub fn with_pool(pool: ScratchPool<M>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            pool,
            listener: None,
        }
    }

    /// The scratch pool recomputation draws from.
    #[must_use]
    pub fn pool(&self) -> &ScratchPool<M> {
        &self.pool
    }

    /// Installs the sink for change notifications, replacing any previous one.
    pub fn set_listener(&mut self, listener: Box<M::Listener>) {
        self.listener = Some(listener);
    }

    /// Removes the change listener.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    // --- Structure ---

    /// Inserts a node in the world frame.
    ///
    /// # Errors
    ///
    /// Returns an error if `placement` fails validation.
    pub fn insert(&mut self, placement: Placement) -> Result<PositionId> {
        self.insert_anchored(Anchor::Identity, placement)
    }

    /// Inserts a node below `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is unknown or `placement` fails
    /// validation.
    pub fn insert_child(&mut self, parent: PositionId, placement: Placement) -> Result<PositionId> {
        self.insert_anchored(Anchor::Node(parent), placement)
    }

    fn insert_anchored(&mut self, parent: Anchor, placement: Placement) -> Result<PositionId> {
        placement.validate()?;
        if let Anchor::Node(parent_id) = parent {
            self.node(parent_id)?;
        }
        let id = self.nodes.insert(PositionNode::new(placement, parent));
        if let Anchor::Node(parent_id) = parent {
            self.node_mut(parent_id)?.children.push(id);
        }
        debug!(?id, ?parent, "position node inserted");
        Ok(id)
    }

    /// Removes a node and returns its placement.
    ///
    /// Its children are re-attached to its own parent, keeping their
    /// relative placements, and invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn remove(&mut self, id: PositionId) -> Result<Placement> {
        let node = self
            .nodes
            .remove(id)
            .ok_or(PositionError::NodeNotFound(id))?;

        if let Anchor::Node(parent_id) = node.parent {
            let parent = self.node_mut(parent_id)?;
            parent.children.retain(|child| *child != id);
            parent.children.extend_from_slice(&node.children);
        }
        for child in &node.children {
            self.node_mut(*child)?.parent = node.parent;
            self.invalidate_from(*child);
        }
        debug!(?id, orphans = node.children.len(), "position node removed");
        Ok(node.placement)
    }

    /// Re-anchors `id`, keeping its relative placement.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is unknown or `parent` is `id` itself
    /// or one of its descendants.
    pub fn set_parent(&mut self, id: PositionId, parent: impl Into<Anchor>) -> Result<()> {
        let parent = parent.into();
        let old = self.node(id)?.parent;
        if old == parent {
            return Ok(());
        }

        if let Anchor::Node(parent_id) = parent {
            let mut cursor = Anchor::Node(parent_id);
            while let Anchor::Node(ancestor) = cursor {
                if ancestor == id {
                    return Err(PositionError::Cycle {
                        child: id,
                        parent: parent_id,
                    }
                    .into());
                }
                cursor = self.node(ancestor)?.parent;
            }
            self.node_mut(parent_id)?.children.push(id);
        }
        if let Anchor::Node(old_id) = old {
            self.node_mut(old_id)?.children.retain(|child| *child != id);
        }

        self.node_mut(id)?.parent = parent;
        self.invalidate_from(id);
        debug!(?id, ?parent, "position node re-anchored");
        Ok(())
    }

    /// What `id` is placed relative to.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn parent(&self, id: PositionId) -> Result<Anchor> {
        Ok(self.node(id)?.parent)
    }

    /// Nodes placed directly relative to `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn children(&self, id: PositionId) -> Result<&[PositionId]> {
        Ok(&self.node(id)?.children)
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn contains(&self, id: PositionId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all node ids.
    pub fn ids(&self) -> impl Iterator<Item = PositionId> + '_ {
        self.nodes.keys()
    }

    // --- Placement ---

    /// Location relative to the parent.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn location(&self, id: PositionId) -> Result<Vector3> {
        Ok(self.node(id)?.placement.location)
    }

    /// Size of the node.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn size(&self, id: PositionId) -> Result<Vector3> {
        Ok(self.node(id)?.placement.size)
    }

    /// Euler rotation of the node.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn rotation(&self, id: PositionId) -> Result<Vector3> {
        Ok(self.node(id)?.placement.rotation)
    }

    /// Location, size and rotation together.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn placement(&self, id: PositionId) -> Result<Placement> {
        Ok(self.node(id)?.placement)
    }

    /// Moves the node. Returns `false` if `location` equals the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or `location` is not finite.
    pub fn set_location(&mut self, id: PositionId, location: Vector3) -> Result<bool> {
        ensure_finite("location", &location)?;
        self.update(id, PositionHint::Location, location)
    }

    /// Resizes the node. Returns `false` if `size` equals the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or `size` has a negative or
    /// non-finite component.
    pub fn set_size(&mut self, id: PositionId, size: Vector3) -> Result<bool> {
        ensure_extent("size", &size)?;
        self.update(id, PositionHint::Size, size)
    }

    /// Rotates the node. Returns `false` if `rotation` equals the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or `rotation` is not finite.
    pub fn set_rotation(&mut self, id: PositionId, rotation: Vector3) -> Result<bool> {
        ensure_finite("rotation", &rotation)?;
        self.update(id, PositionHint::Rotation, rotation)
    }

    /// Copies rotation, size and location (in that order) from `source`.
    ///
    /// The parent link of `target` is left alone. When the two nodes hang
    /// off different parents, the location is rebuilt so that `target`'s
    /// lower corner lands on `source`'s lower corner in world space.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is unknown.
    pub fn set_position(&mut self, target: PositionId, source: PositionId) -> Result<()> {
        let source_node = self.node(source)?;
        let placement = source_node.placement;
        let source_parent = source_node.parent;
        let target_parent = self.node(target)?.parent;

        let location = if source_parent == target_parent {
            placement.location
        } else {
            let world = match source_parent {
                Anchor::Identity => placement.location,
                Anchor::Node(parent) => vector::transform_point(
                    &self.rotation_location_matrix(parent)?,
                    &placement.location,
                ),
            };
            match target_parent {
                Anchor::Identity => world,
                Anchor::Node(parent) => {
                    world_to_local(&self.rotation_location_matrix(parent)?, &world)
                }
            }
        };

        self.update(target, PositionHint::Rotation, placement.rotation)?;
        self.update(target, PositionHint::Size, placement.size)?;
        self.update(target, PositionHint::Location, location)?;
        Ok(())
    }

    fn update(&mut self, id: PositionId, hint: PositionHint, value: Vector3) -> Result<bool> {
        let placement = &mut self.node_mut(id)?.placement;
        let slot = match hint {
            PositionHint::Location => &mut placement.location,
            PositionHint::Rotation => &mut placement.rotation,
            PositionHint::Size => &mut placement.size,
        };
        if *slot == value {
            return Ok(false);
        }
        let delta = value - *slot;
        *slot = value;

        self.invalidate_from(id);
        if let Some(listener) = self.listener.as_deref_mut() {
            listener.position_changed(id, hint, &delta);
        }
        Ok(true)
    }

    // --- Validity ---

    /// Marks the node, and with it every descendant, as needing
    /// recomputation.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn invalidate(&mut self, id: PositionId) -> Result<()> {
        self.node(id)?;
        self.invalidate_from(id);
        Ok(())
    }

    /// Returns `true` if the cached matrices of `id` are current, which
    /// implies the whole parent chain is current as well.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn is_valid(&self, id: PositionId) -> Result<bool> {
        Ok(self.node(id)?.valid)
    }

    /// Counter bumped whenever the node's cached matrices go stale.
    ///
    /// Lets consumers that cache data derived from a node (display lists,
    /// picking boxes) detect changes without holding on to the matrices.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn revision(&self, id: PositionId) -> Result<u64> {
        Ok(self.node(id)?.revision)
    }

    fn invalidate_from(&mut self, id: PositionId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.revision += 1;
        if !node.valid {
            // Descendants of an invalid node are already invalid.
            return;
        }
        node.valid = false;

        let mut pending = node.children.clone();
        let mut count = 1_usize;
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            if !node.valid {
                continue;
            }
            node.valid = false;
            node.revision += 1;
            count += 1;
            pending.extend_from_slice(&node.children);
        }
        trace!(?id, count, "position subtree invalidated");
    }

    // --- Matrices ---

    /// World matrix children are placed with: parent, then location, then the
    /// rotation about the node's center.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn rotation_location_matrix(&mut self, id: PositionId) -> Result<Matrix4> {
        self.validate(id)?;
        Ok(self.node(id)?.rotation_location)
    }

    /// Model matrix: the rotation-location matrix scaled by the node's size,
    /// mapping the unit cube onto the node's world volume.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn transformation_matrix(&mut self, id: PositionId) -> Result<Matrix4> {
        self.validate(id)?;
        Ok(self.node(id)?.transformation)
    }

    /// The node's box relative to its parent: lower corner at `location`,
    /// extents `size`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn bounding_box(&self, id: PositionId) -> Result<BoundingBox> {
        let placement = self.node(id)?.placement;
        BoundingBox::new(placement.location, placement.size)
    }

    /// Smallest world-axis-aligned box containing the node's volume.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    pub fn paraxial_bounding_box(&mut self, id: PositionId) -> Result<ParaxialBoundingBox> {
        self.validate(id)?;
        let node = self.node(id)?;
        let mut local = self.pool.get::<BoundingBox>();
        local.set_position(Vector3::zeros())?;
        local.set_size(node.placement.size)?;
        Ok(ParaxialBoundingBox::from_box(&local, &node.rotation_location))
    }

    fn validate(&mut self, id: PositionId) -> Result<()> {
        let mut stale = Vec::new();
        let mut cursor = Anchor::Node(id);
        while let Anchor::Node(current) = cursor {
            let node = self.node(current)?;
            if node.valid {
                break;
            }
            stale.push(current);
            cursor = node.parent;
        }
        for current in stale.into_iter().rev() {
            self.recompute(current)?;
        }
        Ok(())
    }

    /// Rebuilds one node's matrices. Its parent must already be valid.
    fn recompute(&mut self, id: PositionId) -> Result<()> {
        let Self { nodes, pool, .. } = self;
        let node = nodes.get(id).ok_or(PositionError::NodeNotFound(id))?;
        let placement = node.placement;

        let mut m = pool.get::<Matrix4>();
        *m = match node.parent {
            Anchor::Identity => IdentityPosition.rotation_location_matrix(),
            Anchor::Node(parent) => {
                nodes
                    .get(parent)
                    .ok_or(PositionError::NodeNotFound(parent))?
                    .rotation_location
            }
        };

        let mut pivot = pool.get::<Vector3>();
        *pivot = placement.size / 2.0;

        matrix::translate(&mut m, &placement.location);
        matrix::translate(&mut m, &pivot);
        matrix::rotate_y(&mut m, placement.rotation.y);
        matrix::rotate_z(&mut m, placement.rotation.z);
        matrix::rotate_x(&mut m, placement.rotation.x);
        pivot.neg_mut();
        matrix::translate(&mut m, &pivot);

        let node = nodes.get_mut(id).ok_or(PositionError::NodeNotFound(id))?;
        node.rotation_location = *m;
        node.transformation = *m;
        matrix::scale(&mut node.transformation, &placement.size);
        node.valid = true;
        trace!(?id, revision = node.revision, "position matrices recomputed");
        Ok(())
    }

    fn node(&self, id: PositionId) -> std::result::Result<&PositionNode, PositionError> {
        self.nodes.get(id).ok_or(PositionError::NodeNotFound(id))
    }

    fn node_mut(
        &mut self,
        id: PositionId,
    ) -> std::result::Result<&mut PositionNode, PositionError> {
        self.nodes.get_mut(id).ok_or(PositionError::NodeNotFound(id))
    }
}

/// Maps a world point into the frame of a rotation-location matrix.
///
/// Rotation-location matrices never scale, so the inverse is the transposed
/// rotation applied after removing the translation.
fn world_to_local(frame: &Matrix4, world: &Vector3) -> Vector3 {
    let rotation = frame.fixed_view::<3, 3>(0, 0);
    let origin = frame.fixed_view::<3, 1>(0, 3);
    rotation.transpose() * (world - origin)
}

impl<M: TreeMode> fmt::Debug for PositionTree<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionTree")
            .field("nodes", &self.nodes.len())
            .field("pool", &self.pool)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::f64::consts::FRAC_PI_2;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use approx::assert_relative_eq;
    use tracing_subscriber::EnvFilter;

    use super::*;
    use crate::cache::Shared;
    use crate::error::{PreconditionError, SpatiaError};
    use crate::math::vector::transform_point;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    type Events = Rc<RefCell<Vec<(PositionId, PositionHint, Vector3)>>>;

    fn record(tree: &mut PositionTree) -> Events {
        let events: Events = Rc::default();
        let sink = Rc::clone(&events);
        tree.set_listener(Box::new(
            move |id: PositionId, hint: PositionHint, delta: &Vector3| {
                sink.borrow_mut().push((id, hint, *delta));
            },
        ));
        events
    }

    #[test]
    fn child_maps_unit_corner_to_world() {
        init_tracing();
        let mut tree = PositionTree::new();
        let root = tree.insert(Placement::default()).unwrap();
        let child = tree
            .insert_child(root, Placement::at(v(10.0, 0.0, 0.0)).with_size(v(2.0, 2.0, 2.0)))
            .unwrap();

        let m = tree.transformation_matrix(child).unwrap();
        assert_relative_eq!(transform_point(&m, &v(1.0, 1.0, 1.0)), v(12.0, 2.0, 2.0));
        assert_relative_eq!(transform_point(&m, &v(0.0, 0.0, 0.0)), v(10.0, 0.0, 0.0));
    }

    #[test]
    fn ancestor_invalidation_reaches_descendants() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        let b = tree.insert_child(a, Placement::default()).unwrap();
        let n = tree.insert_child(b, Placement::default()).unwrap();

        tree.transformation_matrix(n).unwrap();
        assert!(tree.is_valid(a).unwrap());
        assert!(tree.is_valid(n).unwrap());

        tree.invalidate(a).unwrap();
        assert!(!tree.is_valid(a).unwrap());
        assert!(!tree.is_valid(b).unwrap());
        assert!(!tree.is_valid(n).unwrap());

        tree.rotation_location_matrix(n).unwrap();
        assert!(tree.is_valid(a).unwrap());
        assert!(tree.is_valid(n).unwrap());
    }

    #[test]
    fn reading_a_parent_does_not_validate_children() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        let b = tree.insert_child(a, Placement::default()).unwrap();

        tree.transformation_matrix(a).unwrap();
        assert!(tree.is_valid(a).unwrap());
        assert!(!tree.is_valid(b).unwrap());
    }

    #[test]
    fn mutation_is_visible_to_next_read() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        let b = tree.insert_child(a, Placement::at(v(1.0, 0.0, 0.0))).unwrap();

        let before = tree.transformation_matrix(b).unwrap();
        assert_relative_eq!(transform_point(&before, &Vector3::zeros()), v(1.0, 0.0, 0.0));

        tree.set_location(a, v(0.0, 5.0, 0.0)).unwrap();
        let after = tree.transformation_matrix(b).unwrap();
        assert_relative_eq!(transform_point(&after, &Vector3::zeros()), v(1.0, 5.0, 0.0));
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let mut tree = PositionTree::new();
        let a = tree
            .insert(Placement::new(v(1.5, -2.0, 0.25), v(3.0, 1.0, 2.0), v(0.3, 1.2, -0.7)))
            .unwrap();
        let b = tree
            .insert_child(a, Placement::new(v(0.1, 0.2, 0.3), v(0.5, 0.5, 4.0), v(-0.4, 0.0, 2.0)))
            .unwrap();

        let first = tree.transformation_matrix(b).unwrap();
        let cached = tree.transformation_matrix(b).unwrap();
        tree.invalidate(a).unwrap();
        let recomputed = tree.transformation_matrix(b).unwrap();
        assert_eq!(first, cached);
        assert_eq!(first, recomputed);
    }

    #[test]
    fn size_is_not_inherited() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default().with_size(v(4.0, 4.0, 4.0))).unwrap();
        let b = tree.insert_child(a, Placement::at(v(1.0, 1.0, 1.0))).unwrap();

        let m = tree.transformation_matrix(b).unwrap();
        assert_relative_eq!(transform_point(&m, &v(1.0, 1.0, 1.0)), v(2.0, 2.0, 2.0));
    }

    #[test]
    fn rotation_turns_about_center() {
        let mut tree = PositionTree::new();
        let a = tree
            .insert(
                Placement::default()
                    .with_size(v(2.0, 2.0, 2.0))
                    .with_rotation(v(0.0, 0.0, FRAC_PI_2)),
            )
            .unwrap();

        let m = tree.transformation_matrix(a).unwrap();
        // The center stays put, the lower corner swings around it.
        assert_relative_eq!(transform_point(&m, &v(0.5, 0.5, 0.5)), v(1.0, 1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(transform_point(&m, &v(0.0, 0.0, 0.0)), v(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn setters_skip_equal_values() {
        let mut tree = PositionTree::new();
        let events = record(&mut tree);
        let a = tree.insert(Placement::at(v(1.0, 2.0, 3.0))).unwrap();
        tree.transformation_matrix(a).unwrap();
        let revision = tree.revision(a).unwrap();

        assert!(!tree.set_location(a, v(1.0, 2.0, 3.0)).unwrap());
        assert!(!tree.set_size(a, v(1.0, 1.0, 1.0)).unwrap());
        assert!(!tree.set_rotation(a, Vector3::zeros()).unwrap());

        assert!(tree.is_valid(a).unwrap());
        assert_eq!(tree.revision(a).unwrap(), revision);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn setters_notify_with_delta() {
        let mut tree = PositionTree::new();
        let events = record(&mut tree);
        let a = tree.insert(Placement::at(v(1.0, 2.0, 3.0))).unwrap();

        assert!(tree.set_location(a, v(2.0, 2.0, 0.0)).unwrap());
        assert!(tree.set_size(a, v(1.0, 3.0, 1.0)).unwrap());
        assert!(tree.set_rotation(a, v(0.0, 0.5, 0.0)).unwrap());

        let events = events.borrow();
        assert_eq!(
            *events,
            vec![
                (a, PositionHint::Location, v(1.0, 0.0, -3.0)),
                (a, PositionHint::Size, v(0.0, 2.0, 0.0)),
                (a, PositionHint::Rotation, v(0.0, 0.5, 0.0)),
            ]
        );
    }

    #[test]
    fn invalid_arguments_fail_fast() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();

        let err = tree.set_size(a, v(1.0, -1.0, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            SpatiaError::Precondition(PreconditionError::NegativeExtent { axis: 1, .. })
        ));
        assert!(tree.set_location(a, v(f64::NAN, 0.0, 0.0)).is_err());
        assert_eq!(tree.size(a).unwrap(), v(1.0, 1.0, 1.0));

        assert!(tree.insert(Placement::default().with_size(v(-1.0, 1.0, 1.0))).is_err());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn stale_ids_are_reported() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        tree.remove(a).unwrap();

        assert!(!tree.contains(a));
        assert!(matches!(
            tree.transformation_matrix(a),
            Err(SpatiaError::Position(PositionError::NodeNotFound(id))) if id == a
        ));
        assert!(tree.insert_child(a, Placement::default()).is_err());
    }

    #[test]
    fn set_position_between_siblings_copies_values() {
        let mut tree = PositionTree::new();
        let events = record(&mut tree);
        let parent = tree.insert(Placement::at(v(100.0, 0.0, 0.0))).unwrap();
        let source = tree
            .insert_child(
                parent,
                Placement::new(v(1.0, 2.0, 3.0), v(2.0, 2.0, 2.0), v(0.1, 0.2, 0.3)),
            )
            .unwrap();
        let target = tree.insert_child(parent, Placement::default()).unwrap();

        tree.set_position(target, source).unwrap();
        assert_eq!(tree.placement(target).unwrap(), tree.placement(source).unwrap());
        assert_eq!(tree.parent(target).unwrap(), Anchor::Node(parent));

        let hints: Vec<_> = events.borrow().iter().map(|(_, hint, _)| *hint).collect();
        assert_eq!(
            hints,
            vec![PositionHint::Rotation, PositionHint::Size, PositionHint::Location]
        );
    }

    #[test]
    fn set_position_across_parents_matches_world_placement() {
        let mut tree = PositionTree::new();
        let parent = tree.insert(Placement::at(v(100.0, 0.0, 0.0))).unwrap();
        let source = tree
            .insert(Placement::new(v(1.0, 2.0, 3.0), v(2.0, 2.0, 2.0), v(0.1, 0.2, 0.3)))
            .unwrap();
        let target = tree.insert_child(parent, Placement::default()).unwrap();

        tree.set_position(target, source).unwrap();
        assert_eq!(tree.parent(target).unwrap(), Anchor::Node(parent));
        assert_eq!(tree.location(target).unwrap(), v(-99.0, 2.0, 3.0));
        assert_eq!(tree.size(target).unwrap(), v(2.0, 2.0, 2.0));
        assert_eq!(tree.rotation(target).unwrap(), v(0.1, 0.2, 0.3));

        let expected = tree.transformation_matrix(source).unwrap();
        let actual = tree.transformation_matrix(target).unwrap();
        assert_relative_eq!(actual, expected, epsilon = 1e-12);
        assert_relative_eq!(transform_point(&actual, &Vector3::zeros()), v(1.0, 2.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn set_position_under_rotated_parent() {
        let mut tree = PositionTree::new();
        let parent = tree
            .insert(
                Placement::at(v(5.0, 0.0, 0.0))
                    .with_size(v(2.0, 2.0, 2.0))
                    .with_rotation(v(0.0, 0.0, FRAC_PI_2)),
            )
            .unwrap();
        let other = tree.insert(Placement::at(v(0.0, -3.0, 0.0))).unwrap();
        let source = tree.insert_child(other, Placement::at(v(1.0, 5.0, 3.0))).unwrap();
        let target = tree.insert_child(parent, Placement::default()).unwrap();

        tree.set_position(target, source).unwrap();

        let frame = tree.rotation_location_matrix(parent).unwrap();
        let corner = transform_point(&frame, &tree.location(target).unwrap());
        assert_relative_eq!(corner, v(1.0, 2.0, 3.0), epsilon = 1e-12);

        // Moving to the same spot again is a no-op.
        let revision = tree.revision(target).unwrap();
        tree.set_position(target, target).unwrap();
        assert_eq!(tree.revision(target).unwrap(), revision);
    }

    #[test]
    fn remove_reattaches_children() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::at(v(1.0, 0.0, 0.0))).unwrap();
        let b = tree.insert_child(a, Placement::at(v(1.0, 0.0, 0.0))).unwrap();
        let c = tree.insert_child(b, Placement::at(v(1.0, 0.0, 0.0))).unwrap();
        tree.transformation_matrix(c).unwrap();

        let removed = tree.remove(b).unwrap();
        assert_eq!(removed.location, v(1.0, 0.0, 0.0));
        assert_eq!(tree.parent(c).unwrap(), Anchor::Node(a));
        assert_eq!(tree.children(a).unwrap(), &[c]);
        assert!(!tree.is_valid(c).unwrap());

        let m = tree.transformation_matrix(c).unwrap();
        assert_relative_eq!(transform_point(&m, &Vector3::zeros()), v(2.0, 0.0, 0.0));
    }

    #[test]
    fn set_parent_moves_subtree() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::at(v(5.0, 0.0, 0.0))).unwrap();
        let b = tree.insert(Placement::at(v(0.0, 1.0, 0.0))).unwrap();
        tree.transformation_matrix(b).unwrap();

        tree.set_parent(b, a).unwrap();
        assert!(!tree.is_valid(b).unwrap());
        assert_eq!(tree.children(a).unwrap(), &[b]);
        let m = tree.transformation_matrix(b).unwrap();
        assert_relative_eq!(transform_point(&m, &Vector3::zeros()), v(5.0, 1.0, 0.0));

        tree.set_parent(b, Anchor::Identity).unwrap();
        assert_eq!(tree.parent(b).unwrap(), Anchor::Identity);
        assert!(tree.children(a).unwrap().is_empty());
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        let b = tree.insert_child(a, Placement::default()).unwrap();
        let c = tree.insert_child(b, Placement::default()).unwrap();

        let err = tree.set_parent(a, c).unwrap_err();
        assert!(matches!(
            err,
            SpatiaError::Position(PositionError::Cycle { child, parent }) if child == a && parent == c
        ));
        assert!(tree.set_parent(a, a).is_err());
        assert_eq!(tree.parent(a).unwrap(), Anchor::Identity);
    }

    #[test]
    fn revision_tracks_staleness() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        let b = tree.insert_child(a, Placement::default()).unwrap();
        tree.transformation_matrix(b).unwrap();
        let before = tree.revision(b).unwrap();

        tree.set_rotation(a, v(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(tree.revision(b).unwrap(), before + 1);

        // Already stale: a second change upstream does not touch it again.
        tree.set_rotation(a, v(0.0, 2.0, 0.0)).unwrap();
        assert_eq!(tree.revision(b).unwrap(), before + 1);
    }

    #[test]
    fn bounding_boxes() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::at(v(10.0, 0.0, 0.0))).unwrap();
        let b = tree
            .insert_child(a, Placement::at(v(1.0, 1.0, 1.0)).with_size(v(2.0, 2.0, 2.0)))
            .unwrap();

        let local = tree.bounding_box(b).unwrap();
        assert_eq!(*local.position(), v(1.0, 1.0, 1.0));
        assert_eq!(*local.size(), v(2.0, 2.0, 2.0));

        let world = tree.paraxial_bounding_box(b).unwrap();
        let expected = ParaxialBoundingBox::from_corners(&v(11.0, 1.0, 1.0), &v(13.0, 3.0, 3.0));
        assert!(world.approx_eq(&expected, 1e-12), "got {world:?}");

        let hit = world.intersect_ray(&v(0.0, 2.0, 2.0), &v(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(hit, 11.0);
    }

    #[test]
    fn recompute_reuses_scratch_values() {
        let mut tree = PositionTree::new();
        let a = tree.insert(Placement::default()).unwrap();
        for i in 0..10 {
            tree.set_location(a, v(f64::from(i), 0.0, 0.0)).unwrap();
            tree.transformation_matrix(a).unwrap();
        }
        assert_eq!(tree.pool().allocated::<Matrix4>(), 1);
        assert_eq!(tree.pool().allocated::<Vector3>(), 1);
    }

    #[test]
    fn shared_tree_moves_between_threads() {
        let moved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&moved);

        let mut tree = PositionTree::with_pool(ScratchPool::<Shared>::new());
        tree.set_listener(Box::new(
            move |id: PositionId, _: PositionHint, delta: &Vector3| {
                sink.lock().unwrap().push((id, *delta));
            },
        ));
        let a = tree.insert(Placement::at(v(0.0, 0.0, 3.0))).unwrap();

        let worker = std::thread::spawn(move || {
            tree.set_location(a, v(1.0, 0.0, 3.0)).unwrap();
            tree.rotation_location_matrix(a).unwrap()
        });
        let m = worker.join().unwrap();

        assert_relative_eq!(transform_point(&m, &Vector3::zeros()), v(1.0, 0.0, 3.0));
        assert_eq!(*moved.lock().unwrap(), vec![(a, v(1.0, 0.0, 0.0))]);
    }
}
