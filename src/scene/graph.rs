use std::iter;
use std::ops::{Index, IndexMut};

use crate::errors::*;
use crate::identity::{Identifiable, Tag};
use crate::math::prelude::*;
use crate::utils::{FastHashMap, ObjectPool};

use super::node::{Node, NodeHandle};

/// A scene graph that stores nodes in an arena, and keeps the tree relationships
/// between them as handles. Every node is owned by the scene; a node is owned by its
/// parent only in the sense that removing the parent removes it too.
///
/// Global transforms are cached per node and recomputed lazily, when the newest
/// transform stamp along the ancestry differs from the one the cache was built with.
pub struct Scene {
    nodes: ObjectPool<NodeHandle, Node>,
    root: NodeHandle,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}

impl Index<NodeHandle> for Scene {
    type Output = Node;

    fn index(&self, handle: NodeHandle) -> &Node {
        match self.nodes.get(handle) {
            Some(v) => v,
            None => panic!("{} is not alive in the scene.", handle),
        }
    }
}

impl IndexMut<NodeHandle> for Scene {
    fn index_mut(&mut self, handle: NodeHandle) -> &mut Node {
        match self.nodes.get_mut(handle) {
            Some(v) => v,
            None => panic!("{} is not alive in the scene.", handle),
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = ObjectPool::new();
        let root = nodes.create(Node::named("Scene"));
        Scene { nodes, root }
    }

    /// The node everything drawn descends from.
    #[inline]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.is_alive(handle)
    }

    #[inline]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Adds a node as the last child of the root.
    pub fn add(&mut self, node: Node) -> NodeHandle {
        let root = self.root;
        let handle = self.nodes.create(node);
        self.link(handle, root);
        handle
    }

    /// Adds a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeHandle, node: Node) -> Result<NodeHandle> {
        if !self.contains(parent) {
            bail!("Parent {} is not alive in the scene.", parent);
        }

        let handle = self.nodes.create(node);
        self.link(handle, parent);
        Ok(handle)
    }

    /// Adds a node without a parent. It is not drawn until attached below the root.
    pub fn add_detached(&mut self, node: Node) -> NodeHandle {
        self.nodes.create(node)
    }

    /// Removes a node and all of its descendants, returning their handles.
    pub fn remove(&mut self, handle: NodeHandle) -> Vec<NodeHandle> {
        assert!(handle != self.root, "The root of a scene can not be removed.");
        if !self.contains(handle) {
            return Vec::new();
        }

        self.unlink(handle);
        let removes: Vec<_> = iter::once(handle).chain(self.descendants(handle)).collect();
        for &v in &removes {
            self.nodes.free(v);
        }

        removes
    }

    /// Attaches `child` as the last child of `parent`, or detaches it with `None`.
    pub fn set_parent<T>(&mut self, child: NodeHandle, parent: T) -> Result<()>
    where
        T: Into<Option<NodeHandle>>,
    {
        if !self.contains(child) {
            bail!("{} is not alive in the scene.", child);
        }

        let parent = parent.into();
        if let Some(parent) = parent {
            if !self.contains(parent) {
                bail!("Parent {} is not alive in the scene.", parent);
            }

            if parent == child || self.is_ancestor(parent, child) {
                bail!("{} can not become a descendant of itself.", child);
            }
        }

        self.unlink(child);
        if let Some(parent) = parent {
            self.link(child, parent);
        }

        Ok(())
    }

    fn link(&mut self, child: NodeHandle, parent: NodeHandle) {
        let last = self.children(parent).last();
        match last {
            Some(last) => self[last].links.next_sib = Some(child),
            None => self[parent].links.first_child = Some(child),
        }

        let node = &mut self[child];
        node.links.parent = Some(parent);
        node.links.prev_sib = last;
        node.links.next_sib = None;
        node.touch();
    }

    fn unlink(&mut self, child: NodeHandle) {
        let (parent, next_sib, prev_sib) = {
            let links = &mut self[child].links;
            (links.parent.take(), links.next_sib.take(), links.prev_sib.take())
        };

        if let Some(next_sib) = next_sib {
            self[next_sib].links.prev_sib = prev_sib;
        }

        if let Some(prev_sib) = prev_sib {
            self[prev_sib].links.next_sib = next_sib;
        } else if let Some(parent) = parent {
            self[parent].links.first_child = next_sib;
        }

        self[child].touch();
    }

    #[inline]
    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(handle).and_then(|v| v.links.parent)
    }

    /// Returns an iterator of handles to the ancestors, nearest first.
    pub fn ancestors(&self, handle: NodeHandle) -> Ancestors {
        Ancestors {
            scene: self,
            cursor: self.parent(handle),
        }
    }

    /// Returns true if `ancestor` is one of the ancestors of `handle`.
    pub fn is_ancestor(&self, handle: NodeHandle, ancestor: NodeHandle) -> bool {
        self.ancestors(handle).any(|v| v == ancestor)
    }

    /// Returns an iterator of handles to the children, in order.
    pub fn children(&self, handle: NodeHandle) -> Children {
        Children {
            scene: self,
            cursor: self.nodes.get(handle).and_then(|v| v.links.first_child),
        }
    }

    /// Returns an iterator of handles to the descendants, depth first.
    pub fn descendants(&self, handle: NodeHandle) -> Descendants {
        Descendants {
            scene: self,
            root: handle,
            cursor: self.nodes.get(handle).and_then(|v| v.links.first_child),
        }
    }

    /// Finds the first node named `name` in the subtree of `from`, `from` included.
    pub fn find_by_name(&self, from: NodeHandle, name: &str) -> Option<NodeHandle> {
        iter::once(from)
            .chain(self.descendants(from))
            .find(|&v| self[v].name() == Some(name))
    }

    pub fn find_by_tag(&self, from: NodeHandle, tag: Tag) -> Option<NodeHandle> {
        iter::once(from)
            .chain(self.descendants(from))
            .find(|&v| self[v].tag() == tag)
    }

    /// Shows or hides a node and all of its descendants.
    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) {
        let all: Vec<_> = iter::once(handle).chain(self.descendants(handle)).collect();
        for v in all {
            self[v].set_is_visible(visible);
        }
    }

    /// Copies the subtree of `handle` below `parent`, skipping nodes that opt out of
    /// deep copies. Meshes are shared with the originals; skins of the copy are bound
    /// to the copied bones. Returns `None` if `handle` itself opts out.
    pub fn copy_subtree<T>(&mut self, handle: NodeHandle, parent: T) -> Option<NodeHandle>
    where
        T: Into<Option<NodeHandle>>,
    {
        if !self[handle].should_include_in_deep_copy() {
            return None;
        }

        let mut remap = FastHashMap::default();
        let copy = self.copy_recursive(handle, parent.into(), &mut remap);

        let copies: Vec<_> = remap.values().cloned().collect();
        for v in copies {
            if let Some(skin) = self[v].skin_mut() {
                skin.remap_bones(&remap);
            }
        }

        Some(copy)
    }

    fn copy_recursive(
        &mut self,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
        remap: &mut FastHashMap<NodeHandle, NodeHandle>,
    ) -> NodeHandle {
        let node = self[handle].copy();
        let copy = self.nodes.create(node);
        if let Some(parent) = parent {
            self.link(copy, parent);
        }

        remap.insert(handle, copy);

        let children: Vec<_> = self
            .children(handle)
            .filter(|&v| self[v].should_include_in_deep_copy())
            .collect();

        for v in children {
            self.copy_recursive(v, Some(copy), remap);
        }

        copy
    }
}

impl Scene {
    /// The newest transform stamp along the ancestry of `handle`.
    pub fn transform_stamp(&self, handle: NodeHandle) -> u64 {
        iter::once(handle)
            .chain(self.ancestors(handle))
            .map(|v| self[v].stamp())
            .max()
            .unwrap_or(0)
    }

    /// The transform from the local space of `handle` into world space.
    pub fn global_transform(&self, handle: NodeHandle) -> Matrix4<f32> {
        self.global(handle).1
    }

    fn global(&self, handle: NodeHandle) -> (u64, Matrix4<f32>) {
        let node = &self[handle];
        let (parent_stamp, parent) = match node.links.parent {
            Some(v) => {
                let (s, m) = self.global(v);
                (s, Some(m))
            }
            None => (0, None),
        };

        let stamp = parent_stamp.max(node.stamp());
        if let Some((s, m)) = node.global.get() {
            if s == stamp {
                return (s, m);
            }
        }

        let local = node.local_transform();
        let m = match parent {
            Some(p) => p * local,
            None => local,
        };

        node.global.set(Some((stamp, m)));
        (stamp, m)
    }

    /// The location of `handle` in world space.
    pub fn global_location(&self, handle: NodeHandle) -> Point3<f32> {
        Point3::from_vec(self.global_transform(handle).w.truncate())
    }

    /// The transform from the local space of `handle` into the local space of
    /// `ancestor`. Returns `None` if `ancestor` is neither `handle` nor one of its
    /// ancestors.
    pub fn transform_relative_to(
        &self,
        handle: NodeHandle,
        ancestor: NodeHandle,
    ) -> Option<Matrix4<f32>> {
        let mut m = Matrix4::identity();
        let mut cursor = handle;
        while cursor != ancestor {
            m = self[cursor].local_transform() * m;
            cursor = self.parent(cursor)?;
        }

        Some(m)
    }

    /// Points the forward direction of `handle` at `target`, given in world space.
    pub fn look_at(&mut self, handle: NodeHandle, target: Point3<f32>) {
        let eye = self.global_location(handle);
        let world = target - eye;
        let forward = match self.parent(handle) {
            Some(p) => match self.global_transform(p).invert() {
                Some(inv) => inv.transform_vector(world),
                None => world,
            },
            None => world,
        };

        self[handle].set_forward_direction(forward);
    }
}

/// An iterator of handles to the ancestors of a node.
pub struct Ancestors<'a> {
    scene: &'a Scene,
    cursor: Option<NodeHandle>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.cursor?;
        self.cursor = self.scene.parent(v);
        Some(v)
    }
}

/// An iterator of handles to the children of a node.
pub struct Children<'a> {
    scene: &'a Scene,
    cursor: Option<NodeHandle>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.cursor?;
        self.cursor = self.scene[v].links.next_sib;
        Some(v)
    }
}

/// An iterator of handles to the descendants of a node, in depth-first order.
pub struct Descendants<'a> {
    scene: &'a Scene,
    root: NodeHandle,
    cursor: Option<NodeHandle>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        let mut links = self.scene[current].links;

        if links.first_child.is_some() {
            self.cursor = links.first_child;
            return Some(current);
        }

        if links.next_sib.is_some() {
            self.cursor = links.next_sib;
            return Some(current);
        }

        // Travels back when a leaf is reached.
        self.cursor = None;
        while let Some(parent) = links.parent {
            if parent == self.root {
                break;
            }

            links = self.scene[parent].links;
            if links.next_sib.is_some() {
                self.cursor = links.next_sib;
                break;
            }
        }

        Some(current)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hierarchy() {
        let mut scene = Scene::new();
        let a = scene.add(Node::named("a"));
        let b = scene.add_child(a, Node::named("b")).unwrap();
        let c = scene.add_child(a, Node::named("c")).unwrap();
        let d = scene.add_child(b, Node::named("d")).unwrap();
        let e = scene.add(Node::named("e"));

        assert_eq!(scene.children(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(
            scene.descendants(scene.root()).collect::<Vec<_>>(),
            vec![a, b, d, c, e]
        );
        assert_eq!(scene.descendants(b).collect::<Vec<_>>(), vec![d]);
        assert_eq!(scene.ancestors(d).collect::<Vec<_>>(), vec![b, a, scene.root()]);
        assert_eq!(scene.find_by_name(scene.root(), "c"), Some(c));
        assert_eq!(scene.find_by_tag(a, scene[d].tag()), Some(d));

        assert!(scene.set_parent(a, d).is_err());
        scene.set_parent(d, c).unwrap();
        assert_eq!(scene.children(b).count(), 0);
        assert_eq!(scene.children(c).collect::<Vec<_>>(), vec![d]);

        scene.set_parent(b, None).unwrap();
        assert_eq!(scene.children(a).collect::<Vec<_>>(), vec![c]);
        assert_eq!(scene.parent(b), None);

        assert_eq!(scene.remove(a).len(), 3);
        assert!(!scene.contains(d));
        assert_eq!(scene.children(scene.root()).collect::<Vec<_>>(), vec![e]);
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn global_transforms() {
        let mut scene = Scene::new();
        let a = scene.add(Node::named("a"));
        let b = scene.add_child(a, Node::named("b")).unwrap();
        scene[a].set_location(Vector3::new(1.0, 0.0, 0.0));
        scene[b].set_location(Vector3::new(0.0, 2.0, 0.0));

        assert_ulps_eq!(scene.global_location(b), Point3::new(1.0, 2.0, 0.0));
        let stamp = scene.transform_stamp(b);

        // A change of the parent invalidates the cached transform of the child.
        scene[a].set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
        assert!(scene.transform_stamp(b) > stamp);
        assert_ulps_eq!(scene.global_location(b), Point3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);

        let relative = scene.transform_relative_to(b, a).unwrap();
        assert_ulps_eq!(relative.w.truncate(), Vector3::new(0.0, 2.0, 0.0));
        assert!(scene.transform_relative_to(a, b).is_none());
        assert_eq!(scene.transform_relative_to(a, a), Some(Matrix4::identity()));
    }

    #[test]
    fn copy_subtree() {
        let mut scene = Scene::new();
        let a = scene.add(Node::named("a"));
        let b = scene.add_child(a, Node::named("b")).unwrap();
        let debug = scene.add_child(a, Node::named("debug")).unwrap();
        scene[debug].set_should_include_in_deep_copy(false);
        scene[b].set_location(Vector3::new(0.0, 0.0, 5.0));

        let copy = scene.copy_subtree(a, scene.root()).unwrap();
        assert_ne!(scene[copy].tag(), scene[a].tag());
        assert_eq!(scene.children(copy).count(), 1);

        let b2 = scene.find_by_name(copy, "b").unwrap();
        assert_ne!(b2, b);
        assert_eq!(scene[b2].location(), Vector3::new(0.0, 0.0, 5.0));
        assert!(scene.copy_subtree(debug, None).is_none());
    }

    #[test]
    fn look_at() {
        let mut scene = Scene::new();
        let a = scene.add(Node::named("a"));
        scene[a].set_location(Vector3::new(0.0, 0.0, 10.0));
        scene.look_at(a, Point3::new(0.0, 0.0, 0.0));
        assert_ulps_eq!(scene[a].forward_direction(), -Vector3::unit_z(), epsilon = 1e-6);
    }
}
