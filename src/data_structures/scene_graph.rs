//! Scene graph and hierarchical scene organization.
//!
//! [`SceneObjectRegistry`] owns every [`Entity`] of a scene together with its
//! parent/child links. Entities are addressed by [`EntityId`]; the implicit
//! root ([`EntityId::ROOT`]) is always registered and never yielded.
//!
//! Children are exclusively owned by their parent: removing an entity removes
//! its whole subtree. Attaching is only allowed below registered parents and
//! never below the entity's own subtree, so the graph stays a tree.

use std::collections::HashMap;

use log::warn;

use crate::data_structures::{entity::Entity, transform::Transform};

/// Handle to an entity of a [`SceneObjectRegistry`]. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub const ROOT: EntityId = EntityId(0);

    pub fn index(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("parent {0:?} is not registered or would create a cycle")]
    InvalidParent(EntityId),
    #[error("entity {0:?} is not registered")]
    UnknownEntity(EntityId),
}

#[derive(Debug)]
struct Node {
    entity: Entity,
    parent: EntityId,
    children: Vec<EntityId>,
    world: Transform,
    world_visible: bool,
}

#[derive(Debug)]
pub struct SceneObjectRegistry {
    nodes: HashMap<EntityId, Node>,
    root_children: Vec<EntityId>,
    // insertion order of all live entities
    order: Vec<EntityId>,
    next_id: u32,
}

impl SceneObjectRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            root_children: Vec::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// Registers `entity` directly below the root.
    pub fn add_to_root(&mut self, entity: Entity) -> EntityId {
        let id = self.allocate();
        self.insert(id, entity, EntityId::ROOT);
        id
    }

    /// Registers `entity` below `parent`.
    pub fn add(&mut self, entity: Entity, parent: EntityId) -> Result<EntityId, SceneError> {
        if !self.is_registered(parent) {
            return Err(SceneError::InvalidParent(parent));
        }
        let id = self.allocate();
        self.insert(id, entity, parent);
        Ok(id)
    }

    /// Removes `id` and its descendants. Returns how many entities were removed.
    pub fn remove(&mut self, id: EntityId) -> usize {
        let Some(node) = self.nodes.get(&id) else {
            return 0;
        };
        let parent = node.parent;
        self.children_vec_mut(parent).retain(|child| *child != id);

        let mut removed = Vec::new();
        let mut to_visit = vec![id];
        while let Some(current) = to_visit.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                to_visit.extend(node.children);
                removed.push(current);
            }
        }
        self.order.retain(|entry| !removed.contains(entry));
        removed.len()
    }

    /// Moves an already registered entity (and its subtree) below `new_parent`.
    pub fn attach(&mut self, id: EntityId, new_parent: EntityId) -> Result<(), SceneError> {
        let Some(node) = self.nodes.get(&id) else {
            return Err(SceneError::UnknownEntity(id));
        };
        if !self.is_registered(new_parent) || self.is_in_subtree(new_parent, id) {
            return Err(SceneError::InvalidParent(new_parent));
        }
        let old_parent = node.parent;
        self.children_vec_mut(old_parent).retain(|child| *child != id);
        self.children_vec_mut(new_parent).push(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = new_parent;
        }
        Ok(())
    }

    /// Every entity in insertion order. Each call starts a fresh pass.
    pub fn all(&self) -> Entities<'_> {
        Entities {
            registry: self,
            ids: self.order.iter(),
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.nodes.get(&id).map(|node| &node.entity)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.nodes.get_mut(&id).map(|node| &mut node.entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(&id).map(|node| node.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        if id == EntityId::ROOT {
            return &self.root_children;
        }
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// First entity in insertion order with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.all()
            .find(|(_, entity)| entity.name == name)
            .map(|(id, _)| id)
    }

    /// World transform as of the last [`update_world_transforms`](Self::update_world_transforms).
    pub fn world_transform(&self, id: EntityId) -> Option<Transform> {
        self.nodes.get(&id).map(|node| node.world)
    }

    /// Visibility including all ancestors, as of the last world update.
    pub fn is_visible(&self, id: EntityId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.world_visible)
    }

    /// Recomputes world transforms (`parent * local`) and inherited visibility.
    pub fn update_world_transforms(&mut self) {
        let mut to_visit: Vec<(EntityId, Transform, bool)> = self
            .root_children
            .iter()
            .rev()
            .map(|id| (*id, Transform::new(), true))
            .collect();
        while let Some((id, parent_world, parent_visible)) = to_visit.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                warn!("Scene graph references the missing entity {:?}", id);
                continue;
            };
            node.world = &parent_world * &node.entity.transform;
            node.world_visible = parent_visible && node.entity.visible;
            let (world, visible) = (node.world, node.world_visible);
            to_visit.extend(node.children.iter().rev().map(|child| (*child, world, visible)));
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, id: EntityId, entity: Entity, parent: EntityId) {
        let world_visible = entity.visible;
        let world = entity.transform;
        self.nodes.insert(
            id,
            Node {
                entity,
                parent,
                children: Vec::new(),
                world,
                world_visible,
            },
        );
        self.children_vec_mut(parent).push(id);
        self.order.push(id);
    }

    fn is_registered(&self, id: EntityId) -> bool {
        id == EntityId::ROOT || self.nodes.contains_key(&id)
    }

    /// Whether `candidate` is `ancestor` or lies somewhere below it.
    fn is_in_subtree(&self, candidate: EntityId, ancestor: EntityId) -> bool {
        let mut current = candidate;
        loop {
            if current == ancestor {
                return true;
            }
            match self.nodes.get(&current) {
                Some(node) => current = node.parent,
                None => return false,
            }
        }
    }

    fn children_vec_mut(&mut self, id: EntityId) -> &mut Vec<EntityId> {
        if id == EntityId::ROOT {
            return &mut self.root_children;
        }
        match self.nodes.get_mut(&id) {
            Some(node) => &mut node.children,
            // unreachable for registered ids; keeps the root list as a harmless sink
            None => &mut self.root_children,
        }
    }
}

impl Default for SceneObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy pass over a registry in insertion order.
pub struct Entities<'a> {
    registry: &'a SceneObjectRegistry,
    ids: std::slice::Iter<'a, EntityId>,
}

impl<'a> Iterator for Entities<'a> {
    type Item = (EntityId, &'a Entity);

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.ids.next()?;
        self.registry.get(id).map(|entity| (id, entity))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}
