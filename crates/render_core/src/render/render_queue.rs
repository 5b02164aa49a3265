//! Render queue
//!
//! Sorts one frame's visible renderables into a two-level structure:
//!
//! 1. coarse [`RenderQueueGroupId`]s (background, main, overlay, ...),
//! 2. numeric priorities within each group,
//!
//! and inside each (group, priority) pair a [`RenderPriorityGroup`] splits
//! opaque renderables into per-material buckets (to minimise state changes)
//! and keeps transparent ones in a list sorted far-to-near.
//!
//! The queue stores [`RenderableKey`]s only, so it can be built on one thread
//! and handed to another. [`RenderQueue::clear`] empties contents but keeps
//! every group, priority group and material bucket allocated for the next
//! frame.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::render::renderable::{MaterialId, Renderable, RenderableKey, RenderableSource};
use crate::scene::camera::Camera;

/// Priority used when none is given
pub const DEFAULT_PRIORITY: u16 = 100;

/// Coarse render phase, drawn in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RenderQueueGroupId {
    /// Drawn first (sky boxes)
    Background = 0,
    /// First user group
    Queue1 = 10,
    /// Second user group
    Queue2 = 20,
    /// Third user group
    Queue3 = 30,
    /// Fourth user group
    Queue4 = 40,
    /// Regular scene geometry
    #[default]
    Main = 50,
    /// Sixth user group
    Queue6 = 60,
    /// Seventh user group
    Queue7 = 70,
    /// Eighth user group
    Queue8 = 80,
    /// Ninth user group
    Queue9 = 90,
    /// Drawn last (HUD, overlays)
    Overlay = 100,
}

/// Opaque and transparent renderables sharing a (group, priority) pair
#[derive(Debug, Default)]
pub struct RenderPriorityGroup {
    material_groups: HashMap<MaterialId, Vec<RenderableKey>>,
    transparent: Vec<RenderableKey>,
    depth_scratch: Vec<(f32, RenderableKey)>,
}

impl RenderPriorityGroup {
    /// Create an empty priority group
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a renderable according to its material's transparency
    pub fn add_renderable(&mut self, key: RenderableKey, renderable: &dyn Renderable) {
        let material = renderable.material();
        if material.is_transparent() {
            self.transparent.push(key);
        } else {
            self.material_groups.entry(material.id).or_default().push(key);
        }
    }

    /// Empty all lists, keeping material buckets allocated
    pub fn clear(&mut self) {
        for list in self.material_groups.values_mut() {
            list.clear();
        }
        self.transparent.clear();
    }

    /// Sort transparent renderables far-to-near from `camera`
    ///
    /// Stable: renderables at equal depth keep their insertion order. Keys
    /// missing from `source` sort as depth zero.
    pub fn sort_transparent_objects<S>(&mut self, camera: &Camera, source: &S)
    where
        S: RenderableSource + ?Sized,
    {
        if self.transparent.len() < 2 {
            return;
        }

        self.depth_scratch.clear();
        self.depth_scratch.extend(self.transparent.iter().map(|&key| {
            let depth = source.renderable(key).map_or_else(
                || {
                    log::warn!("Transparent renderable {:?} missing from source", key);
                    0.0
                },
                |renderable| renderable.squared_view_depth(camera),
            );
            (depth, key)
        }));
        self.depth_scratch.sort_by(|a, b| b.0.total_cmp(&a.0));

        self.transparent.clear();
        self.transparent.extend(self.depth_scratch.iter().map(|&(_, key)| key));
    }

    /// Non-empty opaque buckets; order between buckets is unspecified
    pub fn material_groups(&self) -> impl Iterator<Item = (MaterialId, &[RenderableKey])> {
        self.material_groups
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(&id, list)| (id, list.as_slice()))
    }

    /// Opaque bucket for one material
    pub fn material_group(&self, material: MaterialId) -> Option<&[RenderableKey]> {
        self.material_groups.get(&material).map(Vec::as_slice)
    }

    /// Allocated material buckets, including empty ones
    pub fn material_bucket_count(&self) -> usize {
        self.material_groups.len()
    }

    /// Transparent renderables in draw order
    pub fn transparent_objects(&self) -> &[RenderableKey] {
        &self.transparent
    }

    /// Number of opaque renderables
    pub fn opaque_len(&self) -> usize {
        self.material_groups.values().map(Vec::len).sum()
    }

    /// Number of transparent renderables
    pub fn transparent_len(&self) -> usize {
        self.transparent.len()
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.transparent.is_empty() && self.material_groups.values().all(Vec::is_empty)
    }
}

/// Priority groups of one coarse queue group
#[derive(Debug, Default)]
pub struct RenderQueueGroup {
    priority_groups: BTreeMap<u16, RenderPriorityGroup>,
}

impl RenderQueueGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a renderable at `priority`, creating the priority group on first use
    pub fn add_renderable(&mut self, key: RenderableKey, renderable: &dyn Renderable, priority: u16) {
        self.priority_groups.entry(priority).or_default().add_renderable(key, renderable);
    }

    /// Empty every priority group, keeping them allocated
    pub fn clear(&mut self) {
        for group in self.priority_groups.values_mut() {
            group.clear();
        }
    }

    /// Priority groups in ascending priority
    pub fn priority_groups(&self) -> impl Iterator<Item = (u16, &RenderPriorityGroup)> {
        self.priority_groups.iter().map(|(&priority, group)| (priority, group))
    }

    /// One priority group
    pub fn priority_group(&self, priority: u16) -> Option<&RenderPriorityGroup> {
        self.priority_groups.get(&priority)
    }

    fn sort_transparent_objects<S>(&mut self, camera: &Camera, source: &S)
    where
        S: RenderableSource + ?Sized,
    {
        for group in self.priority_groups.values_mut() {
            group.sort_transparent_objects(camera, source);
        }
    }

    fn len(&self) -> usize {
        self.priority_groups
            .values()
            .map(|g| g.opaque_len() + g.transparent_len())
            .sum()
    }
}

/// One step of queue consumption, see [`RenderQueue::visit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBatch<'a> {
    /// Opaque renderables sharing a material
    Opaque {
        /// Coarse group
        group: RenderQueueGroupId,
        /// Priority within the group
        priority: u16,
        /// Shared material
        material: MaterialId,
        /// Renderables in insertion order
        renderables: &'a [RenderableKey],
    },
    /// Transparent renderables, far to near
    Transparent {
        /// Coarse group
        group: RenderQueueGroupId,
        /// Priority within the group
        priority: u16,
        /// Renderables in draw order
        renderables: &'a [RenderableKey],
    },
}

/// The per-frame render queue
#[derive(Debug)]
pub struct RenderQueue {
    groups: BTreeMap<RenderQueueGroupId, RenderQueueGroup>,
    default_group: RenderQueueGroupId,
    default_priority: u16,
}

impl RenderQueue {
    /// Create an empty queue defaulting to [`RenderQueueGroupId::Main`]
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            default_group: RenderQueueGroupId::Main,
            default_priority: DEFAULT_PRIORITY,
        }
    }

    /// Add a renderable to the default group at the default priority
    pub fn add_renderable(&mut self, key: RenderableKey, renderable: &dyn Renderable) {
        self.add_renderable_to(key, renderable, self.default_group, self.default_priority);
    }

    /// Add a renderable to a specific group and priority
    pub fn add_renderable_to(
        &mut self,
        key: RenderableKey,
        renderable: &dyn Renderable,
        group: RenderQueueGroupId,
        priority: u16,
    ) {
        log::trace!("Queueing {:?} in {:?}/{}", key, group, priority);
        self.groups.entry(group).or_default().add_renderable(key, renderable, priority);
    }

    /// Group used by [`Self::add_renderable`]
    pub const fn default_group(&self) -> RenderQueueGroupId {
        self.default_group
    }

    /// Change the default group
    pub fn set_default_group(&mut self, group: RenderQueueGroupId) {
        self.default_group = group;
    }

    /// Priority used by [`Self::add_renderable`]
    pub const fn default_priority(&self) -> u16 {
        self.default_priority
    }

    /// Change the default priority
    pub fn set_default_priority(&mut self, priority: u16) {
        self.default_priority = priority;
    }

    /// Empty the queue, keeping its structure allocated
    pub fn clear(&mut self) {
        for group in self.groups.values_mut() {
            group.clear();
        }
    }

    /// Sort every transparent list far-to-near from `camera`
    pub fn sort_transparent_objects<S>(&mut self, camera: &Camera, source: &S)
    where
        S: RenderableSource + ?Sized,
    {
        for group in self.groups.values_mut() {
            group.sort_transparent_objects(camera, source);
        }
    }

    /// Groups in ascending order
    pub fn groups(&self) -> impl Iterator<Item = (RenderQueueGroupId, &RenderQueueGroup)> {
        self.groups.iter().map(|(&id, group)| (id, group))
    }

    /// One group
    pub fn group(&self, id: RenderQueueGroupId) -> Option<&RenderQueueGroup> {
        self.groups.get(&id)
    }

    /// Number of queued renderables
    pub fn len(&self) -> usize {
        self.groups.values().map(RenderQueueGroup::len).sum()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the queue in draw order
    ///
    /// Groups ascending, then priorities ascending; within each priority
    /// group every non-empty opaque bucket comes before the transparent list.
    pub fn visit<'a>(&'a self, mut visitor: impl FnMut(QueueBatch<'a>)) {
        for (&group, queue_group) in &self.groups {
            for (&priority, priority_group) in &queue_group.priority_groups {
                for (material, renderables) in priority_group.material_groups() {
                    visitor(QueueBatch::Opaque { group, priority, material, renderables });
                }
                if !priority_group.transparent.is_empty() {
                    visitor(QueueBatch::Transparent {
                        group,
                        priority,
                        renderables: &priority_group.transparent,
                    });
                }
            }
        }
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}
