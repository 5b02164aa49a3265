//! Scene Manager
//!
//! Owns the node graph, cameras and scene objects, and runs the per-frame
//! flow for one viewport:
//!
//! 1. update node transforms top-down
//! 2. sync attached cameras to their nodes and re-aim tracking cameras
//! 3. cull attached, visible objects against the camera frustum into the
//!    render queue
//! 4. sort transparent renderables far-to-near
//! 5. walk the queue issuing state changes and draws to the render system
//!
//! The queue is cleared at the start of step 3, so after a frame it still
//! holds what was drawn.

use std::collections::HashMap;
use std::sync::Arc;

use slotmap::SlotMap;

use crate::core::config::{ApplicationConfig, CameraConfig, RenderQueueConfig};
use crate::foundation::math::{AngleUnit, Mat4, Vec3};
use crate::render::render_queue::{QueueBatch, RenderQueue, RenderQueueGroupId};
use crate::render::render_system::{ClipSpace, RenderSystem, SharedProjectionMaker};
use crate::render::render_target::{Viewport, ViewportRenderer};
use crate::render::renderable::{Renderable, RenderableKey, RenderableSource};
use crate::render::RenderResult;
use crate::scene::camera::{Camera, CameraId};
use crate::scene::node::{NodeGraph, NodeId};
use crate::scene::{SceneError, SceneResult};

/// A renderable placed in the scene
pub struct SceneObject {
    renderable: Box<dyn Renderable>,
    node: Option<NodeId>,
    visible: bool,
    queue_group: RenderQueueGroupId,
    priority: u16,
}

impl std::fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObject")
            .field("material", &self.renderable.material().name)
            .field("node", &self.node)
            .field("visible", &self.visible)
            .field("queue_group", &self.queue_group)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl SceneObject {
    /// The drawable
    pub fn renderable(&self) -> &dyn Renderable {
        self.renderable.as_ref()
    }

    /// Mutable access to the drawable
    pub fn renderable_mut(&mut self) -> &mut dyn Renderable {
        self.renderable.as_mut()
    }

    /// Node the object is attached to; detached objects are never drawn
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Whether the object takes part in culling
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Queue group the object is drawn in
    pub const fn queue_group(&self) -> RenderQueueGroupId {
        self.queue_group
    }

    /// Priority within the queue group
    pub const fn priority(&self) -> u16 {
        self.priority
    }
}

impl RenderableSource for SlotMap<RenderableKey, SceneObject> {
    fn renderable(&self, key: RenderableKey) -> Option<&dyn Renderable> {
        self.get(key).map(SceneObject::renderable)
    }
}

/// Scene Manager
pub struct SceneManager {
    nodes: NodeGraph,
    cameras: SlotMap<CameraId, Camera>,
    camera_names: HashMap<String, CameraId>,
    objects: SlotMap<RenderableKey, SceneObject>,
    queue: RenderQueue,
    projection_maker: SharedProjectionMaker,
    camera_defaults: CameraConfig,
    angle_unit: AngleUnit,
    world_matrices: Vec<Mat4>,
}

impl std::fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneManager")
            .field("nodes", &self.nodes.len())
            .field("cameras", &self.cameras.len())
            .field("objects", &self.objects.len())
            .field("queued", &self.queue.len())
            .field("projection_maker", &self.projection_maker)
            .finish_non_exhaustive()
    }
}

impl SceneManager {
    /// Create a scene manager with default configuration
    pub fn new(clip_space: ClipSpace) -> Self {
        Self::with_config(&ApplicationConfig::default(), Arc::new(clip_space))
    }

    /// Create a scene manager using camera and queue defaults from `config`
    ///
    /// Cameras created by this manager take their perspective matrix from
    /// `projection_maker`.
    pub fn with_config(config: &ApplicationConfig, projection_maker: SharedProjectionMaker) -> Self {
        let RenderQueueConfig { default_group, default_priority } = config.render_queue;
        let mut queue = RenderQueue::new();
        queue.set_default_group(default_group);
        queue.set_default_priority(default_priority);

        Self {
            nodes: NodeGraph::new(),
            cameras: SlotMap::with_key(),
            camera_names: HashMap::new(),
            objects: SlotMap::with_key(),
            queue,
            projection_maker,
            camera_defaults: config.camera.clone(),
            angle_unit: config.engine.angle_unit,
            world_matrices: Vec::new(),
        }
    }

    /// Node graph
    pub const fn nodes(&self) -> &NodeGraph {
        &self.nodes
    }

    /// Mutable node graph
    pub fn nodes_mut(&mut self) -> &mut NodeGraph {
        &mut self.nodes
    }

    /// Render queue as filled by the last [`Self::find_visible_objects`]
    pub const fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Mutable render queue
    pub fn queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.queue
    }

    /// Destroy a node subtree, detaching every object and camera attached to it
    pub fn destroy_node(&mut self, node: NodeId) -> SceneResult<()> {
        let removed = self.nodes.destroy_node(node)?;
        for object in self.objects.values_mut() {
            if object.node.is_some_and(|n| removed.contains(&n)) {
                object.node = None;
            }
        }
        for camera in self.cameras.values_mut() {
            if camera.parent_node().is_some_and(|n| removed.contains(&n)) {
                camera.set_parent_node(None);
            }
            if camera.auto_tracking().is_some_and(|(target, _)| removed.contains(&target)) {
                camera.set_auto_tracking(None);
            }
        }
        Ok(())
    }

    /// Create a camera with the configured defaults
    pub fn create_camera(&mut self, name: impl Into<String>) -> SceneResult<CameraId> {
        let name = name.into();
        if self.camera_names.contains_key(&name) {
            return Err(SceneError::DuplicateName(name));
        }

        let defaults = &self.camera_defaults;
        let mut camera = Camera::with_projection_maker(name.clone(), Arc::clone(&self.projection_maker));
        camera.set_fov_y(defaults.fov_y_radians(self.angle_unit));
        camera.set_near_clip_distance(defaults.near_clip)?;
        camera.set_far_clip_distance(defaults.far_clip);
        camera.set_aspect_ratio(defaults.aspect_ratio);
        camera.set_projection_type(defaults.projection);
        match defaults.fixed_yaw_axis_vec() {
            Some(axis) => camera.set_fixed_yaw_axis(true, axis),
            None => camera.set_fixed_yaw_axis(false, Vec3::y()),
        }

        let id = self.cameras.insert(camera);
        self.camera_names.insert(name.clone(), id);
        log::info!("Created camera '{}'", name);
        Ok(id)
    }

    /// Borrow a camera
    pub fn camera(&self, id: CameraId) -> SceneResult<&Camera> {
        self.cameras.get(id).ok_or(SceneError::CameraNotFound(id))
    }

    /// Mutably borrow a camera
    pub fn camera_mut(&mut self, id: CameraId) -> SceneResult<&mut Camera> {
        self.cameras.get_mut(id).ok_or(SceneError::CameraNotFound(id))
    }

    /// Look a camera up by name
    pub fn find_camera(&self, name: &str) -> Option<CameraId> {
        self.camera_names.get(name).copied()
    }

    /// Destroy a camera
    pub fn destroy_camera(&mut self, id: CameraId) -> SceneResult<Camera> {
        let camera = self.cameras.remove(id).ok_or(SceneError::CameraNotFound(id))?;
        self.camera_names.remove(camera.name());
        Ok(camera)
    }

    /// Attach a camera to a node; `None` detaches it
    pub fn attach_camera(&mut self, id: CameraId, node: Option<NodeId>) -> SceneResult<()> {
        let transform = node.map(|n| self.nodes.derived_transform(n)).transpose()?;
        let camera = self.camera_mut(id)?;
        camera.set_parent_node(node);
        if let Some(transform) = transform {
            camera.sync_parent(transform.position, transform.orientation);
        }
        Ok(())
    }

    /// Make a camera track a node; `None` stops tracking
    pub fn set_camera_auto_tracking(&mut self, id: CameraId, target: Option<(NodeId, Vec3)>) -> SceneResult<()> {
        if let Some((node, _)) = target {
            self.nodes.node(node)?;
        }
        self.camera_mut(id)?.set_auto_tracking(target);
        Ok(())
    }

    /// Add a detached object in the default queue group and priority
    pub fn add_object(&mut self, renderable: Box<dyn Renderable>) -> RenderableKey {
        let key = self.objects.insert(SceneObject {
            renderable,
            node: None,
            visible: true,
            queue_group: self.queue.default_group(),
            priority: self.queue.default_priority(),
        });
        log::trace!("Added scene object {:?}", key);
        key
    }

    /// Borrow an object
    pub fn object(&self, key: RenderableKey) -> SceneResult<&SceneObject> {
        self.objects.get(key).ok_or(SceneError::ObjectNotFound(key))
    }

    /// Mutably borrow an object
    pub fn object_mut(&mut self, key: RenderableKey) -> SceneResult<&mut SceneObject> {
        self.objects.get_mut(key).ok_or(SceneError::ObjectNotFound(key))
    }

    /// Number of objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Attach an object to a node
    pub fn attach_object(&mut self, key: RenderableKey, node: NodeId) -> SceneResult<()> {
        let world = self.nodes.full_transform(node)?;
        let object = self.object_mut(key)?;
        object.node = Some(node);
        object.renderable.notify_world_transform(&world);
        Ok(())
    }

    /// Detach an object from its node
    pub fn detach_object(&mut self, key: RenderableKey) -> SceneResult<()> {
        self.object_mut(key)?.node = None;
        Ok(())
    }

    /// Remove an object from the scene, returning its renderable
    pub fn destroy_object(&mut self, key: RenderableKey) -> SceneResult<Box<dyn Renderable>> {
        self.objects
            .remove(key)
            .map(|object| object.renderable)
            .ok_or(SceneError::ObjectNotFound(key))
    }

    /// Include or exclude an object from rendering
    pub fn set_object_visible(&mut self, key: RenderableKey, visible: bool) -> SceneResult<()> {
        self.object_mut(key)?.visible = visible;
        Ok(())
    }

    /// Move an object to another queue group and priority
    pub fn set_object_queue_group(
        &mut self,
        key: RenderableKey,
        group: RenderQueueGroupId,
        priority: u16,
    ) -> SceneResult<()> {
        let object = self.object_mut(key)?;
        object.queue_group = group;
        object.priority = priority;
        Ok(())
    }

    /// Bring transforms, attached cameras, tracking cameras and object
    /// world matrices up to date
    pub fn update_scene_graph(&mut self) {
        self.nodes.update();

        let Self { nodes, cameras, objects, .. } = self;
        for camera in cameras.values_mut() {
            if let Some(node) = camera.parent_node() {
                match nodes.derived_transform(node) {
                    Ok(transform) => camera.sync_parent(transform.position, transform.orientation),
                    Err(err) => {
                        log::warn!("Camera '{}' detached: {}", camera.name(), err);
                        camera.set_parent_node(None);
                    }
                }
            }
            if let Some((target, _)) = camera.auto_tracking() {
                match nodes.derived_position(target) {
                    Ok(position) => camera.auto_track(position),
                    Err(err) => {
                        log::warn!("Camera '{}' stopped tracking: {}", camera.name(), err);
                        camera.set_auto_tracking(None);
                    }
                }
            }
        }

        for (key, object) in objects.iter_mut() {
            let Some(node) = object.node else {
                continue;
            };
            match nodes.full_transform(node) {
                Ok(world) => object.renderable.notify_world_transform(&world),
                Err(err) => {
                    log::warn!("Object {:?} detached: {}", key, err);
                    object.node = None;
                }
            }
        }
    }

    /// Refill the render queue with objects visible from `camera`
    ///
    /// Only attached, visible objects are considered. Objects without
    /// bounds are never culled. Objects whose node no longer exists are
    /// detached and skipped. Returns the number queued.
    pub fn find_visible_objects(&mut self, camera: CameraId) -> SceneResult<usize> {
        let Self { nodes, cameras, objects, queue, .. } = self;
        let camera = cameras.get(camera).ok_or(SceneError::CameraNotFound(camera))?;
        queue.clear();

        let mut queued = 0;
        for (key, object) in objects.iter_mut() {
            let Some(node) = object.node.filter(|_| object.visible) else {
                continue;
            };
            let world = match nodes.full_transform(node) {
                Ok(world) => world,
                Err(err) => {
                    log::warn!("Object {:?} detached: {}", key, err);
                    object.node = None;
                    continue;
                }
            };
            if let Some(bounds) = object.renderable.local_bounds() {
                let world_bounds = bounds.transformed(&world);
                if let Some(plane) = camera.is_box_visible(&world_bounds).culled_by() {
                    log::trace!("Object {:?} culled by {:?} plane", key, plane);
                    continue;
                }
            }
            queue.add_renderable_to(key, object.renderable.as_ref(), object.queue_group, object.priority);
            queued += 1;
        }
        Ok(queued)
    }

    /// Render the scene from `camera` into `viewport`, returning the face count
    pub fn render_scene(
        &mut self,
        camera_id: CameraId,
        viewport: &Viewport,
        render_system: &mut dyn RenderSystem,
    ) -> SceneResult<usize> {
        self.update_scene_graph();
        let queued = self.find_visible_objects(camera_id)?;

        let Self { cameras, objects, queue, world_matrices, .. } = self;
        let camera = cameras.get(camera_id).ok_or(SceneError::CameraNotFound(camera_id))?;
        queue.sort_transparent_objects(camera, &*objects);

        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        render_system.begin_geometry_count();
        render_system.set_viewport(viewport);
        render_system.begin_frame();
        render_system.set_projection_matrix(&projection);
        render_system.set_view_matrix(&view);
        let camera_detail = camera.detail_level();
        render_system.set_rasterisation_mode(camera_detail);

        let identity = Mat4::identity();
        let mut detail = camera_detail;
        let mut identity_view = false;
        let mut identity_projection = false;
        let mut draw = |key: RenderableKey, render_system: &mut dyn RenderSystem| {
            let Some(renderable) = objects.renderable(key) else {
                log::warn!("Queued object {:?} no longer exists", key);
                return;
            };
            if renderable.use_identity_projection() != identity_projection {
                identity_projection = !identity_projection;
                render_system.set_projection_matrix(if identity_projection { &identity } else { &projection });
            }
            if renderable.use_identity_view() != identity_view {
                identity_view = !identity_view;
                render_system.set_view_matrix(if identity_view { &identity } else { &view });
            }
            let level = renderable.render_detail().min(camera_detail);
            if level != detail {
                detail = level;
                render_system.set_rasterisation_mode(level);
            }
            let expected = renderable.num_world_transforms();
            world_matrices.clear();
            world_matrices.reserve(expected);
            renderable.world_transforms(world_matrices);
            if world_matrices.len() != expected {
                log::warn!(
                    "Object {:?} gave {} world matrices, expected {}",
                    key,
                    world_matrices.len(),
                    expected
                );
            }
            render_system.set_world_matrices(world_matrices);
            render_system.render(&renderable.render_operation());
        };

        queue.visit(|batch| match batch {
            QueueBatch::Opaque { renderables, .. } => {
                if let Some(first) = renderables.first().and_then(|&key| objects.renderable(key)) {
                    render_system.set_material(first.material());
                }
                for &key in renderables {
                    draw(key, &mut *render_system);
                }
            }
            QueueBatch::Transparent { renderables, .. } => {
                for &key in renderables {
                    if let Some(renderable) = objects.renderable(key) {
                        render_system.set_material(renderable.material());
                    }
                    draw(key, &mut *render_system);
                }
            }
        });

        render_system.end_frame();

        let faces = render_system.face_count();
        log::debug!(
            "Rendered '{}': {} queued, {} faces, {} vertices",
            camera.name(),
            queued,
            faces,
            render_system.vertex_count()
        );
        self.camera_mut(camera_id)?.notify_rendered_faces(faces);
        Ok(faces)
    }
}

/// Pairs a scene manager with a render system to render viewports
pub struct SceneRenderer<'a> {
    scene: &'a mut SceneManager,
    render_system: &'a mut dyn RenderSystem,
}

impl<'a> SceneRenderer<'a> {
    /// Borrow a scene and a backend for one target update
    pub fn new(scene: &'a mut SceneManager, render_system: &'a mut dyn RenderSystem) -> Self {
        Self { scene, render_system }
    }
}

impl ViewportRenderer for SceneRenderer<'_> {
    fn render_viewport(&mut self, viewport: &Viewport) -> RenderResult<usize> {
        Ok(self.scene.render_scene(viewport.camera(), viewport, self.render_system)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Aabb, Degree, Radian};
    use crate::render::render_system::ProjectionMaker;
    use crate::render::renderable::{Material, MaterialId, RenderOperation, SimpleRenderable};
    use approx::assert_relative_eq;

    fn cube(material: u32) -> Box<dyn Renderable> {
        let material = Arc::new(Material::new(MaterialId(material), format!("m{material}")));
        let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        Box::new(SimpleRenderable::new(material, RenderOperation::triangles(36), bounds))
    }

    #[test]
    fn test_camera_defaults_from_config() {
        let mut config = ApplicationConfig::default();
        config.camera.fov_y = 90.0;
        config.camera.near_clip = 0.5;
        config.camera.fixed_yaw_axis = None;
        let mut scene = SceneManager::with_config(&config, Arc::new(ClipSpace::ZeroToOne));

        let id = scene.create_camera("main").unwrap();
        let camera = scene.camera(id).unwrap();
        assert_relative_eq!(camera.fov_y().value(), Radian::from(Degree(90.0)).value(), epsilon = 1e-6);
        assert_relative_eq!(camera.near_clip_distance(), 0.5);
        assert_eq!(
            camera.projection_matrix(),
            ClipSpace::ZeroToOne.perspective(camera.fov_y(), camera.aspect_ratio(), 0.5, camera.far_clip_distance())
        );
        assert!(camera.fixed_yaw_axis().is_none());

        assert!(matches!(scene.create_camera("main"), Err(SceneError::DuplicateName(_))));
        assert_eq!(scene.find_camera("main"), Some(id));
        scene.destroy_camera(id).unwrap();
        assert!(scene.find_camera("main").is_none());
        assert!(matches!(scene.camera(id), Err(SceneError::CameraNotFound(_))));
    }

    #[test]
    fn test_culling_fills_queue_with_visible_objects_only() {
        let mut scene = SceneManager::new(ClipSpace::NegativeOneToOne);
        let camera = scene.create_camera("cam").unwrap();
        scene.camera_mut(camera).unwrap().set_near_clip_distance(1.0).unwrap();

        let front = scene.nodes_mut().create_node("front").unwrap();
        let behind = scene.nodes_mut().create_node("behind").unwrap();
        scene.nodes_mut().set_position(front, Vec3::new(0.0, 0.0, -50.0)).unwrap();
        scene.nodes_mut().set_position(behind, Vec3::new(0.0, 0.0, 50.0)).unwrap();

        let visible = scene.add_object(cube(1));
        let culled = scene.add_object(cube(1));
        let detached = scene.add_object(cube(1));
        let hidden = scene.add_object(cube(2));
        scene.attach_object(visible, front).unwrap();
        scene.attach_object(culled, behind).unwrap();
        scene.attach_object(hidden, front).unwrap();
        scene.set_object_visible(hidden, false).unwrap();

        scene.update_scene_graph();
        assert_eq!(scene.find_visible_objects(camera).unwrap(), 1);
        let queued = scene
            .queue()
            .group(RenderQueueGroupId::Main)
            .and_then(|g| g.priority_group(100))
            .and_then(|p| p.material_group(MaterialId(1)))
            .unwrap();
        assert_eq!(queued, &[visible]);
        assert!(scene.object(detached).unwrap().node().is_none());
    }

    #[test]
    fn test_destroy_node_detaches_objects_and_cameras() {
        let mut scene = SceneManager::new(ClipSpace::NegativeOneToOne);
        let rig = scene.nodes_mut().create_node("rig").unwrap();
        let arm = scene.nodes_mut().create_child(rig, "arm").unwrap();
        let camera = scene.create_camera("cam").unwrap();
        let object = scene.add_object(cube(1));

        scene.attach_camera(camera, Some(arm)).unwrap();
        scene.set_camera_auto_tracking(camera, Some((rig, Vec3::zeros()))).unwrap();
        scene.attach_object(object, arm).unwrap();

        scene.destroy_node(rig).unwrap();
        assert!(scene.object(object).unwrap().node().is_none());
        assert!(scene.camera(camera).unwrap().parent_node().is_none());
        assert!(scene.camera(camera).unwrap().auto_tracking().is_none());
        assert!(scene.nodes().is_empty());
    }

    #[test]
    fn test_node_destroyed_behind_scene_manager_detaches_object() {
        let mut scene = SceneManager::new(ClipSpace::NegativeOneToOne);
        let camera = scene.create_camera("cam").unwrap();
        scene.camera_mut(camera).unwrap().set_near_clip_distance(1.0).unwrap();

        let front = scene.nodes_mut().create_node("front").unwrap();
        let doomed = scene.nodes_mut().create_node("doomed").unwrap();
        scene.nodes_mut().set_position(front, Vec3::new(0.0, 0.0, -50.0)).unwrap();
        scene.nodes_mut().set_position(doomed, Vec3::new(0.0, 0.0, -50.0)).unwrap();

        let survivor = scene.add_object(cube(1));
        let orphan = scene.add_object(cube(1));
        scene.attach_object(survivor, front).unwrap();
        scene.attach_object(orphan, doomed).unwrap();

        scene.nodes_mut().destroy_node(doomed).unwrap();
        assert_eq!(scene.find_visible_objects(camera).unwrap(), 1);
        assert_eq!(scene.queue().len(), 1);
        assert!(scene.object(orphan).unwrap().node().is_none());
        assert_eq!(scene.object(survivor).unwrap().node(), Some(front));

        scene.nodes_mut().destroy_node(front).unwrap();
        scene.update_scene_graph();
        assert!(scene.object(survivor).unwrap().node().is_none());
        assert_eq!(scene.find_visible_objects(camera).unwrap(), 0);
        assert!(scene.queue().is_empty());
    }

    #[test]
    fn test_cameras_use_the_shared_projection_maker() {
        #[derive(Debug)]
        struct Scaled;

        impl ProjectionMaker for Scaled {
            fn make_projection_matrix(&self, _fov_y: Radian, _aspect: f32, _near: f32, _far: f32) -> Mat4 {
                Mat4::identity() * 7.0
            }
        }

        let mut scene = SceneManager::with_config(&ApplicationConfig::default(), Arc::new(Scaled));
        let id = scene.create_camera("main").unwrap();
        assert_relative_eq!(scene.camera(id).unwrap().projection_matrix()[(0, 0)], 7.0);
    }

    #[test]
    fn test_attached_camera_moves_with_node() {
        let mut scene = SceneManager::new(ClipSpace::NegativeOneToOne);
        let rig = scene.nodes_mut().create_node("rig").unwrap();
        let camera = scene.create_camera("cam").unwrap();
        scene.camera_mut(camera).unwrap().set_position(Vec3::new(0.0, 2.0, 0.0));
        scene.attach_camera(camera, Some(rig)).unwrap();

        scene.nodes_mut().set_position(rig, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        scene.update_scene_graph();
        assert_relative_eq!(
            scene.camera(camera).unwrap().derived_position(),
            Vec3::new(10.0, 2.0, 0.0),
            epsilon = 1e-5
        );

        scene.attach_camera(camera, None).unwrap();
        assert_relative_eq!(
            scene.camera(camera).unwrap().derived_position(),
            Vec3::new(0.0, 2.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_unknown_handles_are_errors() {
        let mut scene = SceneManager::new(ClipSpace::NegativeOneToOne);
        let object = scene.add_object(cube(1));
        scene.destroy_object(object).unwrap();
        assert!(matches!(scene.set_object_visible(object, true), Err(SceneError::ObjectNotFound(_))));
        assert!(matches!(scene.destroy_object(object), Err(SceneError::ObjectNotFound(_))));
        assert_eq!(scene.object_count(), 0);
    }
}
