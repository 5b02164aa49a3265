//! Frame pipeline integration tests
//!
//! Builds small scenes, renders them through a render target into the
//! recording backend and checks what reached the backend, and in which order.

use std::sync::Arc;
use std::time::Duration;

use crate::foundation::math::{Aabb, Degree, Mat4, Vec3};
use crate::render::render_queue::RenderQueueGroupId;
use crate::render::render_system::{ClipSpace, RecordingRenderSystem, RenderCommand};
use crate::render::render_target::RenderTarget;
use crate::render::renderable::{
    Material, MaterialId, RenderOperation, Renderable, RenderableKey, SceneBlendType, SimpleRenderable,
};
use crate::scene::camera::{Camera, CameraId, SceneDetailLevel};
use crate::scene::scene_manager::{SceneManager, SceneRenderer};
use approx::assert_relative_eq;

const GLASS: MaterialId = MaterialId(99);

fn material(id: u32) -> Arc<Material> {
    Arc::new(Material::new(MaterialId(id), format!("opaque_{id}")))
}

fn glass() -> Arc<Material> {
    Arc::new(Material::new(GLASS, "glass").with_scene_blend(SceneBlendType::TransparentAlpha))
}

fn unit_box() -> Aabb {
    Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))
}

/// Camera at the origin looking down -Z: 90 degree fov, near 1, far 1000, square
fn scene_with_camera() -> (SceneManager, CameraId) {
    let mut scene = SceneManager::new(ClipSpace::NegativeOneToOne);
    let camera = scene.create_camera("main").unwrap();
    let cam = scene.camera_mut(camera).unwrap();
    cam.set_fov_y(Degree(90.0).into());
    cam.set_near_clip_distance(1.0).unwrap();
    cam.set_far_clip_distance(1000.0);
    cam.set_aspect_ratio(1.0);
    (scene, camera)
}

fn place(scene: &mut SceneManager, name: &str, position: Vec3, material: Arc<Material>) -> RenderableKey {
    let node = scene.nodes_mut().create_node(name).unwrap();
    scene.nodes_mut().set_position(node, position).unwrap();
    let key = scene.add_object(Box::new(SimpleRenderable::new(material, RenderOperation::triangles(36), unit_box())));
    scene.attach_object(key, node).unwrap();
    key
}

fn target_with_viewport(camera: CameraId) -> RenderTarget {
    let mut target = RenderTarget::new("window", 100, 100);
    target.add_viewport(camera, 0, 0.0, 0.0, 1.0, 1.0).unwrap();
    target
}

/// Z translation of each world matrix set, in order
fn drawn_depths(commands: &[RenderCommand]) -> Vec<f32> {
    commands
        .iter()
        .filter_map(|command| match command {
            RenderCommand::SetWorldMatrices(matrices) => matrices.first().map(|m| m[(2, 3)]),
            _ => None,
        })
        .collect()
}

#[test]
fn test_frame_draw_order() {
    let (mut scene, camera) = scene_with_camera();
    place(&mut scene, "a1", Vec3::new(0.0, 0.0, -10.0), material(1));
    place(&mut scene, "b", Vec3::new(2.0, 0.0, -15.0), material(2));
    place(&mut scene, "a2", Vec3::new(-2.0, 0.0, -20.0), material(1));
    place(&mut scene, "glass_near", Vec3::new(0.0, 0.0, -5.0), glass());
    place(&mut scene, "glass_far", Vec3::new(0.0, 0.0, -30.0), glass());
    place(&mut scene, "behind", Vec3::new(0.0, 0.0, 10.0), material(1));
    let hud = place(&mut scene, "hud", Vec3::new(0.0, 0.0, -3.0), material(3));
    scene.set_object_queue_group(hud, RenderQueueGroupId::Overlay, 100).unwrap();

    let mut backend = RecordingRenderSystem::new();
    let mut target = target_with_viewport(camera);
    target
        .update_with_delta(&mut SceneRenderer::new(&mut scene, &mut backend), Duration::from_millis(20))
        .unwrap();

    let commands = backend.commands();
    assert_eq!(commands[0], RenderCommand::SetViewport { z_order: 0, rect: (0, 0, 100, 100) });
    assert_eq!(commands[1], RenderCommand::BeginFrame);
    assert_eq!(commands.last(), Some(&RenderCommand::EndFrame));

    // Opaque buckets (any order) before transparents, transparents one bind each, overlay last
    let materials = backend.material_sequence();
    assert_eq!(materials.len(), 5);
    let mut opaque = materials[..2].to_vec();
    opaque.sort();
    assert_eq!(opaque, vec![MaterialId(1), MaterialId(2)]);
    assert_eq!(&materials[2..], &[GLASS, GLASS, MaterialId(3)]);

    // Transparents far to near, then the overlay
    let depths = drawn_depths(commands);
    assert_eq!(depths.len(), 6);
    assert_relative_eq!(depths[3], -30.0);
    assert_relative_eq!(depths[4], -5.0);
    assert_relative_eq!(depths[5], -3.0);

    // 6 visible cubes of 12 triangles
    assert_eq!(target.triangle_count(), 72);
    assert_eq!(scene.camera(camera).unwrap().rendered_faces(), 72);
    assert_relative_eq!(target.stats().last_fps, 50.0, epsilon = 1e-3);
}

#[test]
fn test_queue_reused_across_frames() {
    let (mut scene, camera) = scene_with_camera();
    let mover = place(&mut scene, "mover", Vec3::new(0.0, 0.0, -10.0), material(1));
    place(&mut scene, "static", Vec3::new(0.0, 0.0, -12.0), material(1));

    let mut backend = RecordingRenderSystem::new();
    let mut target = target_with_viewport(camera);
    target
        .update_with_delta(&mut SceneRenderer::new(&mut scene, &mut backend), Duration::from_millis(16))
        .unwrap();
    assert_eq!(scene.queue().len(), 2);
    assert_eq!(target.triangle_count(), 24);

    // Move behind the camera: culled next frame, bucket kept
    let node = scene.object(mover).unwrap().node().unwrap();
    scene.nodes_mut().set_position(node, Vec3::new(0.0, 0.0, 10.0)).unwrap();
    target
        .update_with_delta(&mut SceneRenderer::new(&mut scene, &mut backend), Duration::from_millis(16))
        .unwrap();

    assert_eq!(scene.queue().len(), 1);
    assert_eq!(target.triangle_count(), 12);
    let priority_group = scene
        .queue()
        .group(RenderQueueGroupId::Main)
        .and_then(|group| group.priority_group(100))
        .unwrap();
    assert_eq!(priority_group.material_bucket_count(), 1);
}

#[test]
fn test_camera_on_moving_rig_culls_from_new_pose() {
    let (mut scene, camera) = scene_with_camera();
    place(&mut scene, "ahead", Vec3::new(0.0, 0.0, -10.0), material(1));

    let rig = scene.nodes_mut().create_node("rig").unwrap();
    scene.attach_camera(camera, Some(rig)).unwrap();

    scene.update_scene_graph();
    assert_eq!(scene.find_visible_objects(camera).unwrap(), 1);

    // Step past the object; it is now behind the camera
    scene.nodes_mut().set_position(rig, Vec3::new(0.0, 0.0, -20.0)).unwrap();
    scene.update_scene_graph();
    assert_eq!(scene.find_visible_objects(camera).unwrap(), 0);
    assert_relative_eq!(
        scene.camera(camera).unwrap().derived_position(),
        Vec3::new(0.0, 0.0, -20.0),
        epsilon = 1e-5
    );
}

#[test]
fn test_auto_tracking_camera_follows_target() {
    let (mut scene, camera) = scene_with_camera();
    let target_key = place(&mut scene, "target", Vec3::new(0.0, 0.0, -10.0), material(1));
    let target_node = scene.object(target_key).unwrap().node().unwrap();
    scene.set_camera_auto_tracking(camera, Some((target_node, Vec3::zeros()))).unwrap();

    scene.nodes_mut().set_position(target_node, Vec3::new(10.0, 0.0, 0.0)).unwrap();
    scene.update_scene_graph();

    assert_relative_eq!(
        scene.camera(camera).unwrap().derived_direction(),
        Vec3::new(1.0, 0.0, 0.0),
        epsilon = 1e-5
    );
    assert_eq!(scene.find_visible_objects(camera).unwrap(), 1);
}

struct ScreenQuad {
    material: Material,
}

impl Renderable for ScreenQuad {
    fn material(&self) -> &Material {
        &self.material
    }

    fn render_operation(&self) -> RenderOperation {
        RenderOperation::triangles(6)
    }

    fn world_transforms(&self, out: &mut Vec<Mat4>) {
        out.push(Mat4::identity());
    }

    fn squared_view_depth(&self, _camera: &Camera) -> f32 {
        0.0
    }

    fn use_identity_projection(&self) -> bool {
        true
    }

    fn use_identity_view(&self) -> bool {
        true
    }
}

#[test]
fn test_screen_space_renderable_gets_identity_matrices() {
    let (mut scene, camera) = scene_with_camera();
    let node = scene.nodes_mut().create_node("hud").unwrap();
    let quad = scene.add_object(Box::new(ScreenQuad { material: Material::new(MaterialId(5), "hud") }));
    scene.attach_object(quad, node).unwrap();

    let mut backend = RecordingRenderSystem::new();
    let mut target = target_with_viewport(camera);
    target.update(&mut SceneRenderer::new(&mut scene, &mut backend)).unwrap();

    let commands = backend.commands();
    let render_at = commands.iter().position(|c| matches!(c, RenderCommand::Render(_))).unwrap();
    assert!(commands[..render_at].contains(&RenderCommand::SetProjectionMatrix(Mat4::identity())));
    assert!(commands[..render_at].contains(&RenderCommand::SetViewMatrix(Mat4::identity())));
    assert_eq!(target.triangle_count(), 2);
}

#[test]
fn test_object_detail_is_capped_by_camera_detail() {
    let (mut scene, camera) = scene_with_camera();
    let node = scene.nodes_mut().create_node("lattice").unwrap();
    scene.nodes_mut().set_position(node, Vec3::new(0.0, 0.0, -10.0)).unwrap();
    let lattice = SimpleRenderable::new(material(1), RenderOperation::triangles(36), unit_box())
        .with_render_detail(SceneDetailLevel::Wireframe);
    let key = scene.add_object(Box::new(lattice));
    scene.attach_object(key, node).unwrap();

    let mut backend = RecordingRenderSystem::new();
    let mut target = target_with_viewport(camera);
    target.update(&mut SceneRenderer::new(&mut scene, &mut backend)).unwrap();

    let commands = backend.take_commands();
    let camera_mode = commands
        .iter()
        .position(|c| *c == RenderCommand::SetRasterisationMode(SceneDetailLevel::Solid))
        .unwrap();
    let object_mode = commands
        .iter()
        .position(|c| *c == RenderCommand::SetRasterisationMode(SceneDetailLevel::Wireframe))
        .unwrap();
    let render_at = commands.iter().position(|c| matches!(c, RenderCommand::Render(_))).unwrap();
    assert!(camera_mode < object_mode && object_mode < render_at);

    scene.camera_mut(camera).unwrap().set_detail_level(SceneDetailLevel::Points);
    target.update(&mut SceneRenderer::new(&mut scene, &mut backend)).unwrap();
    let modes: Vec<_> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            RenderCommand::SetRasterisationMode(level) => Some(*level),
            _ => None,
        })
        .collect();
    assert_eq!(modes, vec![SceneDetailLevel::Points]);
}

struct Skinned {
    material: Material,
    bones: usize,
}

impl Renderable for Skinned {
    fn material(&self) -> &Material {
        &self.material
    }

    fn render_operation(&self) -> RenderOperation {
        RenderOperation::triangles(3)
    }

    fn world_transforms(&self, out: &mut Vec<Mat4>) {
        out.extend((0..self.bones).map(|i| Mat4::new_translation(&Vec3::new(i as f32, 0.0, 0.0))));
    }

    fn num_world_transforms(&self) -> usize {
        self.bones
    }

    fn squared_view_depth(&self, _camera: &Camera) -> f32 {
        0.0
    }
}

#[test]
fn test_blended_renderable_sends_every_world_matrix() {
    let (mut scene, camera) = scene_with_camera();
    let node = scene.nodes_mut().create_node("body").unwrap();
    let body = scene.add_object(Box::new(Skinned { material: Material::new(MaterialId(8), "skin"), bones: 3 }));
    scene.attach_object(body, node).unwrap();

    let mut backend = RecordingRenderSystem::new();
    let mut target = target_with_viewport(camera);
    target.update(&mut SceneRenderer::new(&mut scene, &mut backend)).unwrap();

    let sets: Vec<_> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            RenderCommand::SetWorldMatrices(matrices) => Some(matrices.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 3);
    assert_relative_eq!(sets[0][2][(0, 3)], 2.0);
}
