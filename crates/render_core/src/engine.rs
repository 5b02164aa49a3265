//! Engine root
//!
//! [`Root`] owns the active render system, the scene manager and every
//! render target, and steps frames: notify frame listeners, update targets in
//! priority order, notify again.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::core::config::ApplicationConfig;
use crate::foundation::{logging, time::FrameTimer};
use crate::render::{RenderError, RenderSystem, RenderSystemRegistry, RenderTarget};
use crate::scene::{SceneError, SceneManager, SceneRenderer};

/// Timing passed to frame listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEvent {
    /// Length of the frame being rendered
    pub time_since_last_frame: Duration,
    /// Sum of all frame times since the root was created
    pub total_time: Duration,
}

/// Callbacks around each frame
///
/// Returning `false` from either callback stops the render loop.
pub trait FrameListener {
    /// Before any render target is updated
    fn frame_started(&mut self, _event: &FrameEvent) -> bool {
        true
    }

    /// After every render target was updated
    fn frame_ended(&mut self, _event: &FrameEvent) -> bool {
        true
    }
}

/// Handle returned by [`Root::add_frame_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameListenerId(u64);

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rendering error
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    /// Scene error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Composition root
pub struct Root {
    config: ApplicationConfig,
    render_system: Box<dyn RenderSystem>,
    scene_manager: SceneManager,
    render_targets: BTreeMap<String, RenderTarget>,
    frame_listeners: Vec<(FrameListenerId, Box<dyn FrameListener>)>,
    next_listener: u64,
    timer: FrameTimer,
    total_time: Duration,
    frame_count: u64,
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root")
            .field("render_system", &self.render_system.name())
            .field("scene_manager", &self.scene_manager)
            .field("render_targets", &self.render_targets.keys().collect::<Vec<_>>())
            .field("frame_listeners", &self.frame_listeners.len())
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Root {
    /// Validate `config`, set up logging and create the configured render
    /// system from `registry`
    pub fn new(config: ApplicationConfig, registry: &RenderSystemRegistry) -> EngineResult<Self> {
        config.validate()?;
        logging::init_with_level(&config.engine.log_level);

        log::info!("Initializing root with render system '{}'", config.engine.render_system);
        let render_system = registry.create(&config.engine.render_system)?;
        let scene_manager = SceneManager::with_config(&config, render_system.projection_maker());

        Ok(Self {
            config,
            render_system,
            scene_manager,
            render_targets: BTreeMap::new(),
            frame_listeners: Vec::new(),
            next_listener: 0,
            timer: FrameTimer::new(),
            total_time: Duration::ZERO,
            frame_count: 0,
        })
    }

    /// Configuration the root was created with
    pub const fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Active render system
    pub fn render_system(&self) -> &dyn RenderSystem {
        self.render_system.as_ref()
    }

    /// Mutable access to the active render system
    pub fn render_system_mut(&mut self) -> &mut dyn RenderSystem {
        self.render_system.as_mut()
    }

    /// Scene manager
    pub const fn scene_manager(&self) -> &SceneManager {
        &self.scene_manager
    }

    /// Mutable access to the scene manager
    pub fn scene_manager_mut(&mut self) -> &mut SceneManager {
        &mut self.scene_manager
    }

    /// Create a target with default colour depth and priority
    pub fn create_render_target(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> EngineResult<&mut RenderTarget> {
        self.attach_render_target(RenderTarget::new(name, width, height))
    }

    /// Take ownership of a target; names are unique
    pub fn attach_render_target(&mut self, target: RenderTarget) -> EngineResult<&mut RenderTarget> {
        let name = target.name().to_string();
        if self.render_targets.contains_key(&name) {
            return Err(RenderError::DuplicateTarget(name).into());
        }
        log::debug!("Attaching render target '{}' ({}x{})", name, target.width(), target.height());
        Ok(self.render_targets.entry(name).or_insert(target))
    }

    /// Look up a target by name
    pub fn render_target(&self, name: &str) -> EngineResult<&RenderTarget> {
        self.render_targets
            .get(name)
            .ok_or_else(|| RenderError::TargetNotFound(name.to_string()).into())
    }

    /// Mutable lookup by name
    pub fn render_target_mut(&mut self, name: &str) -> EngineResult<&mut RenderTarget> {
        self.render_targets
            .get_mut(name)
            .ok_or_else(|| RenderError::TargetNotFound(name.to_string()).into())
    }

    /// Remove a target and hand it back
    pub fn detach_render_target(&mut self, name: &str) -> EngineResult<RenderTarget> {
        self.render_targets
            .remove(name)
            .ok_or_else(|| RenderError::TargetNotFound(name.to_string()).into())
    }

    /// Target names in update order: ascending priority, then name
    pub fn render_target_order(&self) -> Vec<&str> {
        let mut targets: Vec<&RenderTarget> = self.render_targets.values().collect();
        targets.sort_by_key(|target| target.priority());
        targets.into_iter().map(RenderTarget::name).collect()
    }

    /// Register a listener; callbacks fire in registration order
    pub fn add_frame_listener(&mut self, listener: Box<dyn FrameListener>) -> FrameListenerId {
        let id = FrameListenerId(self.next_listener);
        self.next_listener += 1;
        self.frame_listeners.push((id, listener));
        id
    }

    /// Unregister a listener, returning it
    pub fn remove_frame_listener(&mut self, id: FrameListenerId) -> Option<Box<dyn FrameListener>> {
        let index = self.frame_listeners.iter().position(|(listener_id, _)| *listener_id == id)?;
        Some(self.frame_listeners.remove(index).1)
    }

    /// Frames fully rendered so far
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Render one frame timed by the wall clock
    ///
    /// Returns `false` when a frame listener asked to stop.
    pub fn render_one_frame(&mut self) -> EngineResult<bool> {
        let frame_time = self.timer.tick();
        self.render_one_frame_with_delta(frame_time)
    }

    /// Render one frame of length `frame_time`
    ///
    /// When a listener vetoes `frame_started` no target is updated and
    /// `frame_ended` is not fired.
    pub fn render_one_frame_with_delta(&mut self, frame_time: Duration) -> EngineResult<bool> {
        self.total_time += frame_time;
        let event = FrameEvent {
            time_since_last_frame: frame_time,
            total_time: self.total_time,
        };

        if !self.fire_frame_started(&event) {
            log::debug!("Frame listener stopped rendering before frame {}", self.frame_count);
            return Ok(false);
        }

        self.update_all_render_targets(frame_time)?;
        self.frame_count += 1;

        Ok(self.fire_frame_ended(&event))
    }

    /// Render frames until a listener returns `false`, returning how many
    /// frames were rendered
    pub fn start_rendering(&mut self) -> EngineResult<u64> {
        log::info!("Starting render loop");
        self.timer.reset();
        let start = self.frame_count;
        while self.render_one_frame()? {}
        let rendered = self.frame_count - start;
        log::info!("Render loop finished after {} frames", rendered);
        Ok(rendered)
    }

    fn update_all_render_targets(&mut self, frame_time: Duration) -> EngineResult<()> {
        let Self { render_system, scene_manager, render_targets, .. } = self;

        let mut targets: Vec<&mut RenderTarget> = render_targets.values_mut().collect();
        targets.sort_by_key(|target| target.priority());

        let mut renderer = SceneRenderer::new(scene_manager, render_system.as_mut());
        for target in targets {
            target.update_with_delta(&mut renderer, frame_time)?;
        }
        Ok(())
    }

    fn fire_frame_started(&mut self, event: &FrameEvent) -> bool {
        self.frame_listeners
            .iter_mut()
            .all(|(_, listener)| listener.frame_started(event))
    }

    fn fire_frame_ended(&mut self, event: &FrameEvent) -> bool {
        self.frame_listeners
            .iter_mut()
            .all(|(_, listener)| listener.frame_ended(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Aabb, Mat4, Radian, Vec3};
    use crate::render::render_system::ProjectionMaker;
    use approx::assert_relative_eq;
    use crate::render::{
        Material, MaterialId, RecordingRenderSystem, RenderCommand, RenderOperation, SimpleRenderable,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn root() -> Root {
        let mut config = ApplicationConfig::default();
        config.engine.log_level = "warn".to_string();
        config.camera.near_clip = 1.0;
        config.camera.far_clip = 1000.0;
        Root::new(config, &RenderSystemRegistry::with_defaults()).unwrap()
    }

    fn recorder(root: &Root) -> &RecordingRenderSystem {
        root.render_system().as_any().downcast_ref::<RecordingRenderSystem>().unwrap()
    }

    struct CountingListener {
        log: Rc<RefCell<Vec<String>>>,
        stop_after: u32,
        frames: u32,
    }

    impl FrameListener for CountingListener {
        fn frame_started(&mut self, event: &FrameEvent) -> bool {
            self.log.borrow_mut().push(format!("start {}ms", event.time_since_last_frame.as_millis()));
            true
        }

        fn frame_ended(&mut self, _event: &FrameEvent) -> bool {
            self.frames += 1;
            self.log.borrow_mut().push("end".to_string());
            self.frames < self.stop_after
        }
    }

    struct Veto;

    impl FrameListener for Veto {
        fn frame_started(&mut self, _event: &FrameEvent) -> bool {
            false
        }
    }

    #[test]
    fn test_unknown_render_system() {
        let config = ApplicationConfig::new("vulkan");
        let err = Root::new(config, &RenderSystemRegistry::with_defaults()).unwrap_err();
        match err {
            EngineError::Render(RenderError::UnknownRenderSystem { name, available }) => {
                assert_eq!(name, "vulkan");
                assert_eq!(available, vec![RecordingRenderSystem::NAME.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cameras_use_backend_projection() {
        #[derive(Debug)]
        struct Scaled;

        impl ProjectionMaker for Scaled {
            fn make_projection_matrix(&self, _fov_y: Radian, _aspect: f32, _near: f32, _far: f32) -> Mat4 {
                Mat4::identity() * 7.0
            }
        }

        let mut registry = RenderSystemRegistry::with_defaults();
        registry.register("scaled", || Box::new(RecordingRenderSystem::new().with_projection_maker(Arc::new(Scaled))));
        let mut config = ApplicationConfig::new("scaled");
        config.engine.log_level = "warn".to_string();
        let mut root = Root::new(config, &registry).unwrap();

        let camera = root.scene_manager_mut().create_camera("main").unwrap();
        let projection = root.scene_manager().camera(camera).unwrap().projection_matrix();
        assert_relative_eq!(projection[(0, 0)], 7.0);
        assert_relative_eq!(projection[(3, 3)], 7.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ApplicationConfig::default();
        config.camera.near_clip = 0.0;
        assert!(matches!(
            Root::new(config, &RenderSystemRegistry::with_defaults()),
            Err(EngineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_render_target_lifecycle() {
        let mut root = root();
        root.create_render_target("window", 640, 480).unwrap();
        assert!(matches!(
            root.create_render_target("window", 10, 10),
            Err(EngineError::Render(RenderError::DuplicateTarget(_)))
        ));

        root.attach_render_target(RenderTarget::new("shadow", 256, 256).with_priority(0)).unwrap();
        root.attach_render_target(RenderTarget::new("hud", 640, 480).with_priority(200)).unwrap();
        root.render_target_mut("window").unwrap().set_debug_text("main");
        assert_eq!(root.render_target_order(), vec!["shadow", "window", "hud"]);

        let detached = root.detach_render_target("shadow").unwrap();
        assert_eq!(detached.width(), 256);
        assert!(matches!(
            root.render_target("shadow"),
            Err(EngineError::Render(RenderError::TargetNotFound(_)))
        ));
        assert_eq!(root.render_target("window").unwrap().debug_text(), "main");
    }

    #[test]
    fn test_frame_renders_scene_and_fires_listeners() {
        let mut root = root();
        let scene = root.scene_manager_mut();
        let camera = scene.create_camera("main").unwrap();
        let node = scene.nodes_mut().create_node("cube").unwrap();
        scene.nodes_mut().set_position(node, Vec3::new(0.0, 0.0, -10.0)).unwrap();
        let material = Arc::new(Material::new(MaterialId(1), "cube"));
        let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let cube = scene.add_object(Box::new(SimpleRenderable::new(material, RenderOperation::triangles(36), bounds)));
        scene.attach_object(cube, node).unwrap();

        root.create_render_target("window", 800, 600)
            .unwrap()
            .add_viewport(camera, 0, 0.0, 0.0, 1.0, 1.0)
            .unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        root.add_frame_listener(Box::new(CountingListener { log: Rc::clone(&log), stop_after: 2, frames: 0 }));

        assert!(root.render_one_frame_with_delta(Duration::from_millis(10)).unwrap());
        assert!(!root.render_one_frame_with_delta(Duration::from_millis(20)).unwrap());

        assert_eq!(*log.borrow(), vec!["start 10ms", "end", "start 20ms", "end"]);
        assert_eq!(root.frame_count(), 2);
        assert_eq!(root.render_target("window").unwrap().triangle_count(), 12);
        let frames = recorder(&root).commands().iter().filter(|c| **c == RenderCommand::BeginFrame).count();
        assert_eq!(frames, 2);
    }

    #[test]
    fn test_vetoed_frame_skips_targets() {
        let mut root = root();
        let camera = root.scene_manager_mut().create_camera("main").unwrap();
        root.create_render_target("window", 100, 100)
            .unwrap()
            .add_viewport(camera, 0, 0.0, 0.0, 1.0, 1.0)
            .unwrap();

        let veto = root.add_frame_listener(Box::new(Veto));
        assert!(!root.render_one_frame_with_delta(Duration::from_millis(16)).unwrap());
        assert_eq!(root.frame_count(), 0);
        assert!(recorder(&root).commands().is_empty());

        assert!(root.remove_frame_listener(veto).is_some());
        assert!(root.remove_frame_listener(veto).is_none());
        assert!(root.render_one_frame_with_delta(Duration::from_millis(16)).unwrap());
        assert_eq!(root.frame_count(), 1);
    }

    #[test]
    fn test_start_rendering_runs_until_listener_stops() {
        let mut root = root();
        let log = Rc::new(RefCell::new(Vec::new()));
        root.add_frame_listener(Box::new(CountingListener { log: Rc::clone(&log), stop_after: 3, frames: 0 }));

        assert_eq!(root.start_rendering().unwrap(), 3);
        assert_eq!(log.borrow().iter().filter(|entry| *entry == "end").count(), 3);
    }

    #[test]
    fn test_missing_camera_surfaces_as_error() {
        let mut root = root();
        let camera = root.scene_manager_mut().create_camera("doomed").unwrap();
        root.create_render_target("window", 100, 100)
            .unwrap()
            .add_viewport(camera, 0, 0.0, 0.0, 1.0, 1.0)
            .unwrap();
        root.scene_manager_mut().destroy_camera(camera).unwrap();

        assert!(matches!(
            root.render_one_frame_with_delta(Duration::from_millis(16)),
            Err(EngineError::Render(RenderError::Scene(SceneError::CameraNotFound(_))))
        ));
    }
}
