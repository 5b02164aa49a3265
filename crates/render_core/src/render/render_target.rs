//! Render targets and viewports
//!
//! A [`RenderTarget`] is a surface with one or more [`Viewport`]s, each bound
//! to a camera. Updating a target renders its viewports in ascending z-order
//! through a [`ViewportRenderer`], notifies listeners and records frame
//! statistics.
//!
//! Listeners must not change the target's viewports from inside a callback;
//! the callbacks only receive shared references.

use std::time::Duration;

use bitflags::bitflags;

use crate::foundation::time::FrameTimer;
use crate::render::{RenderError, RenderResult};
use crate::scene::camera::CameraId;

/// A rectangle of a render target showing one camera
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    camera: CameraId,
    z_order: i32,
    rel_left: f32,
    rel_top: f32,
    rel_width: f32,
    rel_height: f32,
    act_left: i32,
    act_top: i32,
    act_width: i32,
    act_height: i32,
    background_colour: [f32; 4],
    clear_every_frame: bool,
}

impl Viewport {
    /// Create a viewport from a relative rectangle on a target of the given size
    pub fn new(
        camera: CameraId,
        z_order: i32,
        rect: (f32, f32, f32, f32),
        target_width: u32,
        target_height: u32,
    ) -> Self {
        let (left, top, width, height) = rect;
        let mut viewport = Self {
            camera,
            z_order,
            rel_left: left,
            rel_top: top,
            rel_width: width,
            rel_height: height,
            act_left: 0,
            act_top: 0,
            act_width: 0,
            act_height: 0,
            background_colour: [0.0, 0.0, 0.0, 1.0],
            clear_every_frame: true,
        };
        viewport.update_dimensions(target_width, target_height);
        viewport
    }

    /// Recompute the pixel rectangle for a target size
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn update_dimensions(&mut self, target_width: u32, target_height: u32) {
        let (w, h) = (target_width as f32, target_height as f32);
        self.act_left = (self.rel_left * w).round() as i32;
        self.act_top = (self.rel_top * h).round() as i32;
        self.act_width = (self.rel_width * w).round() as i32;
        self.act_height = (self.rel_height * h).round() as i32;
        log::trace!(
            "Viewport z={} resized to {}x{} at ({}, {})",
            self.z_order,
            self.act_width,
            self.act_height,
            self.act_left,
            self.act_top
        );
    }

    /// Camera rendered into this viewport
    pub const fn camera(&self) -> CameraId {
        self.camera
    }

    /// Change the camera
    pub fn set_camera(&mut self, camera: CameraId) {
        self.camera = camera;
    }

    /// Stacking order; higher is on top
    pub const fn z_order(&self) -> i32 {
        self.z_order
    }

    /// Relative rectangle `(left, top, width, height)` in 0..1
    pub const fn relative_rect(&self) -> (f32, f32, f32, f32) {
        (self.rel_left, self.rel_top, self.rel_width, self.rel_height)
    }

    /// Pixel rectangle `(left, top, width, height)`
    pub const fn actual_rect(&self) -> (i32, i32, i32, i32) {
        (self.act_left, self.act_top, self.act_width, self.act_height)
    }

    /// Width / height in pixels, 1.0 for an empty viewport
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        if self.act_height == 0 {
            1.0
        } else {
            self.act_width as f32 / self.act_height as f32
        }
    }

    /// Clear colour
    pub const fn background_colour(&self) -> [f32; 4] {
        self.background_colour
    }

    /// Set the clear colour
    pub fn set_background_colour(&mut self, colour: [f32; 4]) {
        self.background_colour = colour;
    }

    /// Whether the viewport is cleared before rendering
    pub const fn clear_every_frame(&self) -> bool {
        self.clear_every_frame
    }

    /// Enable or disable clearing
    pub fn set_clear_every_frame(&mut self, clear: bool) {
        self.clear_every_frame = clear;
    }
}

/// Renders the scene for one viewport, returning the triangle count
pub trait ViewportRenderer {
    /// Render `viewport` and report the number of triangles drawn
    fn render_viewport(&mut self, viewport: &Viewport) -> RenderResult<usize>;
}

/// Callbacks around target and viewport updates; all default to no-ops
pub trait RenderTargetListener {
    /// Before any viewport of `target` is rendered
    fn pre_render_target_update(&mut self, _target: &str) {}

    /// After all viewports of `target` were rendered and stats recorded
    fn post_render_target_update(&mut self, _target: &str, _stats: &FrameStats) {}

    /// Before one viewport is rendered
    fn pre_viewport_update(&mut self, _viewport: &Viewport) {}

    /// After one viewport is rendered
    fn post_viewport_update(&mut self, _viewport: &Viewport) {}
}

/// Handle returned by [`RenderTarget::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

bitflags! {
    /// Which statistics [`FrameStats::summary`] reports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatFlags: u32 {
        /// FPS of the last frame
        const FPS = 1 << 0;
        /// Average FPS
        const AVG_FPS = 1 << 1;
        /// Best FPS
        const BEST_FPS = 1 << 2;
        /// Worst FPS
        const WORST_FPS = 1 << 3;
        /// Triangles drawn last frame
        const TRIANGLE_COUNT = 1 << 4;
        /// Everything
        const ALL = Self::FPS.bits()
            | Self::AVG_FPS.bits()
            | Self::BEST_FPS.bits()
            | Self::WORST_FPS.bits()
            | Self::TRIANGLE_COUNT.bits();
    }
}

/// Frame-rate and geometry statistics of a render target
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    /// FPS of the last frame
    pub last_fps: f32,
    /// Frames divided by total time since the last reset
    pub avg_fps: f32,
    /// Highest FPS seen
    pub best_fps: f32,
    /// Lowest FPS seen
    pub worst_fps: f32,
    /// Shortest frame
    pub best_frame_time: Duration,
    /// Longest frame
    pub worst_frame_time: Duration,
    /// Triangles drawn in the last update
    pub triangle_count: usize,
    frame_count: u64,
    total_time: Duration,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            last_fps: 0.0,
            avg_fps: 0.0,
            best_fps: 0.0,
            worst_fps: f32::MAX,
            best_frame_time: Duration::MAX,
            worst_frame_time: Duration::ZERO,
            triangle_count: 0,
            frame_count: 0,
            total_time: Duration::ZERO,
        }
    }
}

impl FrameStats {
    /// Forget every recorded frame
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Frames recorded since the last reset
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Record one frame; zero-length frames only update the triangle count
    #[allow(clippy::cast_precision_loss)]
    pub fn record_frame(&mut self, frame_time: Duration, triangles: usize) {
        self.triangle_count = triangles;
        if frame_time.is_zero() {
            return;
        }

        self.frame_count += 1;
        self.total_time += frame_time;
        self.last_fps = 1.0 / frame_time.as_secs_f32();
        self.avg_fps = self.frame_count as f32 / self.total_time.as_secs_f32();
        self.best_fps = self.best_fps.max(self.last_fps);
        self.worst_fps = self.worst_fps.min(self.last_fps);
        self.best_frame_time = self.best_frame_time.min(frame_time);
        self.worst_frame_time = self.worst_frame_time.max(frame_time);
    }

    /// One-line report of the selected statistics
    pub fn summary(&self, flags: StatFlags) -> String {
        let mut parts = Vec::new();
        if flags.contains(StatFlags::FPS) {
            parts.push(format!("FPS: {:.1}", self.last_fps));
        }
        if flags.contains(StatFlags::AVG_FPS) {
            parts.push(format!("Avg: {:.1}", self.avg_fps));
        }
        if self.frame_count > 0 {
            if flags.contains(StatFlags::BEST_FPS) {
                parts.push(format!("Best: {:.1} ({:.2} ms)", self.best_fps, millis(self.best_frame_time)));
            }
            if flags.contains(StatFlags::WORST_FPS) {
                parts.push(format!("Worst: {:.1} ({:.2} ms)", self.worst_fps, millis(self.worst_frame_time)));
            }
        }
        if flags.contains(StatFlags::TRIANGLE_COUNT) {
            parts.push(format!("Triangles: {}", self.triangle_count));
        }
        parts.join(" | ")
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// A surface receiving rendered viewports
pub struct RenderTarget {
    name: String,
    width: u32,
    height: u32,
    colour_depth: u32,
    priority: u8,
    active: bool,
    viewports: std::collections::BTreeMap<i32, Viewport>,
    listeners: Vec<(ListenerId, Box<dyn RenderTargetListener>)>,
    next_listener: u64,
    stats: FrameStats,
    timer: FrameTimer,
    debug_text: String,
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("priority", &self.priority)
            .field("active", &self.active)
            .field("viewports", &self.viewports.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl RenderTarget {
    /// Create an active target with 32-bit colour and priority 0
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            colour_depth: 32,
            priority: 0,
            active: true,
            viewports: std::collections::BTreeMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
            stats: FrameStats::default(),
            timer: FrameTimer::new(),
            debug_text: String::new(),
        }
    }

    /// Set the colour depth in bits
    pub const fn with_colour_depth(mut self, bits: u32) -> Self {
        self.colour_depth = bits;
        self
    }

    /// Set the update priority; lower priorities are updated first
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Target name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Colour depth in bits
    pub const fn colour_depth(&self) -> u32 {
        self.colour_depth
    }

    /// Update priority
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Whether [`Self::update`] renders anything
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable updates
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Change the target size and every viewport's pixel rectangle
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        for viewport in self.viewports.values_mut() {
            viewport.update_dimensions(width, height);
        }
    }

    /// Add a viewport showing `camera`
    ///
    /// `left`, `top`, `width` and `height` are relative to the target and
    /// must describe a rectangle within 0..1.
    pub fn add_viewport(
        &mut self,
        camera: CameraId,
        z_order: i32,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> RenderResult<&mut Viewport> {
        if self.viewports.contains_key(&z_order) {
            return Err(RenderError::DuplicateViewport(z_order));
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !(in_unit(left) && in_unit(top) && width > 0.0 && height > 0.0 && left + width <= 1.0 && top + height <= 1.0)
        {
            return Err(RenderError::InvalidViewport(format!(
                "left={left} top={top} width={width} height={height}"
            )));
        }

        log::debug!("Target '{}': adding viewport z={}", self.name, z_order);
        let viewport = Viewport::new(camera, z_order, (left, top, width, height), self.width, self.height);
        Ok(self.viewports.entry(z_order).or_insert(viewport))
    }

    /// Number of viewports
    pub fn num_viewports(&self) -> usize {
        self.viewports.len()
    }

    /// The `index`-th viewport in ascending z-order
    pub fn viewport(&self, index: usize) -> Option<&Viewport> {
        self.viewports.values().nth(index)
    }

    /// Viewport at a z-order
    pub fn viewport_by_z_order(&self, z_order: i32) -> Option<&Viewport> {
        self.viewports.get(&z_order)
    }

    /// Mutable viewport at a z-order
    pub fn viewport_by_z_order_mut(&mut self, z_order: i32) -> Option<&mut Viewport> {
        self.viewports.get_mut(&z_order)
    }

    /// Viewports in ascending z-order
    pub fn viewports(&self) -> impl Iterator<Item = &Viewport> {
        self.viewports.values()
    }

    /// Remove the viewport at a z-order
    pub fn remove_viewport(&mut self, z_order: i32) -> RenderResult<Viewport> {
        self.viewports.remove(&z_order).ok_or(RenderError::ViewportNotFound(z_order))
    }

    /// Remove every viewport
    pub fn remove_all_viewports(&mut self) {
        self.viewports.clear();
    }

    /// Drop viewports showing `camera`, returning how many were removed
    pub fn remove_viewports_for_camera(&mut self, camera: CameraId) -> usize {
        let before = self.viewports.len();
        self.viewports.retain(|_, viewport| viewport.camera != camera);
        before - self.viewports.len()
    }

    /// Register a listener; callbacks fire in registration order
    pub fn add_listener(&mut self, listener: Box<dyn RenderTargetListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener, returning it
    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn RenderTargetListener>> {
        let index = self.listeners.iter().position(|(listener_id, _)| *listener_id == id)?;
        Some(self.listeners.remove(index).1)
    }

    /// Unregister every listener
    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Frame statistics
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Forget recorded frame statistics
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
        self.timer.reset();
    }

    /// Triangles drawn in the last update
    pub const fn triangle_count(&self) -> usize {
        self.stats.triangle_count
    }

    /// Text shown by debug overlays
    pub fn debug_text(&self) -> &str {
        &self.debug_text
    }

    /// Set the debug text
    pub fn set_debug_text(&mut self, text: impl Into<String>) {
        self.debug_text = text.into();
    }

    /// Render every viewport, timing the frame with the wall clock
    pub fn update(&mut self, renderer: &mut dyn ViewportRenderer) -> RenderResult<()> {
        let frame_time = self.timer.tick();
        self.update_with_delta(renderer, frame_time)
    }

    /// Render every viewport and record a frame of `frame_time`
    ///
    /// A failing viewport stops the update; its post-viewport callback and
    /// the post-target callbacks still fire, and no frame is recorded.
    pub fn update_with_delta(&mut self, renderer: &mut dyn ViewportRenderer, frame_time: Duration) -> RenderResult<()> {
        if !self.active {
            return Ok(());
        }

        for (_, listener) in &mut self.listeners {
            listener.pre_render_target_update(&self.name);
        }

        let mut result = Ok(0);
        for viewport in self.viewports.values() {
            for (_, listener) in &mut self.listeners {
                listener.pre_viewport_update(viewport);
            }
            let rendered = renderer.render_viewport(viewport);
            for (_, listener) in &mut self.listeners {
                listener.post_viewport_update(viewport);
            }
            match rendered {
                Ok(count) => result = result.map(|triangles| triangles + count),
                Err(err) => {
                    log::warn!("Target '{}' viewport {} failed: {}", self.name, viewport.z_order(), err);
                    result = Err(err);
                    break;
                }
            }
        }

        if let Ok(triangles) = result {
            self.stats.record_frame(frame_time, triangles);
            log::debug!(
                "Target '{}' updated: {}",
                self.name,
                self.stats.summary(StatFlags::FPS | StatFlags::TRIANGLE_COUNT)
            );
        }

        for (_, listener) in &mut self.listeners {
            listener.post_render_target_update(&self.name, &self.stats);
        }
        result.map(|_| ())
    }
}
