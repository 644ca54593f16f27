use crate::config::GlobeConfig;
use crate::controller::{OrientationAnimator, PointerTracker, Viewport};
use crate::error::GlobeError;
use crate::model::{Camera, PointerPosition, SceneState, TargetMapping};
use crate::view::RenderBackend;

/// Shortest frame delta fed to the update. Keeps the spin advancing when two
/// callbacks report the same timestamp.
pub const MIN_FRAME_DT: f32 = 0.001;
/// Longest frame delta fed to the update, so a resumed tab does not snap.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Turns monotonic timestamps into clamped frame deltas.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Seconds since the previous call, clamped to [MIN_FRAME_DT, MAX_FRAME_DT].
    pub fn tick(&mut self, now_secs: f64) -> f32 {
        let dt = match self.last {
            Some(last) => (now_secs - last) as f32,
            None => 0.0,
        };
        self.last = Some(now_secs);
        dt.clamp(MIN_FRAME_DT, MAX_FRAME_DT)
    }
}

/// Read-only numbers for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame_count: u64,
    pub fps: f32,
    pub last_dt: f32,
    pub pointer: Option<PointerPosition>,
    pub viewport: (u32, u32),
}

/// Main frame loop state: owns the scene, camera and pointer, and runs the
/// per-frame update. Event handlers get at it through whatever handle the host
/// uses (`&mut` natively, `Rc<RefCell<_>>` on the web).
pub struct FrameLoopContext {
    pub scene: SceneState,
    pub camera: Camera,
    pub pointer: PointerTracker,
    pub viewport: Viewport,
    animator: OrientationAnimator,
    mapping: TargetMapping,
    spin_rate: f32,
    clock: FrameClock,
    running: bool,

    frame_count: u64,
    fps: f32,
    fps_frames: u32,
    fps_timer: f32,
    last_dt: f32,
}

impl FrameLoopContext {
    pub fn new(config: &GlobeConfig, width: u32, height: u32, star_seed: u64) -> Result<Self, GlobeError> {
        config.validate()?;
        let viewport = Viewport::new(width, height)?;

        Ok(Self {
            scene: SceneState::new(config, star_seed),
            camera: Camera::from_config(&config.camera, width, height),
            pointer: PointerTracker::new(),
            viewport,
            animator: OrientationAnimator::new(config.motion.ease_duration),
            mapping: TargetMapping {
                pitch_scale: config.motion.pitch_scale,
                yaw_scale: config.motion.yaw_scale,
            },
            spin_rate: config.motion.spin_rate,
            clock: FrameClock::new(),
            running: true,
            frame_count: 0,
            fps: 0.0,
            fps_frames: 0,
            fps_timer: 0.0,
            last_dt: 0.0,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// End the loop. The host stops re-arming and further frames are ignored.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!("frame loop stopped after {} frames", self.frame_count);
        }
        self.running = false;
    }

    /// Advance the scene by `dt` seconds: spin, retarget, ease.
    pub fn update(&mut self, dt: f32) {
        self.scene.advance_spin(self.spin_rate * dt);

        let current = self.scene.orientation();
        let target = self.pointer.target_orientation(&self.mapping, current);
        self.scene.set_orientation(self.animator.tick(current, target, dt));

        self.frame_count += 1;
        self.last_dt = dt;
        self.fps_frames += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.fps_frames as f32 / self.fps_timer;
            self.fps_frames = 0;
            self.fps_timer = 0.0;
        }
    }

    /// One refresh tick: update with the elapsed time since the last tick, then draw.
    /// Does nothing once stopped.
    pub fn on_frame<B: RenderBackend>(&mut self, now_secs: f64, backend: &mut B) -> Result<(), GlobeError> {
        if !self.running {
            return Ok(());
        }
        let dt = self.clock.tick(now_secs);
        self.update(dt);
        backend.draw(&self.scene, &self.camera, &self.stats())
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frame_count: self.frame_count,
            fps: self.fps,
            last_dt: self.last_dt,
            pointer: self.pointer.position(),
            viewport: (self.viewport.width(), self.viewport.height()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::f32::consts::TAU;
    use crate::model::Orientation;

    /// Backend stand-in that records what the loop asked of it.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub draws: usize,
        pub resizes: Vec<(u32, u32)>,
        pub spins: Vec<f32>,
        pub orientations: Vec<Orientation>,
        pub star_counts: Vec<usize>,
        pub atmosphere_scales: Vec<f32>,
        pub fail_next: bool,
    }

    impl RenderBackend for RecordingBackend {
        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn draw(&mut self, scene: &SceneState, _camera: &Camera, _stats: &FrameStats) -> Result<(), GlobeError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(GlobeError::Surface(wgpu::SurfaceError::OutOfMemory));
            }
            self.draws += 1;
            self.spins.push(scene.spin());
            self.orientations.push(scene.orientation());
            self.star_counts.push(scene.stars().len());
            self.atmosphere_scales.push(scene.atmosphere_scale());
            Ok(())
        }
    }

    fn context() -> FrameLoopContext {
        FrameLoopContext::new(&GlobeConfig::default(), 800, 600, 3).unwrap()
    }

    fn run_frames(ctx: &mut FrameLoopContext, backend: &mut RecordingBackend, frames: usize, start: f64) -> f64 {
        let mut now = start;
        for _ in 0..frames {
            now += 1.0 / 60.0;
            ctx.on_frame(now, backend).unwrap();
        }
        now
    }

    #[test]
    fn clock_clamps_deltas() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(10.0), MIN_FRAME_DT);
        assert!((clock.tick(10.016) - 0.016).abs() < 1e-5);
        assert_eq!(clock.tick(10.016), MIN_FRAME_DT);
        assert_eq!(clock.tick(15.0), MAX_FRAME_DT);
    }

    #[test]
    fn spin_strictly_increases_regardless_of_input() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        let mut now = 0.0;
        for i in 0..240 {
            if i % 7 == 0 {
                ctx.pointer.on_pointer_move((i * 3) as f64, (i * 2) as f64, 800.0, 600.0);
            }
            if i % 50 == 0 {
                crate::controller::viewport::on_resize(&mut ctx, &mut backend, 640 + i as u32, 480).unwrap();
            }
            now += 1.0 / 60.0;
            ctx.on_frame(now, &mut backend).unwrap();
        }

        let frame_spins: Vec<f32> = backend.spins.clone();
        for pair in frame_spins.windows(2) {
            let step = (pair[1] - pair[0]).rem_euclid(TAU);
            assert!(step >= 0.0 && step < 0.01, "unexpected spin step {}", step);
        }
        // resize redraws do not advance the spin, frames always do
        let mut spins = Vec::new();
        let mut now = now;
        for _ in 0..10 {
            now += 1.0 / 60.0;
            ctx.on_frame(now, &mut backend).unwrap();
            spins.push(ctx.scene.spin());
        }
        for pair in spins.windows(2) {
            assert!((pair[1] - pair[0]).rem_euclid(TAU) > 0.0);
        }
    }

    #[test]
    fn spin_matches_time_scaled_rate() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        ctx.on_frame(0.0, &mut backend).unwrap();
        let start = ctx.scene.spin();
        run_frames(&mut ctx, &mut backend, 60, 0.0);
        let advanced = ctx.scene.spin() - start;
        assert!((advanced - 0.06).abs() < 1e-4, "advanced {}", advanced);
    }

    #[test]
    fn no_pointer_means_no_rotation() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        run_frames(&mut ctx, &mut backend, 120, 0.0);
        assert_eq!(ctx.scene.orientation(), Orientation::ZERO);
        assert_eq!(backend.draws, 120);
    }

    #[test]
    fn center_pointer_converges_to_origin_while_spinning() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();

        ctx.pointer.on_pointer_move(800.0, 0.0, 800.0, 600.0);
        let now = run_frames(&mut ctx, &mut backend, 120, 0.0);
        let displaced = ctx.scene.orientation();
        assert!(displaced.yaw > 0.1 && displaced.pitch < -0.05);

        ctx.pointer.on_pointer_move(400.0, 300.0, 800.0, 600.0);
        assert_eq!(ctx.pointer.position(), Some(PointerPosition { x: 0.0, y: 0.0 }));

        let spin_before = ctx.scene.spin();
        run_frames(&mut ctx, &mut backend, 600, now);
        let settled = ctx.scene.orientation();
        assert!(settled.distance(&Orientation::ZERO) < 1e-3, "orientation {:?}", settled);
        assert!((ctx.scene.spin() - spin_before).rem_euclid(TAU) > 0.3);
    }

    #[test]
    fn scene_topology_is_fixed() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        let stars_before = ctx.scene.stars().positions().to_vec();

        ctx.pointer.on_pointer_move(10.0, 590.0, 800.0, 600.0);
        run_frames(&mut ctx, &mut backend, 300, 0.0);

        assert!(backend.star_counts.iter().all(|&n| n == 10_000));
        assert!(backend.atmosphere_scales.iter().all(|&s| s == 1.1));
        assert_eq!(ctx.scene.stars().positions(), stars_before.as_slice());
    }

    #[test]
    fn stop_halts_updates_and_draws() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        let now = run_frames(&mut ctx, &mut backend, 5, 0.0);
        let spin = ctx.scene.spin();

        ctx.stop();
        assert!(!ctx.is_running());
        run_frames(&mut ctx, &mut backend, 5, now);
        assert_eq!(backend.draws, 5);
        assert_eq!(ctx.scene.spin(), spin);
        assert_eq!(ctx.stats().frame_count, 5);
    }

    #[test]
    fn backend_errors_propagate() {
        let mut ctx = context();
        let mut backend = RecordingBackend { fail_next: true, ..Default::default() };
        let err = ctx.on_frame(0.0, &mut backend).unwrap_err();
        assert!(matches!(err, GlobeError::Surface(_)));
        // the loop keeps going on the next tick
        ctx.on_frame(0.016, &mut backend).unwrap();
        assert_eq!(backend.draws, 1);
    }

    #[test]
    fn fps_is_measured_over_a_second() {
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        run_frames(&mut ctx, &mut backend, 61, 0.0);
        let stats = ctx.stats();
        assert!((stats.fps - 60.0).abs() < 2.0, "fps {}", stats.fps);
        assert_eq!(stats.viewport, (800, 600));
    }

    #[test]
    fn rejects_empty_initial_viewport() {
        assert!(FrameLoopContext::new(&GlobeConfig::default(), 0, 600, 1).is_err());
    }
}
