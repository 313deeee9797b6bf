use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::map::MapError;

use super::input::ActionStates;
use super::frame_stats::FrameStatsWindow;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub stats_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Scene2D".to_string(),
            window_width: 1024,
            window_height: 768,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            stats_log_interval: Duration::from_secs(1),
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to load scene: {0}")]
    SceneLoad(#[from] MapError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window, loads `scene` with textures resolved under `asset_root`
/// and drives it until the window closes or the scene asks to quit.
pub fn run_app(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    asset_root: PathBuf,
) -> Result<(), AppError> {
    info!(asset_root = %asset_root.display(), "startup");
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static winit::window::Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let mut renderer = Renderer::new(window, asset_root).map_err(AppError::CreateRenderer)?;
    scene.load(renderer.textures_mut())?;
    info!(texture_count = renderer.textures_mut().len(), "scene_loaded");

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut stepper = FixedStepper::from_config(&config);
    let fixed_dt_seconds = stepper.fixed_dt().as_secs_f32();
    let stats_interval = if config.stats_log_interval.is_zero() {
        Duration::from_secs(1)
    } else {
        config.stats_log_interval
    };
    let mut pacer = RenderPacer::new(config.max_render_fps, Instant::now());
    let mut input_collector = InputCollector::default();

    info!(
        target_tps = config.target_tps.max(1),
        max_frame_delta_ms = stepper.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = stepper.max_ticks_per_frame,
        stats_interval_ms = stats_interval.as_millis() as u64,
        render_fps_cap = ?pacer.cap,
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut frame_stats = FrameStatsWindow::new(stats_interval, Instant::now());

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let budget = stepper.advance(frame_dt);
                    for _ in 0..budget.ticks {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = scene.update(fixed_dt_seconds, &input_snapshot);
                        frame_stats.record_tick();
                        if command == SceneCommand::Quit {
                            info!(reason = "scene_command", "shutdown_requested");
                            window_target.exit();
                            return;
                        }
                    }
                    if !budget.dropped.is_zero() {
                        warn!(
                            dropped_backlog_ms = budget.dropped.as_millis() as u64,
                            max_ticks_per_frame = stepper.max_ticks_per_frame,
                            "sim_clamp_triggered"
                        );
                    }

                    let wait = pacer.wait_before_present(Instant::now());
                    if !wait.is_zero() {
                        thread::sleep(wait);
                    }

                    match renderer.render_scene(scene.as_mut()) {
                        Ok(stats) => frame_stats.record_frame(frame_dt, stats),
                        Err(error) => {
                            error!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                            return;
                        }
                    }
                    pacer.mark_presented(Instant::now());

                    if let Some(snapshot) = frame_stats.close_if_elapsed(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            tiles_visited_per_frame = snapshot.tiles_visited_per_frame,
                            tiles_drawn_per_frame = snapshot.tiles_drawn_per_frame,
                            frames_without_stats = snapshot.frames_without_stats,
                            "frame_stats"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    pressed_edges: ActionStates,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        if is_pressed && !self.action_states.is_down(action) {
            self.pressed_edges.set(action, true);
        }
        self.action_states.set(action, is_pressed);
        if action == InputAction::Quit && is_pressed {
            self.mark_quit_requested();
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot =
            InputSnapshot::new(self.quit_requested, self.action_states, self.pressed_edges);
        self.pressed_edges = ActionStates::default();
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    match key {
        PhysicalKey::Code(KeyCode::F6) => Some(InputAction::SaveMap),
        PhysicalKey::Code(KeyCode::F9) => Some(InputAction::ReloadMap),
        PhysicalKey::Code(KeyCode::Tab) => Some(InputAction::CompleteLevel),
        PhysicalKey::Code(KeyCode::Escape) => Some(InputAction::Quit),
        _ => None,
    }
}

/// Ticks to run this frame, plus backlog discarded because the per-frame
/// tick limit was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickBudget {
    ticks: u32,
    dropped: Duration,
}

/// Converts variable frame time into whole fixed-length simulation ticks.
#[derive(Debug)]
struct FixedStepper {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    backlog: Duration,
}

impl FixedStepper {
    fn new(fixed_dt: Duration, max_frame_delta: Duration, max_ticks_per_frame: u32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(Duration::from_nanos(1)),
            max_frame_delta,
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            backlog: Duration::ZERO,
        }
    }

    fn from_config(config: &LoopConfig) -> Self {
        let max_frame_delta = if config.max_frame_delta.is_zero() {
            Duration::from_millis(250)
        } else {
            config.max_frame_delta
        };
        Self::new(
            Duration::from_secs_f64(1.0 / config.target_tps.max(1) as f64),
            max_frame_delta,
            config.max_ticks_per_frame,
        )
    }

    fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    fn advance(&mut self, frame_dt: Duration) -> TickBudget {
        self.backlog = self
            .backlog
            .saturating_add(frame_dt.min(self.max_frame_delta));
        let due = (self.backlog.as_nanos() / self.fixed_dt.as_nanos()).min(u32::MAX as u128) as u32;
        let ticks = due.min(self.max_ticks_per_frame);
        self.backlog -= self.fixed_dt * ticks;
        let dropped = if due > ticks {
            std::mem::take(&mut self.backlog)
        } else {
            Duration::ZERO
        };
        TickBudget { ticks, dropped }
    }
}

/// Holds presentation back to an optional frames-per-second cap.
#[derive(Debug)]
struct RenderPacer {
    cap: Option<u32>,
    min_frame_time: Option<Duration>,
    last_present: Instant,
}

impl RenderPacer {
    fn new(max_render_fps: Option<u32>, now: Instant) -> Self {
        let cap = max_render_fps.filter(|fps| *fps > 0);
        Self {
            cap,
            min_frame_time: cap.map(|fps| Duration::from_secs_f64(1.0 / fps as f64)),
            last_present: now,
        }
    }

    fn wait_before_present(&self, now: Instant) -> Duration {
        let Some(min_frame_time) = self.min_frame_time else {
            return Duration::ZERO;
        };
        min_frame_time.saturating_sub(now.saturating_duration_since(self.last_present))
    }

    fn mark_presented(&mut self, now: Instant) {
        self.last_present = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), true);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), false);
    }

    fn stepper(max_ticks_per_frame: u32) -> FixedStepper {
        FixedStepper::new(
            Duration::from_millis(16),
            Duration::from_millis(250),
            max_ticks_per_frame,
        )
    }

    #[test]
    fn stepper_runs_every_due_tick_under_the_limit() {
        let mut stepper = stepper(5);
        assert_eq!(
            stepper.advance(Duration::from_millis(48)),
            TickBudget {
                ticks: 3,
                dropped: Duration::ZERO
            }
        );
        assert_eq!(stepper.backlog, Duration::ZERO);
    }

    #[test]
    fn stepper_carries_partial_tick_into_next_frame() {
        let mut stepper = stepper(5);
        assert_eq!(stepper.advance(Duration::from_millis(20)).ticks, 1);
        assert_eq!(stepper.advance(Duration::from_millis(12)).ticks, 1);
        assert_eq!(stepper.backlog, Duration::ZERO);
    }

    #[test]
    fn stepper_discards_backlog_past_the_tick_limit() {
        let mut stepper = stepper(3);
        let budget = stepper.advance(Duration::from_millis(120));
        assert_eq!(budget.ticks, 3);
        assert_eq!(budget.dropped, Duration::from_millis(72));
        assert_eq!(stepper.backlog, Duration::ZERO);
    }

    #[test]
    fn stepper_clamps_long_frames_before_accumulating() {
        let mut stepper = FixedStepper::new(
            Duration::from_millis(100),
            Duration::from_millis(250),
            10,
        );
        let budget = stepper.advance(Duration::from_secs(3));
        assert_eq!(budget.ticks, 2);
        assert_eq!(budget.dropped, Duration::ZERO);
        assert_eq!(stepper.backlog, Duration::from_millis(50));
    }

    #[test]
    fn stepper_from_config_replaces_zero_settings() {
        let config = LoopConfig {
            target_tps: 0,
            max_frame_delta: Duration::ZERO,
            max_ticks_per_frame: 0,
            ..LoopConfig::default()
        };
        let stepper = FixedStepper::from_config(&config);
        assert_eq!(stepper.fixed_dt(), Duration::from_secs(1));
        assert_eq!(stepper.max_frame_delta, Duration::from_millis(250));
        assert_eq!(stepper.max_ticks_per_frame, 1);
    }

    #[test]
    fn save_key_edge_is_single_tick() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::F6);
        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.save_pressed());
        assert!(!second.save_pressed());
        assert!(second.is_down(InputAction::SaveMap));
    }

    #[test]
    fn held_keys_do_not_retrigger_without_release() {
        let mut input = InputCollector::default();

        press(&mut input, KeyCode::Tab);
        assert!(input.snapshot_for_tick().complete_level_pressed());
        press(&mut input, KeyCode::Tab);
        assert!(!input.snapshot_for_tick().complete_level_pressed());
        release(&mut input, KeyCode::Tab);
        press(&mut input, KeyCode::Tab);
        assert!(input.snapshot_for_tick().complete_level_pressed());
    }

    #[test]
    fn reload_and_save_map_to_separate_keys() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::F9);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.reload_pressed());
        assert!(!snapshot.save_pressed());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyW);
        let snapshot = input.snapshot_for_tick();
        assert!(!snapshot.save_pressed());
        assert!(!snapshot.reload_pressed());
        assert!(!snapshot.complete_level_pressed());
        assert!(!snapshot.quit_requested());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Escape);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn uncapped_pacer_never_waits() {
        let start = Instant::now();
        let pacer = RenderPacer::new(None, start);
        assert_eq!(pacer.wait_before_present(start), Duration::ZERO);
        assert_eq!(RenderPacer::new(Some(0), start).cap, None);
    }

    #[test]
    fn capped_pacer_waits_out_the_rest_of_the_frame() {
        let start = Instant::now();
        let mut pacer = RenderPacer::new(Some(50), start);
        assert_eq!(
            pacer.wait_before_present(start + Duration::from_millis(5)),
            Duration::from_millis(15)
        );
        assert_eq!(
            pacer.wait_before_present(start + Duration::from_millis(30)),
            Duration::ZERO
        );

        pacer.mark_presented(start + Duration::from_millis(30));
        assert_eq!(
            pacer.wait_before_present(start + Duration::from_millis(40)),
            Duration::from_millis(10)
        );
    }
}
