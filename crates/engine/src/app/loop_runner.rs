use std::env;
use std::sync::Arc;
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

use super::input::ActionStates;
use super::metrics::LoopStats;
use super::scene::{SceneError, SceneHost};
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "TILEWALK_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Tilewalk".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
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
    #[error("scene failed: {0}")]
    Scene(#[source] SceneError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `scene` with a fixed-step simulation until
/// the window closes, Escape is pressed, the scene asks to quit, or the
/// scene fails.
pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let mut host = SceneHost::new(scene);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let (initial_width, initial_height) = renderer.size();
    let mut input_collector = InputCollector::new(initial_width, initial_height);

    host.load().map_err(AppError::Scene)?;

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut loop_stats = LoopStats::new(metrics_log_interval, Instant::now());
    let mut last_applied_title: Option<String> = None;
    let mut scene_failure: Option<SceneError> = None;

    let run_result = event_loop.run(|event, window_target| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                info!(reason = "window_close", "shutdown_requested");
                window_target.exit();
            }
            WindowEvent::Resized(new_size) => {
                input_collector.set_window_size(new_size.width, new_size.height);
                if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                    warn!(error = %error, "renderer_resize_failed");
                    window_target.exit();
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.inner_size();
                input_collector.set_window_size(size.width, size.height);
                if let Err(error) = renderer.resize(size.width, size.height) {
                    warn!(error = %error, "renderer_resize_failed");
                    window_target.exit();
                }
            }
            WindowEvent::Focused(false) => {
                input_collector.release_all();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                input_collector.handle_keyboard_input(&event);
                if input_collector.quit_requested {
                    info!(reason = "escape_key", "shutdown_requested");
                    window_target.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                if slow_frame_delay > Duration::ZERO {
                    // Debug perturbation only, separate from the FPS cap.
                    thread::sleep(slow_frame_delay);
                }

                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;

                accumulator =
                    accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                for _ in 0..step_plan.ticks_to_run {
                    let input_snapshot = input_collector.snapshot_for_tick();
                    match host.update(fixed_dt_seconds, &input_snapshot) {
                        Ok(SceneCommand::None) => {}
                        Ok(SceneCommand::Quit) => {
                            info!(reason = "scene_quit", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                        Err(failure) => {
                            error!(error = %failure, "scene_update_failed");
                            scene_failure = Some(failure);
                            window_target.exit();
                            break;
                        }
                    }
                    loop_stats.record_tick();
                }
                accumulator = step_plan.remaining_accumulator;

                if step_plan.dropped_backlog > Duration::ZERO {
                    loop_stats.record_clamp();
                    warn!(
                        dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                        max_ticks_per_frame, "sim_clamp_triggered"
                    );
                }
                if scene_failure.is_some() {
                    return;
                }

                let elapsed_since_last_present =
                    Instant::now().saturating_duration_since(last_present_instant);
                let cap_sleep = compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                if cap_sleep > Duration::ZERO {
                    thread::sleep(cap_sleep);
                }

                if let Err(error) = renderer.render_scene(host.scene_mut()) {
                    warn!(error = %error, "renderer_draw_failed");
                    window_target.exit();
                }
                last_present_instant = Instant::now();

                let next_title = host.debug_title();
                if next_title != last_applied_title {
                    window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                    last_applied_title = next_title;
                }
                loop_stats.record_frame(raw_frame_dt);

                if let Some(snapshot) = loop_stats.maybe_snapshot(now) {
                    info!(
                        fps = snapshot.fps,
                        tps = snapshot.tps,
                        frame_time_ms = snapshot.avg_frame_ms,
                        worst_frame_ms = snapshot.worst_frame_ms,
                        clamp_events = snapshot.clamp_events,
                        entity_count = host.entity_count(),
                        "loop_metrics"
                    );
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            window.request_redraw();
        }
        Event::LoopExiting => {
            host.shutdown();
            info!("shutdown");
        }
        _ => {}
    });

    if let Some(failure) = scene_failure {
        return Err(AppError::Scene(failure));
    }
    run_result.map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let Some(action) = action_for_key(code) else {
            return;
        };
        self.action_states.set(action, is_pressed);
        if action == InputAction::Quit && is_pressed {
            self.quit_requested = true;
        }
    }

    /// Drops held state when focus is lost so no key stays stuck down.
    fn release_all(&mut self) {
        for action in InputAction::ALL {
            self.action_states.set(action, false);
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.window_width,
            self.window_height,
        );
        self.action_states.clear_edges();
        snapshot
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveUp),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::MoveDown),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::KeyE => Some(InputAction::Interact),
        KeyCode::KeyY => Some(InputAction::Confirm),
        KeyCode::Space => Some(InputAction::Advance),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    parse_slow_frame_delay(env::var(SLOW_FRAME_ENV_VAR), config_slow_frame_ms)
}

fn parse_slow_frame_delay(
    raw: Result<String, env::VarError>,
    config_slow_frame_ms: u64,
) -> Duration {
    match raw {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "slow_frame_env_invalid_using_config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "slow_frame_env_unreadable_using_config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_keeps_fractional_remainder() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(40), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 2);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(8));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn interact_press_is_edge_for_single_tick() {
        let mut input = InputCollector::new(1280, 720);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyE), true);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::Interact));
        assert!(!second.was_pressed(InputAction::Interact));
        assert!(second.is_down(InputAction::Interact));
    }

    #[test]
    fn held_key_does_not_spam_press_edges() {
        let mut input = InputCollector::default();
        let space = PhysicalKey::Code(KeyCode::Space);

        input.update_action_state_from_physical_key(space, true);
        let first = input.snapshot_for_tick();
        input.update_action_state_from_physical_key(space, true);
        let second = input.snapshot_for_tick();
        input.update_action_state_from_physical_key(space, false);
        input.update_action_state_from_physical_key(space, true);
        let third = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::Advance));
        assert!(!second.was_pressed(InputAction::Advance));
        assert!(third.was_pressed(InputAction::Advance));
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_actions() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowLeft), true);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::MoveRight));
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), false);

        let snapshot = input.snapshot_for_tick();
        assert!(!snapshot.is_down(InputAction::MoveRight));
    }

    #[test]
    fn escape_marks_quit_requested() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowUp), true);
        input.release_all();
        assert!(!input.snapshot_for_tick().any_directional_down());
    }

    #[test]
    fn snapshot_carries_window_size() {
        let mut input = InputCollector::new(1280, 720);
        input.set_window_size(800, 600);
        assert_eq!(input.snapshot_for_tick().window_size(), (800, 600));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(action_for_key(KeyCode::KeyQ), None);
        assert_eq!(action_for_key(KeyCode::KeyY), Some(InputAction::Confirm));
    }

    #[test]
    fn target_frame_duration_for_60hz_is_expected() {
        assert_eq!(target_frame_duration(None), None);
        let duration = target_frame_duration(Some(60)).expect("duration");
        assert!((duration.as_secs_f64() - (1.0 / 60.0)).abs() < 0.000_001);
    }

    #[test]
    fn compute_cap_sleep_only_when_under_budget() {
        let target = target_frame_duration(Some(60));
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), target), Duration::ZERO);
        assert!(compute_cap_sleep(Duration::from_millis(5), target) > Duration::ZERO);
        assert_eq!(compute_cap_sleep(Duration::from_millis(5), None), Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }

    #[test]
    fn slow_frame_override_parses_or_falls_back() {
        assert_eq!(
            parse_slow_frame_delay(Ok(" 25 ".to_string()), 0),
            Duration::from_millis(25)
        );
        assert_eq!(
            parse_slow_frame_delay(Ok("soon".to_string()), 7),
            Duration::from_millis(7)
        );
        assert_eq!(
            parse_slow_frame_delay(Err(env::VarError::NotPresent), 3),
            Duration::from_millis(3)
        );
    }
}
