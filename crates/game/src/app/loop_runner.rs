use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use skirmish_sim::{LevelStateName, Session};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::metrics::MetricsAccumulator;
use super::AppError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) ticks: u64,
    pub(crate) frames: u64,
    pub(crate) wins: u32,
    pub(crate) deaths: u32,
    pub(crate) highest_level: u32,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_loop(app) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                frames = summary.frames,
                wins = summary.wins,
                deaths = summary.deaths,
                highest_level = summary.highest_level,
                "run_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

/// Frame clock: the wall clock when pacing in real time, otherwise a
/// simulated one advancing exactly one fixed step per frame.
#[derive(Debug)]
enum FrameClock {
    Realtime {
        start: Instant,
        last_frame: Instant,
        frame_target: Duration,
    },
    Simulated {
        now: Duration,
        step: Duration,
    },
}

impl FrameClock {
    fn new(realtime: bool, fixed_dt: Duration) -> Self {
        if realtime {
            let now = Instant::now();
            Self::Realtime {
                start: now,
                last_frame: now,
                frame_target: fixed_dt,
            }
        } else {
            Self::Simulated {
                now: Duration::ZERO,
                step: fixed_dt,
            }
        }
    }

    /// Waits for the next frame and returns the time since the previous one.
    fn next_frame(&mut self) -> Duration {
        match self {
            Self::Realtime {
                last_frame,
                frame_target,
                ..
            } => {
                let elapsed = Instant::now().saturating_duration_since(*last_frame);
                let sleep = compute_cap_sleep(elapsed, Some(*frame_target));
                if sleep > Duration::ZERO {
                    thread::sleep(sleep);
                }
                let now = Instant::now();
                let frame_dt = now.saturating_duration_since(*last_frame);
                *last_frame = now;
                frame_dt
            }
            Self::Simulated { now, step } => {
                *now = now.saturating_add(*step);
                *step
            }
        }
    }

    fn elapsed(&self) -> Duration {
        match self {
            Self::Realtime { start, .. } => Instant::now().saturating_duration_since(*start),
            Self::Simulated { now, .. } => *now,
        }
    }
}

fn run_loop(mut app: AppWiring) -> Result<RunSummary, AppError> {
    let run = app.config.run.clone();
    let target_tps = run.target_tps.max(1);
    let max_frame_delta = normalize_non_zero_duration(
        Duration::from_millis(run.max_frame_delta_ms),
        Duration::from_millis(250),
    );
    let max_ticks_per_frame = run.max_ticks_per_frame.max(1);
    let metrics_log_interval = normalize_non_zero_duration(
        Duration::from_millis(run.metrics_log_interval_ms),
        Duration::from_secs(1),
    );
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let total_ticks = run.run_seconds.saturating_mul(u64::from(target_tps));
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        run_seconds = run.run_seconds,
        realtime = run.realtime,
        "loop_config"
    );

    app.session.start(false)?;
    let mut summary = RunSummary::default();
    let mut clock = FrameClock::new(run.realtime, fixed_dt);
    let mut metrics = MetricsAccumulator::new(metrics_log_interval);
    let mut accumulator = Duration::ZERO;

    while summary.ticks < total_ticks {
        let frame_dt = clock.next_frame();
        accumulator = accumulator.saturating_add(clamp_frame_delta(frame_dt, max_frame_delta));

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            if summary.ticks >= total_ticks {
                break;
            }
            let input = app.autopilot.next_input(&app.session);
            app.session.tick(fixed_dt_seconds, &input)?;
            summary.ticks = summary.ticks.saturating_add(1);
            summary.highest_level = summary.highest_level.max(app.session.levels.level());
            metrics.record_tick();
            handle_game_over(&mut app.session, run.game_plus_on_win, &mut summary)?;
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        app.surface.begin_frame();
        app.session.render(&mut app.surface);
        summary.frames = summary.frames.saturating_add(1);
        metrics.record_frame(frame_dt, app.surface.draw_calls());

        if let Some(snapshot) = metrics.maybe_snapshot(clock.elapsed()) {
            let player = app.session.player_snapshot();
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                draw_calls = snapshot.draw_calls,
                entity_count = app.session.scene.len(),
                level = app.session.levels.level(),
                player_hp = player.map(|p| p.hp),
                "loop_metrics"
            );
        }
    }

    Ok(summary)
}

/// Restarts a finished game: New Game+ after a win when enabled, a fresh game
/// otherwise.
fn handle_game_over(
    session: &mut Session,
    game_plus_on_win: bool,
    summary: &mut RunSummary,
) -> Result<(), AppError> {
    match session.levels.state().name() {
        LevelStateName::PlayerWon => {
            summary.wins = summary.wins.saturating_add(1);
            info!(level = session.levels.level(), wins = summary.wins, "game_won");
            session.start(game_plus_on_win)?;
        }
        LevelStateName::PlayerDead => {
            summary.deaths = summary.deaths.saturating_add(1);
            info!(
                level = session.levels.level(),
                deaths = summary.deaths,
                "game_lost"
            );
            session.start(false)?;
        }
        LevelStateName::Lobby | LevelStateName::Playing => {}
    }
    Ok(())
}

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

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
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

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}
