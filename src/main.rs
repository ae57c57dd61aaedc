use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use aether_physics::engine::time::FrameTimer;
use aether_physics::events::ListenerResult;
use aether_physics::{
    Action, AudioCue, BodyDesc, CollisionInfo, CollisionListener, EntityId, InputEvent,
    PhysicsConfig, PhysicsWorld, SurfaceMaterial,
};
use clap::{Parser, ValueEnum};
use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Walk right across a stone floor.
    Walk,
    /// Settle, respawn high above the level, then walk left.
    Respawn,
    /// Walk off a ledge and jump inside the coyote window.
    Ledge,
    /// Hammer one body with maximal force and jump spam.
    Stress,
}

#[derive(Parser)]
#[command(name = "aether-physics", about = "Headless physics scenario runner")]
struct Args {
    #[arg(long, value_enum, default_value = "walk")]
    scenario: Scenario,

    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Frame length in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Drive the fixed-step accumulator instead of one variable tick per frame
    #[arg(long)]
    fixed: bool,

    /// TOML file overriding the default tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sleep so frames play out at wall-clock speed
    #[arg(long)]
    realtime: bool,
}

/// Prints every physics event at debug level, ground changes at info.
struct EventLog;

impl CollisionListener for EventLog {
    fn name(&self) -> &str {
        "event_log"
    }

    fn on_collision_start(&mut self, entity: EntityId, info: &CollisionInfo) -> ListenerResult {
        log::debug!(
            "{entity:?} touched {:?} ({:?}, {})",
            info.other,
            info.collision_type,
            info.surface
        );
        Ok(())
    }

    fn on_collision_end(&mut self, entity: EntityId, info: &CollisionInfo) -> ListenerResult {
        log::debug!("{entity:?} separated from {:?}", info.other);
        Ok(())
    }

    fn on_ground_state_changed(&mut self, entity: EntityId, grounded: bool, normal: Vec2) -> ListenerResult {
        log::info!("{entity:?} grounded={grounded} normal={normal:?}");
        Ok(())
    }

    fn on_surface_changed(&mut self, entity: EntityId, surface: SurfaceMaterial) -> ListenerResult {
        log::info!("{entity:?} now on {surface}");
        Ok(())
    }
}

struct Runner {
    world: PhysicsWorld,
    player: EntityId,
    frame: u32,
    time: f64,
    dt: f32,
    fixed: bool,
    realtime: bool,
    timer: FrameTimer,
}

impl Runner {
    fn frame(&mut self) {
        if self.fixed {
            self.world.tick_fixed(self.dt);
        } else {
            self.world.tick(self.dt);
        }
        self.frame += 1;
        self.time += f64::from(self.dt);
        if self.realtime {
            self.timer.tick();
            let spare = self.dt - self.timer.dt;
            if spare > 0.0 {
                std::thread::sleep(Duration::from_secs_f32(spare));
            }
            self.timer.tick();
        }
    }

    fn press(&mut self, action: Action) {
        let _ = self.world.input(self.player, InputEvent::Pressed(action, self.time));
    }

    fn release(&mut self, action: Action) {
        let _ = self.world.input(self.player, InputEvent::Released(action, self.time));
    }

    fn report(&self, label: &str) {
        let coord = self.world.coordinator();
        let pos = coord.get_position(self.player).unwrap_or_default();
        let vel = coord.get_velocity(self.player).unwrap_or_default();
        let edges = coord.edge_state(self.player);
        log::info!(
            "[{label} #{}] pos=({:.1}, {:.1}) vel=({:.1}, {:.1}) grounded={} surface={} edges=({}, {})",
            self.frame,
            pos.x,
            pos.y,
            vel.x,
            vel.y,
            coord.is_grounded(self.player),
            coord.get_current_ground_surface_material(self.player),
            edges.is_near_left_edge,
            edges.is_near_right_edge,
        );
    }
}

fn build_level(world: &mut PhysicsWorld) -> EntityId {
    world.spawn(BodyDesc::platform(
        Vec2::new(0.0, 200.0),
        Vec2::new(320.0, 16.0),
        SurfaceMaterial::Stone,
    ));
    world.spawn(BodyDesc::platform(
        Vec2::new(480.0, 200.0),
        Vec2::new(160.0, 16.0),
        SurfaceMaterial::Ice,
    ));
    world.spawn(BodyDesc::prop(Vec2::new(-120.0, 150.0), Vec2::splat(12.0)));
    world.spawn_controlled(BodyDesc::player(Vec2::new(-200.0, 160.0), Vec2::new(12.0, 24.0)))
}

fn run(args: &Args, config: PhysicsConfig) {
    let mut world = PhysicsWorld::new(config);
    world.add_collision_listener(Box::new(EventLog));
    let player = build_level(&mut world);
    let mut runner = Runner {
        world,
        player,
        frame: 0,
        time: 0.0,
        dt: args.dt,
        fixed: args.fixed,
        realtime: args.realtime,
        timer: FrameTimer::new(),
    };

    match args.scenario {
        Scenario::Walk => {
            runner.press(Action::MoveRight);
            for _ in 0..args.frames {
                runner.frame();
                if runner.frame % 60 == 0 {
                    runner.report("walk");
                }
            }
            if let Some(cue) = runner
                .world
                .coordinator()
                .surface_audio_query(player, AudioCue::Footstep)
            {
                log::info!("footstep cue: {cue:?}");
            }
        }
        Scenario::Respawn => {
            for _ in 0..30 {
                runner.frame();
            }
            runner.report("settled");
            if let Err(err) = runner.world.respawn(player, Vec2::new(-200.0, 1500.0)) {
                log::error!("respawn failed: {err}");
                return;
            }
            let before = runner.world.coordinator().get_position(player).unwrap_or_default();
            runner.press(Action::MoveLeft);
            for _ in 0..args.frames.max(1) {
                runner.frame();
            }
            let after = runner.world.coordinator().get_position(player).unwrap_or_default();
            runner.report("respawned");
            if after.x == before.x {
                log::error!("player did not move after respawn");
            } else {
                log::info!("moved {:.1} units after respawn", after.x - before.x);
            }
        }
        Scenario::Ledge => {
            runner.press(Action::MoveRight);
            let mut jumped = false;
            let mut was_grounded = false;
            for _ in 0..args.frames {
                runner.frame();
                let coord = runner.world.coordinator();
                let grounded = coord.is_grounded(player);
                if coord.edge_state(player).is_near_right_edge && runner.frame % 10 == 0 {
                    runner.report("edge");
                }
                if was_grounded && !grounded && !jumped {
                    runner.report("left ground");
                    runner.press(Action::Jump);
                    jumped = true;
                } else if jumped {
                    runner.release(Action::Jump);
                }
                was_grounded = grounded;
            }
            runner.report("ledge");
        }
        Scenario::Stress => {
            let mut max_speed: f32 = 0.0;
            for i in 0..args.frames {
                let _ = runner
                    .world
                    .coordinator_mut()
                    .apply_force(player, Vec2::new(1.0e9, -1.0e9));
                if i % 2 == 0 {
                    runner.press(Action::Jump);
                } else {
                    runner.release(Action::Jump);
                }
                runner.frame();
                let speed = runner
                    .world
                    .coordinator()
                    .get_velocity(player)
                    .unwrap_or_default()
                    .length();
                max_speed = max_speed.max(speed);
            }
            let clamp = runner.world.coordinator().config().guard.velocity_safety_clamp;
            log::info!(
                "max speed over {} frames: {max_speed:.1} (clamp {clamp:.1})",
                args.frames
            );
        }
    }

    let stats = runner.world.notifier().stats();
    log::info!(
        "done after {} frames ({:.2}s simulated): {} events delivered, {} listener errors",
        runner.frame,
        runner.world.coordinator().now(),
        stats.events_delivered,
        stats.listener_errors + stats.listener_panics
    );
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match PhysicsConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => PhysicsConfig::default(),
    };

    if !(args.dt.is_finite() && args.dt > 0.0) {
        log::error!("--dt must be a positive number of seconds");
        return ExitCode::FAILURE;
    }

    run(&args, config);
    ExitCode::SUCCESS
}
