//! Stagger Grid Demo
//!
//! This example lays out a 3x2 grid of tiles and staggers one fade-in across
//! them, then plays a two-step sequence forward and reversed:
//! - Template clones positioned by the array layout engine
//! - Members revealed one interval apart from the array clock
//! - Reversed sequences compressed into a shorter duration
//!
//! Run with: cargo run -p cadence_animation --example stagger_grid [config.toml]
//!
//! Set `RUST_LOG=cadence_animation=debug` to see runner and array logs.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use cadence_animation::{
    AnimationHandle, AnimationLibrary, AnimationTrack, ArrayAnimation, ArrayConfig, ArrayHost,
    ArrayMember, CadenceConfig, LayoutNode, MemberTiming, Result, SequenceSettings, SharedNode,
    TweenAnimation, TweenRunner,
};
use cadence_core::{EventLog, EventSink, LayoutRect, Size, Vec2};
use tracing_subscriber::EnvFilter;

const FRAME: f32 = 1.0 / 30.0;

struct Tile {
    name: String,
    visible: bool,
    offset: Vec2,
}

impl LayoutNode for Tile {
    fn set_active(&mut self, active: bool) {
        if active != self.visible {
            tracing::info!("{} {}", self.name, if active { "shown" } else { "hidden" });
        }
        self.visible = active;
    }

    fn is_active(&self) -> bool {
        self.visible
    }

    fn layout_rect(&self) -> LayoutRect {
        LayoutRect::new(Size::new(80.0, 60.0)).with_anchor_min(Vec2::ZERO)
    }

    fn rest_position(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn shift_position(&mut self, offset: Vec2) {
        self.offset = offset;
        let placed = self.rest_position() + offset;
        tracing::info!("{} placed at ({:.1}, {:.1})", self.name, placed.x, placed.y);
    }
}

/// Clones tiles into a 400x200 panel
#[derive(Default)]
struct Panel {
    tiles: Vec<(Rc<RefCell<EventLog>>, Rc<RefCell<Tile>>)>,
}

impl ArrayHost for Panel {
    fn instantiate(&mut self, ordinal: usize, _runner: &mut TweenRunner) -> Option<ArrayMember> {
        let log = EventLog::shared();
        let tile = Rc::new(RefCell::new(Tile {
            name: format!("tile-{}", ordinal),
            visible: false,
            offset: Vec2::ZERO,
        }));
        let events: EventSink = log.clone();
        let node: SharedNode = tile.clone();
        self.tiles.push((log, tile));
        Some(ArrayMember::new(events, node, MemberTiming::new(0.0, 0.5)))
    }

    fn destroy(&mut self, _member: &ArrayMember) {
        self.tiles.pop();
    }

    fn container_size(&self) -> Option<Size> {
        Some(Size::new(400.0, 200.0))
    }
}

/// Logs the rate at a few milestones
struct Milestones {
    label: &'static str,
    next: f32,
}

impl AnimationTrack for Milestones {
    fn on_update(&mut self, rate: f32) {
        if rate >= self.next {
            tracing::info!("{} at {:.0}%", self.label, rate * 100.0);
            self.next += 0.5;
        }
    }

    fn on_stop(&mut self) {
        tracing::info!("{} done", self.label);
        self.next = 0.0;
    }
}

fn run_until_idle(runner: &mut TweenRunner) {
    let mut frames = 0;
    while runner.has_running() && frames < 600 {
        runner.advance(FRAME);
        frames += 1;
    }
    tracing::info!("Idle after {} frames", frames);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => CadenceConfig::load(Path::new(&path))?,
        None => CadenceConfig {
            array: ArrayConfig {
                as_array: true,
                count: 6,
                columns: 3,
                rows: 2,
                interval: 0.2,
                ..ArrayConfig::default()
            },
            ..CadenceConfig::default()
        },
    };
    tracing::info!("Config:\n{}", config.to_toml()?);

    let mut runner = TweenRunner::create(config.runner.clone());

    let grid = AnimationHandle::new(
        TweenAnimation::new("fade-in", 0.5)
            .with_array(ArrayAnimation::new(config.array.clone()), Panel::default())
            .auto_play(),
    );
    grid.activate(&mut runner)?;
    run_until_idle(&mut runner);

    let mut library = AnimationLibrary::new();
    let steps: Vec<AnimationHandle> = ["slide", "settle"]
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            AnimationHandle::new(
                TweenAnimation::new(label, 1.0)
                    .with_track(Milestones { label, next: 0.0 })
                    .with_sequence(SequenceSettings::new("menu").at(i as u32)),
            )
        })
        .collect();
    for step in &steps {
        library.register(step);
    }

    library.play_sequence("menu", false, &mut runner)?;
    run_until_idle(&mut runner);

    library.play_sequence("menu", true, &mut runner)?;
    run_until_idle(&mut runner);

    grid.release_tween(&mut runner);
    runner.shutdown();
    Ok(())
}
