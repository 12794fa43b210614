use anyhow::Result;
use psyrun_core::{BlockSpec, Record};
use psyrun_driver::{DriverBuilder, FrameInfo, Renderer, SaveStatus, TrialStore};
use psyrun_experiment::{ExperimentConfig, TrialSequencer};
use psyrun_timing::MonotonicClock;
use serde_json::json;
use std::cell::Cell;
use std::fs::File;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Welcome,
    Setup,
    Go,
    Finish,
    Advance,
    Disconnected,
    Done,
}

/// In-memory stand-in for the hosting backend: a write "completes" a few
/// status polls after it begins.
pub struct MemoryStore {
    latency: usize,
    polls_left: Cell<usize>,
    active: Cell<bool>,
    begun: usize,
}

impl MemoryStore {
    pub fn new(latency: usize) -> Self {
        Self {
            latency,
            polls_left: Cell::new(0),
            active: Cell::new(false),
            begun: 0,
        }
    }

    /// Number of writes the session has started.
    pub fn begun(&self) -> usize {
        self.begun
    }
}

impl TrialStore for MemoryStore {
    fn begin_save(&mut self, _record: &Record) {
        self.begun += 1;
        self.polls_left.set(self.latency);
        self.active.set(true);
    }

    fn status(&self) -> SaveStatus {
        if !self.active.get() {
            return SaveStatus::default();
        }
        let left = self.polls_left.get();
        if left > 0 {
            self.polls_left.set(left - 1);
            return SaveStatus::default();
        }
        SaveStatus {
            successful: true,
            failed: false,
        }
    }
}

/// Console renderer: one line per state change instead of pixels.
#[derive(Default)]
pub struct ConsoleRenderer {
    last: Option<Phase>,
}

impl Renderer<Phase> for ConsoleRenderer {
    fn render(&mut self, frame: &FrameInfo<Phase>) {
        if self.last != Some(frame.state) {
            println!(
                "[trial {:>2}/{}] {:?}",
                (frame.trial_index + 1).min(frame.trial_count),
                frame.trial_count,
                frame.state
            );
            self.last = Some(frame.state);
        }
    }
}

fn demo_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.experiment_name = "reaction-demo".into();
    config
        .base_record
        .insert("experiment_name".into(), json!("reaction-demo"));
    config.blocks = vec![
        BlockSpec::new("practice", 2, false).with_variable("dir", vec![json!(-1), json!(1)]),
        BlockSpec::new("main", 3, true)
            .with_variable("dir", vec![json!(-1), json!(1)])
            .with_variable("delay_ms", vec![json!(40), json!(80)]),
    ];
    config
}

pub fn run() -> Result<()> {
    println!("=== PSYRUN DEMO SESSION ===");
    println!("Platform: {}", std::env::consts::OS);

    let config = demo_config();
    let mut sequencer = TrialSequencer::new();
    let mut rng = rand::rng();
    sequencer.append_blocks(&config.blocks, &mut rng)?;
    println!("Sequenced {} trials.\n", sequencer.len());

    // Shared tick counter: the compute hook advances it, the connectivity
    // monitor reads it to fake a brief outage mid-session.
    let tick_count = Rc::new(Cell::new(0u64));
    let compute_ticks = Rc::clone(&tick_count);
    let monitor_ticks = Rc::clone(&tick_count);

    let mut driver = DriverBuilder::new(
        vec![
            Phase::Welcome,
            Phase::Setup,
            Phase::Go,
            Phase::Finish,
            Phase::Advance,
            Phase::Disconnected,
            Phase::Done,
        ],
        MonotonicClock::new(),
        MemoryStore::new(2),
    )
    .trials(sequencer.into_trials())
    .base_record(config.base_record.clone())
    .compute(move |_| compute_ticks.set(compute_ticks.get() + 1))
    .interrupt("connection", Phase::Disconnected, move || {
        !(60..75).contains(&monitor_ticks.get())
    })
    .on_transition(|from, to| println!("    {from:?} -> {to:?}"))
    .on(Phase::Welcome, |session| {
        session
            .machine
            .once(|| println!("Welcome. Trials start shortly."));
        if session.machine.expired(Duration::from_millis(150)) {
            session.machine.next(Phase::Setup)
        } else {
            Ok(())
        }
    })
    .on(Phase::Setup, |session| {
        let Some(trial) = session.current_trial() else {
            return session.machine.next(Phase::Done);
        };
        println!(
            "Trial {} from block `{}` (cycle {})",
            session.trial_index(),
            trial.block_name,
            trial.cycle_index
        );
        session.machine.next(Phase::Go)
    })
    .on(Phase::Go, |session| {
        session.machine.once(|| println!("    stimulus up"));
        if session.machine.expired(Duration::from_millis(30)) {
            let rt_ms = session.machine.elapsed().as_secs_f64() * 1e3;
            session.record("rt_ms", json!(rt_ms));
            session.save_trial();
            session.machine.next(Phase::Finish)
        } else {
            Ok(())
        }
    })
    .on(Phase::Finish, |session| {
        let status = session.save_status();
        if status.successful {
            session.machine.next(Phase::Advance)
        } else if status.failed {
            // Submit the same record again and keep polling.
            session.save_trial();
            Ok(())
        } else {
            Ok(())
        }
    })
    .on(Phase::Advance, |session| {
        if session.advance_trial() {
            session.machine.next(Phase::Setup)
        } else {
            session.machine.next(Phase::Done)
        }
    })
    .on(Phase::Disconnected, |session| {
        session
            .machine
            .once(|| println!("    connection lost, waiting to resume"));
        Ok(())
    })
    .build(ConsoleRenderer::default())?;

    // Host animation loop: one tick per frame at roughly 120 Hz.
    let frame = Duration::from_millis(8);
    while !driver.session().machine.is(Phase::Done) {
        driver.tick()?;
        std::thread::sleep(frame);
    }

    let stats = driver.frame_stats();
    println!("\nSession complete.");
    println!(
        "Saved {} trial records ({} store writes).",
        driver.session().saved_records().len(),
        driver.session().store().begun(),
    );
    println!(
        "Frame cadence: {:.3} ms/frame, {:.1} Hz, jitter {:.3} ms",
        stats.average_frame_time_ns / 1e6,
        stats.effective_fps,
        stats.jitter_ns / 1e6,
    );

    let file = File::create("session_results.json")?;
    driver.session().export_results(file)?;
    println!("Results saved to session_results.json");

    Ok(())
}
