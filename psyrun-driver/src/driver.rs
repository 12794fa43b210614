use crate::hooks::{FrameInfo, Renderer, TrialStore};
use crate::interrupt::InterruptRule;
use crate::session::Session;
use psyrun_core::{MachineError, Record, Trial};
use psyrun_experiment::StateMachine;
use psyrun_timing::{Clock, FrameMonitor, FrameStats};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Per-state behavior, dispatched from the state phase of the tick.
pub type Handler<S, C, ST> = Box<dyn FnMut(&mut Session<S, C, ST>) -> Result<(), MachineError>>;

type ComputeHook<S, C, ST> = Box<dyn FnMut(&mut Session<S, C, ST>)>;

/// Runs the experiment as a fixed three-phase tick per host animation
/// callback: compute, then state (interrupt polling plus the current state's
/// handler), then render. Nothing here blocks or spawns work; handlers drive
/// all transitions through the session's machine.
pub struct ExperimentDriver<S, C: Clock, ST: TrialStore, R: Renderer<S>> {
    session: Session<S, C, ST>,
    handlers: HashMap<S, Handler<S, C, ST>>,
    compute: Option<ComputeHook<S, C, ST>>,
    interrupts: Vec<InterruptRule<S>>,
    renderer: R,
    clock: C,
    frames: FrameMonitor,
    last_tick: Option<C::Timestamp>,
}

impl<S, C: Clock, ST: TrialStore, R: Renderer<S>> Debug for ExperimentDriver<S, C, ST, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentDriver").finish_non_exhaustive()
    }
}

impl<S, C, ST, R> ExperimentDriver<S, C, ST, R>
where
    S: Copy + Eq + Hash + Debug,
    C: Clock,
    ST: TrialStore,
    R: Renderer<S>,
{
    /// One frame: compute phase, state phase, render phase.
    ///
    /// Errors are contract violations raised by handlers; the loop should
    /// stop on them rather than retry.
    pub fn tick(&mut self) -> Result<(), MachineError> {
        if let Some(previous) = self.last_tick {
            self.frames.record_frame(self.clock.elapsed(previous));
        }
        self.last_tick = Some(self.clock.now());

        if let Some(compute) = &mut self.compute {
            compute(&mut self.session);
        }

        // Interrupts preempt the normal handler: push each disengaged rule's
        // state at most once, pop it as soon as the monitor re-engages.
        for rule in &mut self.interrupts {
            let engaged = (rule.engaged)();
            let active = self.session.machine.is(rule.state);
            if !engaged && !active && !self.session.machine.stacked(rule.state) {
                self.session.machine.push(rule.state)?;
            } else if engaged && active {
                self.session.machine.pop()?;
            }
        }

        let state = self.session.machine.current();
        if let Some(handler) = self.handlers.get_mut(&state) {
            handler(&mut self.session)?;
        }

        let frame = FrameInfo {
            state: self.session.machine.current(),
            trial_index: self.session.trial_index(),
            trial_count: self.session.trial_count(),
            time_in_state: self.session.machine.elapsed(),
        };
        self.renderer.render(&frame);
        Ok(())
    }

    pub fn session(&self) -> &Session<S, C, ST> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<S, C, ST> {
        &mut self.session
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Inter-tick interval statistics over the recent window.
    pub fn frame_stats(&self) -> FrameStats {
        self.frames.stats()
    }
}

/// Assembles a driver: declared states, collaborators, dispatch table,
/// interrupt rules. Dispatch entries referencing undeclared states fail at
/// `build`, like malformed machine declarations.
pub struct DriverBuilder<S, C: Clock, ST: TrialStore> {
    states: Vec<S>,
    clock: C,
    store: ST,
    trials: Vec<Trial>,
    base_record: Record,
    handlers: Vec<(S, Handler<S, C, ST>)>,
    compute: Option<ComputeHook<S, C, ST>>,
    interrupts: Vec<InterruptRule<S>>,
    observer: Option<Box<dyn FnMut(S, S)>>,
}

impl<S, C, ST> DriverBuilder<S, C, ST>
where
    S: Copy + Eq + Hash + Debug + 'static,
    C: Clock,
    ST: TrialStore,
{
    pub fn new(states: impl Into<Vec<S>>, clock: C, store: ST) -> Self {
        Self {
            states: states.into(),
            clock,
            store,
            trials: Vec::new(),
            base_record: Record::new(),
            handlers: Vec::new(),
            compute: None,
            interrupts: Vec::new(),
            observer: None,
        }
    }

    /// The sequenced trial list the session will iterate.
    pub fn trials(mut self, trials: Vec<Trial>) -> Self {
        self.trials = trials;
        self
    }

    /// Ambient fields merged into every saved record.
    pub fn base_record(mut self, record: Record) -> Self {
        self.base_record = record;
        self
    }

    /// Registers the handler invoked while `state` is current.
    pub fn on(
        mut self,
        state: S,
        handler: impl FnMut(&mut Session<S, C, ST>) -> Result<(), MachineError> + 'static,
    ) -> Self {
        self.handlers.push((state, Box::new(handler)));
        self
    }

    /// Per-frame computation hook, run before the state phase.
    pub fn compute(mut self, hook: impl FnMut(&mut Session<S, C, ST>) + 'static) -> Self {
        self.compute = Some(Box::new(hook));
        self
    }

    /// Adds an interrupt rule; `engaged` is polled once per tick.
    pub fn interrupt(
        mut self,
        name: &'static str,
        state: S,
        engaged: impl FnMut() -> bool + 'static,
    ) -> Self {
        self.interrupts.push(InterruptRule::new(name, state, engaged));
        self
    }

    /// Transition observer installed on the machine, e.g. a transition log.
    pub fn on_transition(mut self, observer: impl FnMut(S, S) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn build<R: Renderer<S>>(
        self,
        renderer: R,
    ) -> Result<ExperimentDriver<S, C, ST, R>, MachineError> {
        let mut machine = StateMachine::new(self.states, self.clock.clone())?;
        if let Some(observer) = self.observer {
            machine.on_transition(observer);
        }

        let mut handlers = HashMap::new();
        for (state, handler) in self.handlers {
            if !machine.states().contains(&state) {
                return Err(MachineError::Configuration {
                    reason: format!("handler registered for undeclared state `{state:?}`"),
                });
            }
            if handlers.insert(state, handler).is_some() {
                return Err(MachineError::Configuration {
                    reason: format!("duplicate handler for state `{state:?}`"),
                });
            }
        }
        for rule in &self.interrupts {
            if !machine.states().contains(&rule.state) {
                return Err(MachineError::Configuration {
                    reason: format!(
                        "interrupt `{}` targets undeclared state `{:?}`",
                        rule.name, rule.state
                    ),
                });
            }
        }

        let session = Session::new(machine, self.trials, self.base_record, self.store);
        Ok(ExperimentDriver {
            session,
            handlers,
            compute: self.compute,
            interrupts: self.interrupts,
            renderer,
            clock: self.clock,
            frames: FrameMonitor::default(),
            last_tick: None,
        })
    }
}
