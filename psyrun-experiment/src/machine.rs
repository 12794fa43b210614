use psyrun_core::MachineError;
use psyrun_timing::Clock;
use std::fmt::Debug;
use std::time::Duration;

type Observer<S> = Box<dyn FnMut(S, S)>;

/// Finite state machine with push/pop nesting over a state set declared once
/// at construction. The declared set is immutable afterwards; every transition
/// restamps the entry time and re-arms the per-state `once` hook.
///
/// States are positional: `between` compares ordinals in declaration order, so
/// callers must declare states in the phase order they intend to query.
pub struct StateMachine<S, C: Clock> {
    states: Vec<S>,
    current: usize,
    stack: Vec<usize>,
    entered_at: C::Timestamp,
    once_fired: Vec<bool>,
    observer: Option<Observer<S>>,
    clock: C,
}

impl<S, C> StateMachine<S, C>
where
    S: Copy + Eq + Debug,
    C: Clock,
{
    /// Declares the state set. The first declared state becomes current.
    pub fn new(states: impl Into<Vec<S>>, clock: C) -> Result<Self, MachineError> {
        let states = states.into();
        if states.is_empty() {
            return Err(MachineError::Configuration {
                reason: "no states declared".into(),
            });
        }
        for (i, state) in states.iter().enumerate() {
            if states[..i].contains(state) {
                return Err(MachineError::Configuration {
                    reason: format!("duplicate state `{state:?}`"),
                });
            }
        }
        let entered_at = clock.now();
        let count = states.len();
        Ok(Self {
            states,
            current: 0,
            stack: Vec::new(),
            entered_at,
            once_fired: vec![false; count],
            observer: None,
            clock,
        })
    }

    /// Installs the observer invoked synchronously on every transition with
    /// `(from, to)`. Observers must not tick or transition the machine.
    pub fn on_transition(&mut self, observer: impl FnMut(S, S) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn current(&self) -> S {
        self.states[self.current]
    }

    pub fn is(&self, state: S) -> bool {
        self.current() == state
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Transitions to `target`. A self-transition is a real transition: the
    /// entry timer restarts and the `once` hook re-arms.
    pub fn next(&mut self, target: S) -> Result<(), MachineError> {
        let idx = self.ordinal(target)?;
        self.enter(idx);
        Ok(())
    }

    /// Saves the current state, then transitions to `target`. Used to suspend
    /// normal flow for an interrupt and resume it later with `pop`.
    pub fn push(&mut self, target: S) -> Result<(), MachineError> {
        let idx = self.ordinal(target)?;
        self.stack.push(self.current);
        self.enter(idx);
        Ok(())
    }

    /// Restores the most recently pushed state as a full transition.
    pub fn pop(&mut self) -> Result<(), MachineError> {
        let idx = self.stack.pop().ok_or(MachineError::EmptyStack)?;
        self.enter(idx);
        Ok(())
    }

    /// Runs `hook` at most once per entry into the current state. Later calls
    /// during the same entry do nothing.
    pub fn once(&mut self, hook: impl FnOnce()) {
        if !self.once_fired[self.current] {
            self.once_fired[self.current] = true;
            hook();
        }
    }

    /// True iff time since the last transition into the current state strictly
    /// exceeds `timeout`. Pure query.
    pub fn expired(&self, timeout: Duration) -> bool {
        self.clock.elapsed(self.entered_at) > timeout
    }

    /// Time since the last transition into the current state.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed(self.entered_at)
    }

    /// True iff the current state's ordinal lies in the declaration-order
    /// range `a..b`, each bound's inclusivity honored independently.
    pub fn between(
        &self,
        a: S,
        b: S,
        inclusive_a: bool,
        inclusive_b: bool,
    ) -> Result<bool, MachineError> {
        let lo = self.ordinal(a)?;
        let hi = self.ordinal(b)?;
        let above = if inclusive_a {
            self.current >= lo
        } else {
            self.current > lo
        };
        let below = if inclusive_b {
            self.current <= hi
        } else {
            self.current < hi
        };
        Ok(above && below)
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// True iff `state` is suspended on the stack.
    pub fn stacked(&self, state: S) -> bool {
        self.stack.iter().any(|&idx| self.states[idx] == state)
    }

    fn ordinal(&self, state: S) -> Result<usize, MachineError> {
        self.states
            .iter()
            .position(|s| *s == state)
            .ok_or_else(|| MachineError::UnknownState {
                state: format!("{state:?}"),
            })
    }

    fn enter(&mut self, target: usize) {
        let from = self.states[self.current];
        self.current = target;
        self.once_fired[target] = false;
        self.entered_at = self.clock.now();
        if let Some(observer) = &mut self.observer {
            observer(from, self.states[target]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyrun_timing::ManualClock;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Consent,
        Setup,
        Go,
        Finish,
        Fullscreen,
    }
    use Phase::*;

    fn machine() -> (StateMachine<Phase, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let machine =
            StateMachine::new(vec![Consent, Setup, Go, Finish, Fullscreen], clock.clone())
                .unwrap();
        (machine, clock)
    }

    #[test]
    fn starts_in_first_declared_state() {
        let (machine, _) = machine();
        assert_eq!(machine.current(), Consent);
        assert_eq!(machine.stack_depth(), 0);
    }

    #[test]
    fn rejects_empty_declaration() {
        let result = StateMachine::<Phase, _>::new(vec![], ManualClock::new());
        assert!(matches!(result, Err(MachineError::Configuration { .. })));
    }

    #[test]
    fn rejects_duplicate_states() {
        let result = StateMachine::new(vec![Consent, Go, Consent], ManualClock::new());
        assert!(matches!(result, Err(MachineError::Configuration { .. })));
    }

    #[test]
    fn next_rejects_undeclared_target() {
        let clock = ManualClock::new();
        let mut machine = StateMachine::new(vec![Consent, Setup], clock).unwrap();
        assert!(matches!(
            machine.next(Go),
            Err(MachineError::UnknownState { .. })
        ));
        // The failed call is not a transition.
        assert_eq!(machine.current(), Consent);
    }

    #[test]
    fn transition_restarts_the_entry_timer() {
        let (mut machine, clock) = machine();
        clock.advance(Duration::from_secs(5));
        assert!(machine.expired(Duration::from_secs(4)));

        machine.next(Setup).unwrap();
        clock.advance(Duration::from_millis(1));
        assert!(machine.expired(Duration::ZERO));
        assert!(!machine.expired(Duration::from_secs(100)));
    }

    #[test]
    fn self_transition_is_a_fresh_entry() {
        let (mut machine, clock) = machine();
        machine.next(Go).unwrap();
        clock.advance(Duration::from_secs(2));

        machine.next(Go).unwrap();
        assert!(!machine.expired(Duration::from_secs(1)));
    }

    #[test]
    fn push_pop_restores_in_lifo_order() {
        let (mut machine, _) = machine();
        machine.next(Go).unwrap();
        machine.push(Fullscreen).unwrap();
        machine.push(Finish).unwrap();
        assert_eq!(machine.current(), Finish);
        assert_eq!(machine.stack_depth(), 2);
        assert!(machine.stacked(Fullscreen));

        machine.pop().unwrap();
        assert_eq!(machine.current(), Fullscreen);
        machine.pop().unwrap();
        assert_eq!(machine.current(), Go);
        assert_eq!(machine.pop(), Err(MachineError::EmptyStack));
    }

    #[test]
    fn once_fires_once_per_entry() {
        let (mut machine, _) = machine();
        let count = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let count = Rc::clone(&count);
            machine.once(move || count.set(count.get() + 1));
        }
        assert_eq!(count.get(), 1);

        // Re-entering the same state re-arms the hook.
        machine.next(Consent).unwrap();
        let hook_count = Rc::clone(&count);
        machine.once(move || hook_count.set(hook_count.get() + 1));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn pop_re_arms_once_for_the_restored_state() {
        let (mut machine, _) = machine();
        let count = Rc::new(Cell::new(0));

        let hook = Rc::clone(&count);
        machine.once(move || hook.set(hook.get() + 1));
        machine.push(Fullscreen).unwrap();
        machine.pop().unwrap();

        let hook = Rc::clone(&count);
        machine.once(move || hook.set(hook.get() + 1));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn between_honors_each_bound_independently() {
        // Declared order: Consent, Setup, Go, Finish, Fullscreen.
        let (mut machine, _) = machine();

        machine.next(Setup).unwrap();
        assert!(machine.between(Setup, Finish, true, false).unwrap());
        machine.next(Go).unwrap();
        assert!(machine.between(Setup, Finish, true, false).unwrap());
        machine.next(Finish).unwrap();
        assert!(!machine.between(Setup, Finish, true, false).unwrap());
        assert!(machine.between(Setup, Finish, true, true).unwrap());
        machine.next(Consent).unwrap();
        assert!(!machine.between(Setup, Finish, true, false).unwrap());
        machine.next(Fullscreen).unwrap();
        assert!(!machine.between(Setup, Finish, true, false).unwrap());
    }

    #[test]
    fn observer_sees_every_transition() {
        let (mut machine, _) = machine();
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        machine.on_transition(move |from, to| sink.borrow_mut().push((from, to)));

        machine.next(Setup).unwrap();
        machine.push(Fullscreen).unwrap();
        machine.pop().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![(Consent, Setup), (Setup, Fullscreen), (Fullscreen, Setup)]
        );
    }
}
