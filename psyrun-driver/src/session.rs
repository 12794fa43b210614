use crate::hooks::{SaveStatus, TrialStore};
use psyrun_core::{Record, Trial, merge_records};
use psyrun_experiment::StateMachine;
use psyrun_timing::Clock;
use serde_json::Value;
use std::io;

/// Mutable context handed to state handlers: the machine, the sequenced
/// trial list with a cursor, ambient record fields, per-trial measured
/// results, and the persistence collaborator.
pub struct Session<S, C: Clock, ST: TrialStore> {
    pub machine: StateMachine<S, C>,
    trials: Vec<Trial>,
    cursor: usize,
    base_record: Record,
    results: Record,
    store: ST,
    saved: Vec<Record>,
}

impl<S, C, ST> Session<S, C, ST>
where
    S: Copy + Eq + std::fmt::Debug,
    C: Clock,
    ST: TrialStore,
{
    pub(crate) fn new(
        machine: StateMachine<S, C>,
        trials: Vec<Trial>,
        base_record: Record,
        store: ST,
    ) -> Self {
        Self {
            machine,
            trials,
            cursor: 0,
            base_record,
            results: Record::new(),
            store,
            saved: Vec::new(),
        }
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        self.trials.get(self.cursor)
    }

    pub fn trial_index(&self) -> usize {
        self.cursor
    }

    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    /// True while the cursor points at a trial still to run.
    pub fn trials_remaining(&self) -> bool {
        self.cursor < self.trials.len()
    }

    /// Moves the cursor to the next trial and clears the measured results.
    /// Returns false once the sequence is exhausted.
    pub fn advance_trial(&mut self) -> bool {
        self.results.clear();
        self.cursor += 1;
        self.trials_remaining()
    }

    /// Stores a measured result for the current trial, e.g. a reaction time.
    pub fn record(&mut self, key: impl Into<String>, value: Value) {
        self.results.insert(key.into(), value);
    }

    /// The record that would be saved right now: ambient base fields, then
    /// the trial's bookkeeping and variables, then measured results. Each
    /// layer is deep-copied, so records never alias between trials.
    pub fn trial_record(&self) -> Record {
        let mut record = match self.current_trial() {
            Some(trial) => merge_records(&self.base_record, &trial.to_record()),
            None => self.base_record.clone(),
        };
        record = merge_records(&record, &self.results);
        record
    }

    /// Builds the current trial record and hands it to the store. The write
    /// completes asynchronously; poll `save_status` on later frames.
    pub fn save_trial(&mut self) {
        let record = self.trial_record();
        self.store.begin_save(&record);
        self.saved.push(record);
    }

    pub fn save_status(&self) -> SaveStatus {
        self.store.status()
    }

    /// Records submitted to the store so far, in submission order.
    pub fn saved_records(&self) -> &[Record] {
        &self.saved
    }

    pub fn store(&self) -> &ST {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ST {
        &mut self.store
    }

    /// Writes all submitted records as pretty-printed JSON.
    pub fn export_results<W: io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, &self.saved)
    }
}
