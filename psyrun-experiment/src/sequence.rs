use psyrun_core::{BlockSpec, SequenceError, Trial};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Expands block specifications into the flat, ordered trial list the session
/// iterates. Randomization happens here, once, before any trial runs.
///
/// The sequencer is append-only: later calls add trials after earlier ones,
/// and the block/cycle counters keep increasing across calls.
#[derive(Debug, Clone, Default)]
pub struct TrialSequencer {
    trials: Vec<Trial>,
    blocks_emitted: usize,
    cycles_emitted: usize,
}

impl TrialSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `blocks`, then expands them in input order and appends the
    /// resulting trials. Returns the number of trials appended.
    ///
    /// Validation runs over the whole call before anything is emitted, so a
    /// ragged block leaves the sequencer untouched.
    pub fn append_blocks<R: Rng + ?Sized>(
        &mut self,
        blocks: &[BlockSpec],
        rng: &mut R,
    ) -> Result<usize, SequenceError> {
        for block in blocks {
            validate_shape(block)?;
        }

        let before = self.trials.len();
        for block in blocks {
            let conditions = block.num_conditions();
            if conditions == 0 || block.repetitions == 0 {
                // Nothing to emit; neither counter advances.
                continue;
            }
            let block_index = self.blocks_emitted;
            for _ in 0..block.repetitions {
                let mut order: Vec<usize> = (0..conditions).collect();
                if block.shuffle {
                    order.shuffle(rng);
                }
                let cycle_index = self.cycles_emitted;
                for &row in &order {
                    let mut values = BTreeMap::new();
                    for (variable, column) in &block.variables {
                        values.insert(variable.clone(), column[row].clone());
                    }
                    self.trials.push(Trial {
                        block_name: block.name.clone(),
                        block_index,
                        cycle_index,
                        values,
                    });
                }
                self.cycles_emitted += 1;
            }
            self.blocks_emitted += 1;
        }
        Ok(self.trials.len() - before)
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn get(&self, index: usize) -> Option<&Trial> {
        self.trials.get(index)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Consumes the sequencer, yielding the trial list for the session.
    pub fn into_trials(self) -> Vec<Trial> {
        self.trials
    }
}

fn validate_shape(block: &BlockSpec) -> Result<(), SequenceError> {
    let mut expected = None;
    for (variable, column) in &block.variables {
        match expected {
            None => expected = Some(column.len()),
            Some(len) if column.len() != len => {
                return Err(SequenceError::BlockShape {
                    block: block.name.clone(),
                    variable: variable.clone(),
                    expected: len,
                    found: column.len(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
