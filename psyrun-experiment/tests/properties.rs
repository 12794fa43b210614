use proptest::prelude::*;
use psyrun_core::BlockSpec;
use psyrun_experiment::{StateMachine, TrialSequencer};
use psyrun_timing::ManualClock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Main,
    Fullscreen,
    Attention,
}

proptest! {
    #[test]
    fn expansion_preserves_counts_rows_and_order(
        conditions in 1usize..6,
        repetitions in 0usize..4,
        shuffle in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let column: Vec<_> = (0..conditions).map(|i| json!(i)).collect();
        let block = BlockSpec::new("block", repetitions, shuffle)
            .with_variable("row", column.clone())
            .with_variable("echo", column);

        let mut sequencer = TrialSequencer::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let appended = sequencer.append_blocks(&[block], &mut rng).unwrap();
        prop_assert_eq!(appended, repetitions * conditions);

        for (cycle, chunk) in sequencer.trials().chunks(conditions).enumerate() {
            let rows: Vec<u64> = chunk
                .iter()
                .map(|t| t.value("row").unwrap().as_u64().unwrap())
                .collect();
            let identity: Vec<u64> = (0..conditions as u64).collect();

            // Every repetition is a permutation of the conditions, and the
            // identity permutation exactly when shuffling is off.
            let mut sorted = rows.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&sorted, &identity);
            if !shuffle {
                prop_assert_eq!(&rows, &identity);
            }

            for trial in chunk {
                // Variables drawn from the same original row stay together.
                prop_assert_eq!(trial.value("row"), trial.value("echo"));
                prop_assert_eq!(trial.cycle_index, cycle);
                prop_assert_eq!(trial.block_index, 0);
            }
        }
    }

    #[test]
    fn counters_accumulate_across_calls(
        reps_per_call in proptest::collection::vec(1usize..4, 1..5),
        seed in any::<u64>(),
    ) {
        let mut sequencer = TrialSequencer::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut expected_trials = 0;
        let mut expected_cycles = 0;

        for (call, &repetitions) in reps_per_call.iter().enumerate() {
            let block = BlockSpec::new(format!("call-{call}"), repetitions, false)
                .with_variable("v", vec![json!("a"), json!("b")]);
            sequencer.append_blocks(&[block], &mut rng).unwrap();
            expected_trials += repetitions * 2;
            expected_cycles += repetitions;

            let last = sequencer.trials().last().unwrap();
            prop_assert_eq!(sequencer.len(), expected_trials);
            prop_assert_eq!(last.block_index, call);
            prop_assert_eq!(last.cycle_index, expected_cycles - 1);
        }
    }

    #[test]
    fn stack_discipline_matches_a_model(ops in proptest::collection::vec(any::<bool>(), 0..32)) {
        let machine_states = vec![Stage::Main, Stage::Fullscreen, Stage::Attention];
        let mut machine = StateMachine::new(machine_states.clone(), ManualClock::new()).unwrap();
        let mut model: Vec<Stage> = Vec::new();

        for (step, push) in ops.into_iter().enumerate() {
            if push {
                let target = machine_states[step % machine_states.len()];
                model.push(machine.current());
                machine.push(target).unwrap();
                prop_assert_eq!(machine.current(), target);
            } else if let Some(expected) = model.pop() {
                machine.pop().unwrap();
                prop_assert_eq!(machine.current(), expected);
            } else {
                prop_assert!(machine.pop().is_err());
            }
            prop_assert_eq!(machine.stack_depth(), model.len());
        }
    }
}
