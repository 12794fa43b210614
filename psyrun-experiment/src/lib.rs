pub mod config;
pub mod machine;
pub mod sequence;

pub use config::ExperimentConfig;
pub use machine::StateMachine;
pub use sequence::TrialSequencer;
