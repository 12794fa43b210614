//! Boundary contracts for the collaborators the driver orchestrates. The
//! actual I/O lives outside this crate; the driver only starts writes and
//! polls flags.

use psyrun_core::Record;
use std::time::Duration;

/// Write-completion flags for the most recent save. Both false while the
/// write is in flight; the driver reads them across frames instead of
/// blocking on the write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStatus {
    pub successful: bool,
    pub failed: bool,
}

/// Persistence collaborator. `begin_save` must return immediately;
/// completion is reported through `status` on later frames.
pub trait TrialStore {
    fn begin_save(&mut self, record: &Record);
    fn status(&self) -> SaveStatus;
}

/// Snapshot handed to the render collaborator once per tick.
#[derive(Debug, Clone)]
pub struct FrameInfo<S> {
    pub state: S,
    pub trial_index: usize,
    pub trial_count: usize,
    pub time_in_state: Duration,
}

/// Render collaborator, invoked in the render phase of every tick
/// regardless of state.
pub trait Renderer<S> {
    fn render(&mut self, frame: &FrameInfo<S>);
}
