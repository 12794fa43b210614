pub mod driver;
pub mod hooks;
pub mod interrupt;
pub mod session;

pub use driver::{DriverBuilder, ExperimentDriver, Handler};
pub use hooks::{FrameInfo, Renderer, SaveStatus, TrialStore};
pub use interrupt::InterruptRule;
pub use session::Session;
