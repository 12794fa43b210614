use std::fmt;

/// External condition polled once per tick. While `engaged` reports false,
/// the driver suspends normal flow in `state`; when it reports true again the
/// state is popped and flow resumes exactly where it was suspended.
///
/// Typical monitors: fullscreen engagement, pointer lock, connectivity.
pub struct InterruptRule<S> {
    pub name: &'static str,
    pub state: S,
    pub engaged: Box<dyn FnMut() -> bool>,
}

impl<S> InterruptRule<S> {
    pub fn new(name: &'static str, state: S, engaged: impl FnMut() -> bool + 'static) -> Self {
        Self {
            name,
            state,
            engaged: Box::new(engaged),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for InterruptRule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptRule")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
