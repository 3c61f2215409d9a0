//! Yes/no questions the library needs answered by its front end.

use crate::error::FetchResult;

/// Answers a yes/no question.
///
/// The CLI implements this with a terminal prompt; unattended runs and tests
/// use [`AutoConfirm`].
pub trait Confirmation {
    /// Ask `prompt`, falling back to `default` when the user just presses enter.
    ///
    /// Returns [`FetchError::Interrupted`](crate::FetchError::Interrupted) if
    /// the user presses Ctrl-C at the prompt.
    fn confirm(&self, prompt: &str, default: bool) -> FetchResult<bool>;
}

/// Answers every question the same way without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoConfirm(pub bool);

impl Confirmation for AutoConfirm {
    fn confirm(&self, prompt: &str, _default: bool) -> FetchResult<bool> {
        tracing::debug!(prompt, answer = self.0, "Auto-answered confirmation");
        Ok(self.0)
    }
}
