//! Terminal prompts.

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use weightfetch::interaction::Confirmation;
use weightfetch::{FetchError, FetchResult};

use crate::error::CliError;

/// Questions the installer asks the user.
pub trait Interaction {
    /// Pick one of `items`; returns its index.
    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize, CliError>;

    /// Yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CliError>;

    /// Masked secret entry.
    fn secret(&self, prompt: &str) -> Result<String, CliError>;

    /// Wait for the user to press enter.
    fn pause(&self, prompt: &str) -> Result<(), CliError>;
}

/// `dialoguer` prompts on the controlling terminal.
pub struct ConsoleInteraction {
    theme: ColorfulTheme,
}

impl ConsoleInteraction {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for ConsoleInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for ConsoleInteraction {
    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize, CliError> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CliError> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn secret(&self, prompt: &str) -> Result<String, CliError> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()?)
    }

    fn pause(&self, prompt: &str) -> Result<(), CliError> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(())
    }
}

/// Lets library code ask yes/no questions through an [`Interaction`].
///
/// Ctrl-C at the prompt becomes [`FetchError::Interrupted`]; any other prompt
/// failure answers with the default.
pub struct PromptConfirmation<'a> {
    interaction: &'a dyn Interaction,
}

impl<'a> PromptConfirmation<'a> {
    pub fn new(interaction: &'a dyn Interaction) -> Self {
        Self { interaction }
    }
}

impl Confirmation for PromptConfirmation<'_> {
    fn confirm(&self, prompt: &str, default: bool) -> FetchResult<bool> {
        match self.interaction.confirm(prompt, default) {
            Ok(answer) => Ok(answer),
            Err(e) if e.is_interrupt() => Err(FetchError::Interrupted),
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation prompt failed, using default");
                Ok(default)
            }
        }
    }
}

/// A canned answer for [`ScriptedInteraction`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Select(usize),
    Confirm(bool),
    Secret(String),
    /// Accept whatever default the prompt offers.
    Default,
    /// The user presses Ctrl-C at the prompt.
    Interrupt,
}

/// Replays canned answers in order and records every prompt.
///
/// Once the script runs out every prompt takes its default, and secret
/// prompts fail.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    answers: RefCell<VecDeque<Answer>>,
    prompts: RefCell<Vec<String>>,
}

#[cfg(test)]
impl ScriptedInteraction {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Prompts asked so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    /// Answers not consumed.
    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }

    fn next(&self, prompt: &str) -> Answer {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(Answer::Default)
    }
}

#[cfg(test)]
impl Interaction for ScriptedInteraction {
    fn select(&self, prompt: &str, _items: &[&str], default: usize) -> Result<usize, CliError> {
        match self.next(prompt) {
            Answer::Select(i) => Ok(i),
            Answer::Default => Ok(default),
            Answer::Interrupt => Err(CliError::Interrupted),
            other => Err(CliError::Prompt(format!("expected selection, got {:?}", other))),
        }
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CliError> {
        match self.next(prompt) {
            Answer::Confirm(b) => Ok(b),
            Answer::Default => Ok(default),
            Answer::Interrupt => Err(CliError::Interrupted),
            other => Err(CliError::Prompt(format!("expected yes/no, got {:?}", other))),
        }
    }

    fn secret(&self, prompt: &str) -> Result<String, CliError> {
        match self.next(prompt) {
            Answer::Secret(s) => Ok(s),
            Answer::Interrupt => Err(CliError::Interrupted),
            other => Err(CliError::Prompt(format!("expected secret, got {:?}", other))),
        }
    }

    fn pause(&self, prompt: &str) -> Result<(), CliError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(())
    }
}
