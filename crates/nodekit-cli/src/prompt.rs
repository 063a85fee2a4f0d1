//! Interactive input, kept behind a trait so the deploy flow can run unattended

use color_eyre::eyre::{eyre, Result};
use dialoguer::{Confirm, Input, Password};

/// Source of operator answers
pub trait Prompter {
    /// Whether a human is available to answer free-form questions
    fn is_interactive(&self) -> bool;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Free text; an empty answer means "skip"
    fn input(&self, prompt: &str) -> Result<String>;

    /// Hidden input for secrets
    fn secret(&self, prompt: &str) -> Result<String>;
}

/// Prompts on the controlling terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        true
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }
}

/// `--yes`: every confirmation is accepted and free-form questions are skipped
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn is_interactive(&self) -> bool {
        false
    }

    fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }

    fn input(&self, _prompt: &str) -> Result<String> {
        Ok(String::new())
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        Err(eyre!("'{}' needs an answer but --yes was given", prompt))
    }
}
