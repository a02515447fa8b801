//! Terminal implementation of the `Prompter` port.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};

use crate::application::ports::Prompter;
use crate::domain::Secret;

/// Reads operator input from the controlling terminal via `dialoguer`.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn password(
        &self,
        prompt: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<Secret> {
        let value = Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match")
            .validate_with(|input: &String| validate(input))
            .interact()
            .context("cannot read password (is stdin a terminal?)")?;
        Ok(Secret::new(value))
    }

    fn input(
        &self,
        prompt: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .validate_with(|input: &String| validate(input.trim()))
            .interact_text()
            .map(|value| value.trim().to_string())
            .context("cannot read input (is stdin a terminal?)")
    }
}
