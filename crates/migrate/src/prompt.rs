use std::io;

use dialoguer::Input;
use services::services::cleanup::Confirmation;

/// Reads the confirmation from the operator's terminal
pub struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }
}
