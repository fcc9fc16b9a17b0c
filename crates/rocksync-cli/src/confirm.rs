//! Interactive confirmation before a sync touches the device

use anyhow::Result;
use dialoguer::Input;

/// Question asked before syncing
pub const PROMPT: &str = "Do you want to proceed with the sync? [Y (Default) / N]";

/// Whether `answer` means yes; an empty answer is the default yes
pub fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

/// Ask on the terminal whether to proceed
pub fn confirm_sync() -> Result<bool> {
    let answer: String = Input::new()
        .with_prompt(PROMPT)
        .allow_empty(true)
        .interact_text()?;
    Ok(parse_confirmation(&answer))
}
