//! Overwrite confirmation

use crate::error::{MiqroforgeError, Result};
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use std::io::IsTerminal;
use std::sync::Arc;

/// Asks the operator a yes/no question
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on the controlling terminal, defaulting to "no"
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            return Err(MiqroforgeError::Prompt(
                "stdin is not a terminal; pass --yes to overwrite without asking".to_string(),
            ));
        }

        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(answer)
    }
}

/// Always gives the same answer
pub struct FixedAnswer(pub bool);

impl Confirmer for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}

impl<C: Confirmer + ?Sized> Confirmer for Arc<C> {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        (**self).confirm(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_answer_through_arc() {
        let shared: Arc<dyn Confirmer> = Arc::new(FixedAnswer(true));
        let boxed: Box<dyn Confirmer> = Box::new(shared.clone());
        assert!(boxed.confirm("Overwrite?").unwrap());
        assert!(!FixedAnswer(false).confirm("Overwrite?").unwrap());
    }
}
