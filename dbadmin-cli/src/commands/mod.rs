///! Command handlers
///!
///! Each handler builds the panel for its resource, drives it once and prints
///! the result. Panel notifications are printed as they are; any error
///! notification turns into a failed command.

pub mod audit;
pub mod backup;
pub mod database;
pub mod migration;
pub mod shell;
pub mod stats;
pub mod tenant;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::Transport;
use crate::notify::Level;
use crate::output::{self, OutputFormat};
use crate::panels::{PanelCore, PanelOptions};

/// Asks the operator before a destructive action is dispatched
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Interactive yes/no prompt on the terminal
pub struct PromptConfirmer;

impl Confirmer for PromptConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Accepts every prompt (`--yes`)
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Everything a command handler needs
pub struct Context {
    pub transport: Arc<dyn Transport>,
    pub options: PanelOptions,
    pub format: OutputFormat,
    pub confirmer: Box<dyn Confirmer>,
}

impl Context {
    pub fn new(
        transport: Arc<dyn Transport>,
        options: PanelOptions,
        format: OutputFormat,
        assume_yes: bool,
    ) -> Self {
        let confirmer: Box<dyn Confirmer> = if assume_yes {
            Box::new(AssumeYes)
        } else {
            Box::new(PromptConfirmer)
        };
        Self {
            transport,
            options,
            format,
            confirmer,
        }
    }
}

/// Spinner on stderr while a request is in flight. Hidden when stderr is
/// not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print everything the panel queued and fail if any of it was an error
pub fn finish(core: &mut PanelCore) -> Result<()> {
    let notifications = core.notifications.drain();
    let errors: Vec<String> = notifications
        .iter()
        .filter(|n| n.level == Level::Error)
        .map(|n| n.message.clone())
        .collect();

    output::print_notifications(
        notifications
            .into_iter()
            .filter(|n| n.level != Level::Error)
            .collect(),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("{}", errors.join("; "))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;

    use super::*;
    use crate::testing::FakeBackend;

    /// Replays canned answers and records the prompts it was shown
    pub struct Scripted {
        pub answers: RefCell<Vec<bool>>,
        pub prompts: RefCell<Vec<String>>,
    }

    impl Confirmer for Scripted {
        fn confirm(&self, prompt: &str) -> Result<bool> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(self.answers.borrow_mut().pop().unwrap_or(false))
        }
    }

    impl<C: Confirmer + ?Sized> Confirmer for std::rc::Rc<C> {
        fn confirm(&self, prompt: &str) -> Result<bool> {
            (**self).confirm(prompt)
        }
    }

    pub fn context(backend: &FakeBackend, answers: Vec<bool>) -> (Context, std::rc::Rc<Scripted>) {
        let scripted = std::rc::Rc::new(Scripted {
            answers: RefCell::new(answers),
            prompts: RefCell::new(Vec::new()),
        });
        let ctx = Context {
            transport: backend.transport(),
            options: PanelOptions::default(),
            format: OutputFormat::Json,
            confirmer: Box::new(std::rc::Rc::clone(&scripted)),
        };
        (ctx, scripted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[test]
    fn test_finish_fails_on_error_notifications() {
        let backend = FakeBackend::new();
        let mut core = PanelCore::new(backend.transport(), &PanelOptions::default());

        core.notifications.success("ok");
        assert!(finish(&mut core).is_ok());
        assert!(core.notifications.is_empty());

        core.notifications.error("Failed to load backups: boom");
        let err = finish(&mut core).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load backups: boom");
    }

    #[test]
    fn test_assume_yes_confirms() {
        assert!(AssumeYes.confirm("Delete?").unwrap());
    }
}
