//! Question/answer boundary between the safety layer and the user.
//!
//! The confirmation layer and the elevation flow only talk to a [`Prompter`].
//! [`DialoguerPrompter`] drives a real terminal; [`ScriptedPrompter`] replays
//! prepared answers for tests and automation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dialoguer::{Input, Select};
use parking_lot::Mutex;
use tracing::{debug, warn};

#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask the user to pick one of `choices`. `None` means the question timed
    /// out or was cancelled.
    async fn ask(
        &self,
        question: &str,
        choices: &[String],
        timeout: Option<Duration>,
    ) -> Option<usize>;

    /// Ask the user to type `required_text` exactly. Anything else, a timeout
    /// or a cancellation returns `false`.
    async fn ask_typed_confirmation(
        &self,
        prompt: &str,
        required_text: &str,
        timeout: Option<Duration>,
    ) -> bool;

    /// Display informational text such as a preview or dry-run listing.
    fn show(&self, message: &str);

    /// Whether [`Prompter::show`] output may carry ANSI styling.
    fn supports_color(&self) -> bool {
        false
    }
}

/// Yes/no question on top of [`Prompter::ask`]. Timeouts count as "no".
pub async fn confirm(prompter: &dyn Prompter, question: &str, timeout: Option<Duration>) -> bool {
    let choices = ["Yes".to_string(), "No".to_string()];
    matches!(prompter.ask(question, &choices, timeout).await, Some(0))
}

/// Terminal prompter backed by `dialoguer`.
///
/// A blocking terminal read cannot be cancelled, so a prompt that times out
/// keeps the terminal until the user presses enter. Until then every further
/// question on this prompter is answered as a timeout instead of starting a
/// second reader on the same terminal.
#[derive(Debug, Clone, Default)]
pub struct DialoguerPrompter {
    in_flight: Arc<AtomicBool>,
}

/// Marks the terminal free again when the blocking read ends, even by panic.
struct TerminalClaim(Arc<AtomicBool>);

impl Drop for TerminalClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A prompt, possibly one that already timed out, is still reading the terminal.
    pub fn is_terminal_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    async fn run_blocking<T, F>(&self, timeout: Option<Duration>, task: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Option<T> + Send + 'static,
    {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("An earlier prompt still owns the terminal; treating this one as timed out");
            return None;
        }
        let claim = TerminalClaim(Arc::clone(&self.in_flight));
        let handle = tokio::task::spawn_blocking(move || {
            let _claim = claim;
            task()
        });
        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    debug!(?limit, "Prompt timed out");
                    return None;
                }
            },
            None => handle.await,
        };
        match joined {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, "Prompt task failed");
                None
            }
        }
    }
}

/// Exact comparison for typed confirmations. Only the line terminator the
/// terminal may leave behind is ignored.
pub fn typed_text_matches(typed: &str, required: &str) -> bool {
    let typed = typed
        .strip_suffix("\r\n")
        .or_else(|| typed.strip_suffix('\n'))
        .unwrap_or(typed);
    typed == required
}

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn ask(
        &self,
        question: &str,
        choices: &[String],
        timeout: Option<Duration>,
    ) -> Option<usize> {
        let question = question.to_string();
        let choices = choices.to_vec();
        self.run_blocking(timeout, move || {
            match Select::new()
                .with_prompt(question)
                .items(&choices)
                .default(0)
                .interact_opt()
            {
                Ok(selection) => selection,
                Err(error) => {
                    warn!(%error, "Selection prompt failed");
                    None
                }
            }
        })
        .await
    }

    async fn ask_typed_confirmation(
        &self,
        prompt: &str,
        required_text: &str,
        timeout: Option<Duration>,
    ) -> bool {
        let prompt = prompt.to_string();
        let typed = self.run_blocking(timeout, move || {
            match Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
            {
                Ok(text) => Some(text),
                Err(error) => {
                    warn!(%error, "Typed confirmation prompt failed");
                    None
                }
            }
        })
        .await;
        typed.is_some_and(|text| typed_text_matches(&text, required_text))
    }

    fn show(&self, message: &str) {
        eprintln!("{message}");
    }

    fn supports_color(&self) -> bool {
        true
    }
}

/// A prepared answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    /// Pick the choice at this index.
    Choice(usize),
    /// Pick the first choice whose label starts with this text.
    Label(String),
    /// Type this text at a typed confirmation.
    Typed(String),
    /// Let the question time out.
    Timeout,
}

/// Replays answers in order and records everything it was asked.
///
/// When the script runs out every further question times out.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    asked: Mutex<Vec<String>>,
    shown: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Questions and typed-confirmation prompts in the order they were asked.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }

    fn next_answer(&self, question: &str) -> Option<ScriptedAnswer> {
        self.asked.lock().push(question.to_string());
        self.answers.lock().pop_front()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask(
        &self,
        question: &str,
        choices: &[String],
        _timeout: Option<Duration>,
    ) -> Option<usize> {
        match self.next_answer(question)? {
            ScriptedAnswer::Choice(index) if index < choices.len() => Some(index),
            ScriptedAnswer::Label(label) => choices
                .iter()
                .position(|choice| choice.starts_with(label.as_str())),
            ScriptedAnswer::Choice(_) | ScriptedAnswer::Typed(_) | ScriptedAnswer::Timeout => None,
        }
    }

    async fn ask_typed_confirmation(
        &self,
        prompt: &str,
        required_text: &str,
        _timeout: Option<Duration>,
    ) -> bool {
        matches!(
            self.next_answer(prompt),
            Some(ScriptedAnswer::Typed(text)) if text == required_text
        )
    }

    fn show(&self, message: &str) {
        self.shown.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| (*label).to_string()).collect()
    }

    #[tokio::test]
    async fn scripted_answers_replay_in_order() {
        let prompter = ScriptedPrompter::new([
            ScriptedAnswer::Label("Deny".into()),
            ScriptedAnswer::Choice(0),
            ScriptedAnswer::Typed("/etc/hosts".into()),
        ]);
        let options = choices(&["Approve", "Deny"]);

        assert_eq!(prompter.ask("first?", &options, None).await, Some(1));
        assert!(confirm(&prompter, "second?", None).await);
        assert!(
            prompter
                .ask_typed_confirmation("type it", "/etc/hosts", None)
                .await
        );
        assert_eq!(prompter.asked(), vec!["first?", "second?", "type it"]);
    }

    #[tokio::test]
    async fn exhausted_script_behaves_like_timeout() {
        let prompter = ScriptedPrompter::default();
        assert_eq!(prompter.ask("q", &choices(&["a"]), None).await, None);
        assert!(!confirm(&prompter, "q", None).await);
        assert!(!prompter.ask_typed_confirmation("p", "x", None).await);
    }

    #[tokio::test]
    async fn typed_mismatch_denies() {
        let prompter = ScriptedPrompter::new([ScriptedAnswer::Typed("/etc/host".into())]);
        assert!(
            !prompter
                .ask_typed_confirmation("type it", "/etc/hosts", None)
                .await
        );
    }

    #[test]
    fn typed_text_must_match_exactly() {
        assert!(typed_text_matches("/etc/hosts", "/etc/hosts"));
        assert!(typed_text_matches("/etc/hosts\n", "/etc/hosts"));
        assert!(typed_text_matches("/etc/hosts\r\n", "/etc/hosts"));
        assert!(!typed_text_matches("  /etc/hosts ", "/etc/hosts"));
        assert!(!typed_text_matches("/etc/hosts ", "/etc/hosts"));
        assert!(!typed_text_matches("/ETC/HOSTS", "/etc/hosts"));
        assert!(typed_text_matches("/tmp/notes ", "/tmp/notes "));
        assert!(!typed_text_matches("/tmp/notes", "/tmp/notes "));
    }

    #[tokio::test]
    async fn busy_terminal_answers_as_timeout_without_reading() {
        let prompter = DialoguerPrompter::new();
        let claim = TerminalClaim(Arc::clone(&prompter.in_flight));
        prompter.in_flight.store(true, Ordering::Release);

        assert!(prompter.is_terminal_busy());
        assert_eq!(prompter.ask("q", &choices(&["a"]), None).await, None);
        assert!(!prompter.ask_typed_confirmation("p", "x", None).await);

        drop(claim);
        assert!(!prompter.is_terminal_busy());
    }

    #[tokio::test]
    async fn timed_out_read_holds_the_terminal_until_it_returns() {
        let prompter = DialoguerPrompter::new();
        let (release, wait) = std::sync::mpsc::channel::<()>();
        let answer = prompter
            .run_blocking(Some(Duration::from_millis(20)), move || {
                wait.recv().ok().map(|()| 1usize)
            })
            .await;
        assert_eq!(answer, None);
        assert!(prompter.is_terminal_busy());
        assert_eq!(prompter.run_blocking(None, || Some(2usize)).await, None);

        release.send(()).unwrap();
        for _ in 0..100 {
            if !prompter.is_terminal_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(prompter.run_blocking(None, || Some(3usize)).await, Some(3));
    }
}
