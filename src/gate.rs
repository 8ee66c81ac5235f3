//! One-time human consent for the lifetime of the server.
//!
//! The first request blocks on a [`ConsentPrompt`]. The answer is cached and
//! never asked again: a denial rejects every later request until the gate is
//! rebuilt, which in practice means restarting the server.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::host::HostHooks;

/// The cached consent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsentState {
    /// Nobody has been asked yet.
    #[default]
    Unset,
    /// The operator allowed access.
    Allowed,
    /// The operator refused access.
    Denied,
}

impl ConsentState {
    /// Whether requests may proceed.
    pub fn is_allowed(self) -> bool {
        self == ConsentState::Allowed
    }
}

/// What the operator is asked.
#[derive(Debug, Clone)]
pub struct ConsentRequest {
    /// Window or banner title.
    pub title: String,
    /// The question itself.
    pub question: String,
    /// The security implications of saying yes.
    pub details: String,
    /// Answer labels, affirmative first.
    pub options: Vec<String>,
    /// Index into `options` used when the operator just confirms.
    pub default_option: usize,
}

impl Default for ConsentRequest {
    fn default() -> Self {
        Self {
            title: "MCP Client Requesting Connection".into(),
            question: "Allow MCP client access?".into(),
            details: "If you allow this, the client will be able to run every tool this \
                      server exposes, which may execute arbitrary code with full access to \
                      the filesystem, network, and any loaded data.\n\n\
                      Only allow this if you trust the connecting application."
                .into(),
            options: vec!["Yes".into(), "No".into()],
            default_option: 1,
        }
    }
}

/// Asks a human for a yes/no decision and waits for the answer.
#[async_trait::async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Returns `true` only on an explicit affirmative answer.
    async fn ask(&self, request: &ConsentRequest) -> bool;
}

/// Prompt on the controlling terminal: question on stderr, answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait::async_trait]
impl ConsentPrompt for TerminalPrompt {
    async fn ask(&self, request: &ConsentRequest) -> bool {
        let request = request.clone();
        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr().lock();
            let labels = request
                .options
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    if i == request.default_option {
                        label.to_uppercase()
                    } else {
                        label.to_lowercase()
                    }
                })
                .collect::<Vec<_>>()
                .join("/");
            let _ = write!(
                stderr,
                "\n== {} ==\n{}\n\n{} [{}] ",
                request.title, request.details, request.question, labels
            );
            let _ = stderr.flush();

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) => None,
                Ok(_) => Some(line),
                Err(e) => {
                    tracing::warn!("Failed to read consent answer: {}", e);
                    None
                }
            }
        })
        .await;

        match answer {
            Ok(Some(line)) => is_affirmative(&line),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Consent prompt task failed: {}", e);
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Process-lifetime access gate in front of every request.
pub struct AccessGate {
    state: Mutex<ConsentState>,
    prompt: Arc<dyn ConsentPrompt>,
    request: ConsentRequest,
    hooks: HostHooks,
}

impl AccessGate {
    /// Create an undecided gate.
    pub fn new(prompt: Arc<dyn ConsentPrompt>, hooks: HostHooks) -> Self {
        Self {
            state: Mutex::new(ConsentState::Unset),
            prompt,
            request: ConsentRequest::default(),
            hooks,
        }
    }

    /// The current decision, without prompting.
    pub async fn state(&self) -> ConsentState {
        *self.state.lock().await
    }

    /// Resolve the decision, prompting on first use.
    ///
    /// The lock is held across the prompt so concurrent callers wait for the
    /// single answer instead of asking again.
    pub async fn check(&self) -> ConsentState {
        let mut state = self.state.lock().await;
        if *state != ConsentState::Unset {
            return *state;
        }

        tracing::info!("Asking operator for MCP access consent");
        let allowed = self.prompt.ask(&self.request).await;
        *state = if allowed {
            ConsentState::Allowed
        } else {
            ConsentState::Denied
        };

        if allowed {
            tracing::info!("MCP access allowed by operator");
            self.hooks.record("MCP access ALLOWED by user");
            self.hooks.announce("MCP: client connected");
        } else {
            tracing::warn!("MCP access denied by operator; restart the server to ask again");
            self.hooks.record("MCP access DENIED by user");
            self.hooks.announce("MCP: client connection denied");
        }

        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        answer: bool,
        asked: AtomicUsize,
    }

    impl Scripted {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer,
                asked: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ConsentPrompt for Scripted {
        async fn ask(&self, _request: &ConsentRequest) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.answer
        }
    }

    #[tokio::test]
    async fn starts_unset_and_asks_once() {
        let prompt = Scripted::new(true);
        let gate = AccessGate::new(prompt.clone(), HostHooks::silent());
        assert_eq!(gate.state().await, ConsentState::Unset);

        assert_eq!(gate.check().await, ConsentState::Allowed);
        assert_eq!(gate.check().await, ConsentState::Allowed);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denial_is_sticky() {
        let prompt = Scripted::new(false);
        let gate = AccessGate::new(prompt.clone(), HostHooks::silent());

        for _ in 0..3 {
            assert_eq!(gate.check().await, ConsentState::Denied);
        }
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
        assert!(!gate.state().await.is_allowed());
    }

    #[tokio::test]
    async fn concurrent_first_requests_share_one_prompt() {
        let prompt = Scripted::new(true);
        let gate = Arc::new(AccessGate::new(prompt.clone(), HostHooks::silent()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.check().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), ConsentState::Allowed);
        }
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_explicit_yes_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  YES \r\n"));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("yeah"));
    }

    #[test]
    fn default_request_defaults_to_no() {
        let request = ConsentRequest::default();
        assert_eq!(request.options[request.default_option], "No");
        assert!(request.details.contains("arbitrary code"));
    }
}
