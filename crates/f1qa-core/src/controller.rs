//! Conversation state machine.
//!
//! The controller never touches the network. A front end calls [`ChatController::submit`],
//! starts the request itself when the outcome is `Accepted`, and reports the
//! result back through [`ChatController::response_arrived`] or
//! [`ChatController::request_failed`]. Health check results arrive through
//! [`ChatController::health_checked`].
//!
//! ```text
//! Idle --submit--> AwaitingResponse --response/failure--> Idle
//! Idle --health error--> Disabled --health ok--> Idle
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::{Config, LengthPolicy};
use crate::error::ApiError;
use crate::message::Message;
use crate::models::{AskResponse, HealthResponse, RelatedEntity};
use crate::status::ConnectionStatus;

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "Who is Max Verstappen?",
    "Which team does Lewis Hamilton drive for?",
    "Who won the last race?",
    "What circuits are on the calendar?",
    "Tell me about Red Bull Racing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The question was appended; the caller must start exactly one request for it.
    Accepted(String),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Busy,
    Disabled,
    Empty,
    TooLong { length: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub expires_at: Instant,
}

/// Entities and confidence of the most recent answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SidePanel {
    pub entities: Vec<RelatedEntity>,
    pub confidence: Option<f64>,
    /// False until the first answer arrives, or after a clear.
    pub populated: bool,
}

#[derive(Debug)]
pub struct ChatController {
    messages: Vec<Message>,
    phase: Phase,
    status: ConnectionStatus,
    status_observed: bool,
    typing: bool,
    /// The outstanding request belongs to a cleared conversation.
    discard_pending: bool,
    show_welcome: bool,
    side_panel: SidePanel,
    toasts: Vec<Toast>,
    max_message_length: usize,
    length_policy: LengthPolicy,
}

impl ChatController {
    pub fn new(max_message_length: usize, length_policy: LengthPolicy) -> Self {
        Self {
            messages: Vec::new(),
            phase: Phase::Idle,
            status: ConnectionStatus::Checking,
            status_observed: false,
            typing: false,
            discard_pending: false,
            show_welcome: true,
            side_panel: SidePanel::default(),
            toasts: Vec::new(),
            max_message_length,
            length_policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_message_length, config.length_policy)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn shows_welcome(&self) -> bool {
        self.show_welcome
    }

    pub fn side_panel(&self) -> &SidePanel {
        &self.side_panel
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Input controls accept submissions only while idle.
    pub fn is_input_enabled(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        match self.phase {
            Phase::AwaitingResponse => return SubmitOutcome::Rejected(Rejection::Busy),
            Phase::Disabled => return SubmitOutcome::Rejected(Rejection::Disabled),
            Phase::Idle => {}
        }

        let mut question = text.trim().to_string();
        if question.is_empty() {
            return SubmitOutcome::Rejected(Rejection::Empty);
        }

        let length = question.chars().count();
        if length > self.max_message_length {
            match self.length_policy {
                LengthPolicy::Reject => {
                    self.push_toast(
                        format!(
                            "Question is too long (max. {} characters)",
                            self.max_message_length
                        ),
                        ToastKind::Warning,
                    );
                    return SubmitOutcome::Rejected(Rejection::TooLong {
                        length,
                        max: self.max_message_length,
                    });
                }
                LengthPolicy::Truncate => {
                    question = question.chars().take(self.max_message_length).collect();
                }
            }
        }

        self.show_welcome = false;
        self.messages.push(Message::user(question.clone()));
        self.typing = true;
        self.phase = Phase::AwaitingResponse;
        debug!(chars = question.chars().count(), "question accepted");

        SubmitOutcome::Accepted(question)
    }

    /// Submit one of [`EXAMPLE_QUESTIONS`]; out-of-range indices are ignored.
    pub fn submit_example(&mut self, index: usize) -> Option<SubmitOutcome> {
        let question = EXAMPLE_QUESTIONS.get(index)?;
        Some(self.submit(question))
    }

    /// Returns false when no request was outstanding, or when its conversation
    /// was cleared in the meantime.
    pub fn response_arrived(&mut self, response: AskResponse) -> bool {
        if !self.settle_pending() {
            return false;
        }

        self.show_welcome = false;
        self.messages.push(Message::assistant(&response));
        self.side_panel = SidePanel {
            entities: response.related_entities,
            confidence: response.confidence,
            populated: true,
        };
        true
    }

    /// Same contract as [`ChatController::response_arrived`].
    pub fn request_failed(&mut self, error: &ApiError) -> bool {
        if !self.settle_pending() {
            return false;
        }

        self.show_welcome = false;
        self.messages.push(Message::system(error.user_message()));
        true
    }

    /// Leave `AwaitingResponse`; true when the result should be shown.
    fn settle_pending(&mut self) -> bool {
        if self.phase != Phase::AwaitingResponse {
            return false;
        }
        self.typing = false;
        self.phase = Phase::Idle;
        !std::mem::replace(&mut self.discard_pending, false)
    }

    pub fn health_check_started(&mut self) {
        if !self.status_observed {
            self.status = ConnectionStatus::Checking;
        }
    }

    pub fn health_checked(
        &mut self,
        result: &Result<HealthResponse, ApiError>,
    ) -> ConnectionStatus {
        let status = ConnectionStatus::from_health(result);
        if status != self.status {
            info!(from = ?self.status, to = ?status, "connection status changed");
        }
        self.status = status;
        self.status_observed = true;

        match (status, self.phase) {
            (ConnectionStatus::Error, Phase::Idle) => self.phase = Phase::Disabled,
            (ConnectionStatus::Connected, Phase::Disabled) => self.phase = Phase::Idle,
            _ => {}
        }
        status
    }

    /// Hide the typing indicator. The pending request keeps running.
    pub fn dismiss_typing(&mut self) -> bool {
        std::mem::replace(&mut self.typing, false)
    }

    /// A request still in flight is left to finish; its result is dropped.
    pub fn clear(&mut self) {
        if self.phase == Phase::AwaitingResponse {
            self.discard_pending = true;
            self.typing = false;
        }
        self.messages.clear();
        self.side_panel = SidePanel::default();
        self.show_welcome = true;
    }

    pub fn restore_history(&mut self, mut messages: Vec<Message>) {
        let start = messages.len().saturating_sub(crate::storage::HISTORY_LIMIT);
        messages.drain(..start);
        if !messages.is_empty() {
            self.show_welcome = false;
        }
        self.messages.extend(messages);
    }

    pub fn push_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toasts.push(Toast {
            message: message.into(),
            kind,
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn controller() -> ChatController {
        ChatController::new(500, LengthPolicy::Reject)
    }

    fn answer(text: &str, confidence: Option<f64>) -> AskResponse {
        AskResponse {
            answer: text.to_string(),
            confidence,
            related_entities: vec![RelatedEntity::new("driver", "Verstappen")],
            query_type: Some("race_winner".to_string()),
            metadata: None,
        }
    }

    fn health(status: &str) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: status.to_string(),
            version: None,
            knowledge_base_loaded: None,
        })
    }

    #[test]
    fn test_submit_then_response_appends_user_then_assistant() {
        let mut chat = controller();
        assert_eq!(chat.submit("  Who won?  "), SubmitOutcome::Accepted("Who won?".to_string()));
        assert_eq!(chat.phase(), Phase::AwaitingResponse);
        assert!(chat.is_typing());
        assert!(!chat.is_input_enabled());
        assert!(!chat.shows_welcome());

        assert!(chat.response_arrived(answer("Verstappen", Some(0.91))));
        let roles: Vec<Role> = chat.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(chat.messages()[1].text, "Verstappen");
        assert_eq!(chat.phase(), Phase::Idle);
        assert!(!chat.is_typing());
        assert_eq!(chat.side_panel().confidence, Some(0.91));
        assert_eq!(chat.side_panel().entities.len(), 1);
    }

    #[test]
    fn test_failure_appends_system_message_and_reenables() {
        let mut chat = controller();
        chat.submit("Who won?");
        assert!(chat.request_failed(&ApiError::ConnectionError("refused".into())));

        let last = chat.messages().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.text.contains("Cannot connect"));
        assert!(chat.is_input_enabled());
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn test_second_submission_while_awaiting_is_ignored() {
        let mut chat = controller();
        chat.submit("first");
        assert_eq!(chat.submit("second"), SubmitOutcome::Rejected(Rejection::Busy));
        assert_eq!(chat.submit_example(0), Some(SubmitOutcome::Rejected(Rejection::Busy)));
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn test_too_long_rejected_with_warning() {
        let mut chat = controller();
        let long = "a".repeat(501);
        assert_eq!(
            chat.submit(&long),
            SubmitOutcome::Rejected(Rejection::TooLong { length: 501, max: 500 })
        );
        assert!(chat.messages().is_empty());
        assert_eq!(chat.toasts().len(), 1);
        assert_eq!(chat.toasts()[0].kind, ToastKind::Warning);
        assert!(chat.is_input_enabled());
    }

    #[test]
    fn test_exact_limit_accepted() {
        let mut chat = controller();
        let text = "b".repeat(500);
        assert!(matches!(chat.submit(&text), SubmitOutcome::Accepted(_)));
    }

    #[test]
    fn test_truncate_policy_cuts_question() {
        let mut chat = ChatController::new(5, LengthPolicy::Truncate);
        assert_eq!(chat.submit("abcdefgh"), SubmitOutcome::Accepted("abcde".to_string()));
        assert_eq!(chat.messages()[0].text, "abcde");
        assert!(chat.toasts().is_empty());
    }

    #[test]
    fn test_empty_submission_ignored() {
        let mut chat = controller();
        assert_eq!(chat.submit("   "), SubmitOutcome::Rejected(Rejection::Empty));
        assert!(chat.messages().is_empty());
        assert!(chat.toasts().is_empty());
    }

    #[test]
    fn test_stale_results_ignored_when_idle() {
        let mut chat = controller();
        assert!(!chat.response_arrived(answer("late", None)));
        assert!(!chat.request_failed(&ApiError::Timeout(30_000)));
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_health_transitions() {
        let mut chat = controller();
        assert_eq!(chat.status(), ConnectionStatus::Checking);

        let failed = Err(ApiError::HealthCheckFailed("refused".into()));
        assert_eq!(chat.health_checked(&failed), ConnectionStatus::Error);
        assert_eq!(chat.phase(), Phase::Disabled);
        assert_eq!(chat.submit("hello"), SubmitOutcome::Rejected(Rejection::Disabled));

        // Warning neither enables nor disables input.
        assert_eq!(chat.health_checked(&health("down")), ConnectionStatus::Warning);
        assert_eq!(chat.phase(), Phase::Disabled);

        assert_eq!(chat.health_checked(&health("ok")), ConnectionStatus::Connected);
        assert_eq!(chat.phase(), Phase::Idle);

        chat.health_check_started();
        assert_eq!(chat.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_health_failure_during_request_keeps_awaiting() {
        let mut chat = controller();
        chat.submit("Who won?");
        chat.health_checked(&Err(ApiError::HealthCheckFailed("down".into())));
        assert_eq!(chat.phase(), Phase::AwaitingResponse);

        chat.request_failed(&ApiError::ConnectionError("refused".into()));
        assert!(chat.is_input_enabled());
    }

    #[test]
    fn test_dismiss_typing_keeps_request_pending() {
        let mut chat = controller();
        chat.submit("Who won?");
        assert!(chat.dismiss_typing());
        assert!(!chat.is_typing());
        assert_eq!(chat.phase(), Phase::AwaitingResponse);
        assert!(chat.response_arrived(answer("Verstappen", None)));
    }

    #[test]
    fn test_clear_resets_conversation() {
        let mut chat = controller();
        chat.submit("Who won?");
        chat.response_arrived(answer("Verstappen", Some(0.4)));
        chat.clear();

        assert!(chat.messages().is_empty());
        assert!(chat.shows_welcome());
        assert_eq!(chat.side_panel(), &SidePanel::default());
    }

    #[test]
    fn test_clear_while_awaiting_drops_late_answer() {
        let mut chat = controller();
        chat.submit("Who won?");
        chat.clear();
        assert!(!chat.is_typing());
        assert_eq!(chat.phase(), Phase::AwaitingResponse);

        assert!(!chat.response_arrived(answer("Verstappen", Some(0.9))));
        assert!(chat.messages().is_empty());
        assert!(chat.shows_welcome());
        assert!(!chat.side_panel().populated);
        assert_eq!(chat.phase(), Phase::Idle);

        // The next exchange pairs normally.
        chat.submit("Who won in 2023?");
        assert!(chat.request_failed(&ApiError::Timeout(30_000)));
        let roles: Vec<Role> = chat.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::System]);
        assert!(!chat.shows_welcome());
    }

    #[test]
    fn test_result_after_cleared_history_hides_welcome() {
        let mut chat = controller();
        chat.restore_history(vec![Message::user("old")]);
        chat.clear();
        assert!(chat.shows_welcome());

        chat.submit("Who won?");
        chat.response_arrived(answer("Verstappen", None));
        assert!(!chat.shows_welcome());
        assert!(crate::view::render(&chat).welcome.is_none());
    }

    #[test]
    fn test_restore_history_keeps_tail() {
        let mut chat = controller();
        let history: Vec<Message> = (0..70).map(|i| Message::user(format!("q{}", i))).collect();
        chat.restore_history(history);
        assert_eq!(chat.messages().len(), 50);
        assert_eq!(chat.messages()[0].text, "q20");
        assert!(!chat.shows_welcome());
    }

    #[test]
    fn test_toasts_expire() {
        let mut chat = controller();
        chat.push_toast("Conversation cleared", ToastKind::Success);
        chat.expire_toasts(Instant::now());
        assert_eq!(chat.toasts().len(), 1);
        chat.expire_toasts(Instant::now() + TOAST_DURATION + Duration::from_millis(1));
        assert!(chat.toasts().is_empty());
    }
}
