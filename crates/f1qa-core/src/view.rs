//! Presentation description of the conversation.
//!
//! [`render`] is a pure mapping from controller state to a [`ChatView`]. Front
//! ends draw the view; tests assert on it without a terminal or a network.

use chrono::Local;
use uuid::Uuid;

use crate::confidence::{percentage, ConfidenceLevel};
use crate::controller::{ChatController, ToastKind, EXAMPLE_QUESTIONS};
use crate::message::{Message, Role};
use crate::status::ConnectionStatus;

pub const ENTITIES_PLACEHOLDER: &str = "Related entities will appear here";
pub const NO_ENTITIES: &str = "No related entities";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub status: ConnectionStatus,
    pub status_label: &'static str,
    /// Example questions, present only while the welcome screen is shown.
    pub welcome: Option<Vec<String>>,
    pub messages: Vec<MessageView>,
    pub typing_visible: bool,
    pub input_enabled: bool,
    pub max_message_length: usize,
    pub side_panel: SidePanelView,
    pub toasts: Vec<ToastView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidePanelView {
    pub entities: Vec<EntityCard>,
    /// Shown instead of cards when there are none.
    pub placeholder: Option<&'static str>,
    pub confidence: Option<ConfidenceView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCard {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceView {
    pub percent: u8,
    pub level: ConfidenceLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
}

pub fn render(chat: &ChatController) -> ChatView {
    let panel = chat.side_panel();

    let entities: Vec<EntityCard> = panel
        .entities
        .iter()
        .map(|e| EntityCard {
            label: e.label(),
            value: e.display_value(),
        })
        .collect();

    let placeholder = match (panel.populated, entities.is_empty()) {
        (false, _) => Some(ENTITIES_PLACEHOLDER),
        (true, true) => Some(NO_ENTITIES),
        (true, false) => None,
    };

    ChatView {
        status: chat.status(),
        status_label: chat.status().label(),
        welcome: chat
            .shows_welcome()
            .then(|| EXAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()),
        messages: chat.messages().iter().map(message_view).collect(),
        typing_visible: chat.is_typing(),
        input_enabled: chat.is_input_enabled(),
        max_message_length: chat.max_message_length(),
        side_panel: SidePanelView {
            entities,
            placeholder,
            confidence: panel.confidence.map(confidence_view),
        },
        toasts: chat
            .toasts()
            .iter()
            .map(|t| ToastView {
                message: t.message.clone(),
                kind: t.kind,
            })
            .collect(),
    }
}

fn message_view(message: &Message) -> MessageView {
    MessageView {
        id: message.id,
        role: message.role,
        text: message.text.clone(),
        timestamp: message
            .created_at
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M")
            .to_string(),
    }
}

pub fn confidence_view(score: f64) -> ConfidenceView {
    let percent = percentage(score);
    ConfidenceView {
        percent,
        level: ConfidenceLevel::from_score(score),
        text: format!("{}% confidence", percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LengthPolicy;
    use crate::error::ApiError;
    use crate::models::{AskResponse, HealthResponse, RelatedEntity};

    #[test]
    fn test_initial_view_shows_welcome() {
        let chat = ChatController::new(500, LengthPolicy::Reject);
        let view = render(&chat);

        assert_eq!(view.status, ConnectionStatus::Checking);
        assert_eq!(view.welcome.as_ref().map(|w| w.len()), Some(EXAMPLE_QUESTIONS.len()));
        assert!(view.messages.is_empty());
        assert!(view.input_enabled);
        assert_eq!(view.side_panel.placeholder, Some(ENTITIES_PLACEHOLDER));
        assert!(view.side_panel.confidence.is_none());
    }

    #[test]
    fn test_answer_scenario() {
        let mut chat = ChatController::new(500, LengthPolicy::Reject);
        chat.submit("Who won?");
        chat.response_arrived(AskResponse {
            answer: "Verstappen".to_string(),
            confidence: Some(0.91),
            related_entities: vec![RelatedEntity::new("driver", "Verstappen")],
            query_type: None,
            metadata: None,
        });

        let view = render(&chat);
        assert!(view.welcome.is_none());
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[1].role, Role::Assistant);
        assert_eq!(view.messages[1].text, "Verstappen");
        assert_eq!(
            view.side_panel.entities,
            vec![EntityCard { label: "driver".into(), value: "Verstappen".into() }]
        );
        let confidence = view.side_panel.confidence.unwrap();
        assert_eq!(confidence.percent, 91);
        assert_eq!(confidence.level, ConfidenceLevel::High);
        assert_eq!(confidence.text, "91% confidence");
    }

    #[test]
    fn test_answer_without_entities_or_confidence() {
        let mut chat = ChatController::new(500, LengthPolicy::Reject);
        chat.submit("Who won?");
        chat.response_arrived(AskResponse {
            answer: "Unknown".to_string(),
            confidence: None,
            related_entities: Vec::new(),
            query_type: None,
            metadata: None,
        });

        let view = render(&chat);
        assert_eq!(view.side_panel.placeholder, Some(NO_ENTITIES));
        assert!(view.side_panel.confidence.is_none());
    }

    #[test]
    fn test_unhealthy_status_rendered_without_panic() {
        let mut chat = ChatController::new(500, LengthPolicy::Reject);
        chat.health_checked(&Ok(HealthResponse {
            status: "down".to_string(),
            version: None,
            knowledge_base_loaded: None,
        }));
        let view = render(&chat);
        assert_eq!(view.status, ConnectionStatus::Warning);
        assert_eq!(view.status_label, "Unstable connection");

        chat.health_checked(&Err(ApiError::HealthCheckFailed("refused".into())));
        let view = render(&chat);
        assert_eq!(view.status, ConnectionStatus::Error);
        assert!(!view.input_enabled);
    }

    #[test]
    fn test_typing_and_input_while_awaiting() {
        let mut chat = ChatController::new(500, LengthPolicy::Reject);
        chat.submit("Who won?");
        let view = render(&chat);
        assert!(view.typing_visible);
        assert!(!view.input_enabled);
    }
}
