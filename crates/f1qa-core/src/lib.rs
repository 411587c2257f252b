//! UI-agnostic core of the F1 Q&A client: request layer, conversation state
//! machine, presentation mapping and health polling.

pub mod api;
pub mod confidence;
pub mod config;
pub mod controller;
pub mod error;
pub mod health;
pub mod message;
pub mod models;
pub mod status;
pub mod storage;
pub mod view;

// Re-export main types for convenience
pub use api::ApiClient;
pub use confidence::ConfidenceLevel;
pub use config::{Config, LengthPolicy};
pub use controller::{ChatController, Phase, Rejection, SubmitOutcome, ToastKind};
pub use error::ApiError;
pub use health::{HealthPoller, HealthResult};
pub use message::{Message, MessageMetadata, Role};
pub use models::{AskResponse, EntityType, HealthResponse, RelatedEntity};
pub use status::ConnectionStatus;
pub use storage::Storage;
pub use view::{render, ChatView};
