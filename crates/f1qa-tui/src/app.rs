use std::time::Instant;

use f1qa_core::storage::SETTINGS_KEY;
use f1qa_core::{
    ApiClient, ApiError, AskResponse, ChatController, Config, HealthPoller, HealthResult,
    Rejection, Storage, SubmitOutcome, ToastKind,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::tui::AppEvent;

/// Presentation preferences persisted between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    pub show_side_panel: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self { show_side_panel: true }
    }
}

pub struct App {
    pub should_quit: bool,
    pub chat: ChatController,
    pub settings: UiSettings,

    // Input box
    pub input: String,
    pub input_cursor: usize,
    pub input_focused: bool,

    // Lines scrolled up from the bottom of the conversation
    pub scroll: u16,
    pub confirm_clear: bool,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    api: ApiClient,
    health: HealthPoller,
    events: UnboundedSender<AppEvent>,
    store: Option<Storage>,
    pending: Option<JoinHandle<()>>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(
        api: ApiClient,
        config: &Config,
        events: UnboundedSender<AppEvent>,
        store: Option<Storage>,
    ) -> Self {
        let mut chat = ChatController::from_config(config);
        let mut settings = UiSettings::default();

        if let Some(store) = &store {
            let history = store.load_history();
            if !history.is_empty() {
                info!(count = history.len(), "restored conversation history");
            }
            chat.restore_history(history);
            settings = store.get_or(SETTINGS_KEY, settings);
        }

        Self {
            should_quit: false,
            chat,
            settings,
            input: String::new(),
            input_cursor: 0,
            input_focused: true,
            scroll: 0,
            confirm_clear: false,
            animation_frame: 0,
            api,
            health: HealthPoller::new(config.health_interval()),
            events,
            store,
            pending: None,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn health_checks_running(&self) -> bool {
        self.health.is_running()
    }

    /// Check immediately, then keep checking on the configured interval.
    pub fn start_health_checks(&mut self) {
        self.chat.health_check_started();
        info!(interval_secs = self.health.interval().as_secs(), "starting health checks");
        let tx = self.events.clone();
        self.health
            .start(self.api.clone(), move |result| tx.send(AppEvent::Health(result)).is_ok());
    }

    pub fn stop_health_checks(&mut self) {
        self.health.stop();
    }

    pub fn on_focus_lost(&mut self) {
        info!("terminal hidden - pausing health checks");
        self.stop_health_checks();
    }

    pub fn on_focus_gained(&mut self) {
        info!("terminal visible - resuming health checks");
        self.start_health_checks();
    }

    pub fn on_health(&mut self, result: HealthResult) {
        if let Err(e) = &result {
            warn!(error = %e, "backend health check failed");
        }
        self.chat.health_checked(&result);
    }

    pub fn submit_input(&mut self) {
        let text = self.input.clone();
        match self.chat.submit(&text) {
            SubmitOutcome::Accepted(question) => {
                self.input.clear();
                self.input_cursor = 0;
                self.spawn_ask(question);
            }
            SubmitOutcome::Rejected(Rejection::TooLong { length, max }) => {
                warn!(length, max, "question rejected: too long");
            }
            SubmitOutcome::Rejected(_) => {}
        }
    }

    pub fn submit_example(&mut self, index: usize) {
        if let Some(SubmitOutcome::Accepted(question)) = self.chat.submit_example(index) {
            self.spawn_ask(question);
        }
    }

    fn spawn_ask(&mut self, question: String) {
        self.scroll = 0;
        info!(question = %question, "sending question");

        let api = self.api.clone();
        let tx = self.events.clone();
        self.pending = Some(tokio::spawn(async move {
            let result = api.ask_question(&question).await;
            let _ = tx.send(AppEvent::Answer(result));
        }));
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending.is_some()
    }

    pub fn on_answer(&mut self, result: Result<AskResponse, ApiError>) {
        self.pending = None;
        match result {
            Ok(response) => {
                info!(confidence = ?response.confidence, "received answer");
                self.chat.response_arrived(response);
            }
            Err(e) => {
                error!(error = %e, "question failed");
                self.chat.request_failed(&e);
            }
        }
        self.scroll = 0;
        self.input_focused = true;
    }

    pub fn clear_conversation(&mut self) {
        self.chat.clear();
        self.scroll = 0;
        if let Some(store) = &self.store {
            if let Err(e) = store.save_history(&[]) {
                warn!(error = %e, "failed to clear stored history");
            }
        }
        self.chat.push_toast("Conversation cleared", ToastKind::Success);
    }

    pub fn save_history(&mut self) {
        let Some(store) = &self.store else {
            self.chat.push_toast("History is disabled", ToastKind::Info);
            return;
        };
        match store.save_history(self.chat.messages()) {
            Ok(()) => self.chat.push_toast("Conversation saved", ToastKind::Success),
            Err(e) => {
                error!(error = %e, "failed to save history");
                self.chat.push_toast("Could not save conversation", ToastKind::Error);
            }
        }
    }

    pub fn toggle_side_panel(&mut self) {
        self.settings.show_side_panel = !self.settings.show_side_panel;
        if let Some(store) = &self.store {
            if let Err(e) = store.save(SETTINGS_KEY, &self.settings) {
                warn!(error = %e, "failed to save settings");
            }
        }
    }

    /// Tick animation frame and drop expired toasts (called by Tick event)
    pub fn tick(&mut self) {
        if self.chat.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.chat.expire_toasts(Instant::now());
    }

    pub fn shutdown(&mut self) {
        self.stop_health_checks();
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.input.chars().count();
        if self.input_cursor < char_count {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
