use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::App;
use crate::tui::AppEvent;

const PAGE: u16 = 10;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::FocusGained => app.on_focus_gained(),
        AppEvent::FocusLost => app.on_focus_lost(),
        AppEvent::Tick => app.tick(),
        AppEvent::Answer(result) => app.on_answer(result),
        AppEvent::Health(result) => app.on_health(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // Clear confirmation swallows the next key
    if app.confirm_clear {
        app.confirm_clear = false;
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter) {
            app.clear_conversation();
        }
        return;
    }

    if ctrl {
        match key.code {
            KeyCode::Char('k') => app.input_focused = true,
            KeyCode::Char('l') => app.confirm_clear = true,
            KeyCode::Char('s') => app.save_history(),
            KeyCode::Char('b') => app.toggle_side_panel(),
            KeyCode::Char('u') => app.scroll_up(PAGE / 2),
            KeyCode::Char('d') => app.scroll_down(PAGE / 2),
            _ => {}
        }
        return;
    }

    if key.code == KeyCode::Esc {
        // Hiding the indicator does not cancel the pending request
        if !app.chat.dismiss_typing() {
            app.input_focused = false;
        }
        return;
    }

    match key.code {
        KeyCode::Up => return app.scroll_up(1),
        KeyCode::Down => return app.scroll_down(1),
        KeyCode::PageUp => return app.scroll_up(PAGE),
        KeyCode::PageDown => return app.scroll_down(PAGE),
        _ => {}
    }

    if app.input_focused {
        handle_input_key(app, key);
    } else {
        handle_normal_key(app, key);
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    // A disabled input box ignores edits, like a disabled form field
    if !app.chat.is_input_enabled() {
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_focused = true,
        KeyCode::Char('j') => app.scroll_down(1),
        KeyCode::Char('k') => app.scroll_up(1),
        KeyCode::Tab => app.toggle_side_panel(),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            app.submit_example(index);
        }
        _ => {}
    }
}
