use std::sync::OnceLock;

use f1qa_core::view::{ChatView, ConfidenceView, SidePanelView};
use f1qa_core::{ConfidenceLevel, ConnectionStatus, Role, ToastKind};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};
use regex::Regex;
use crate::app::App;

const SIDE_PANEL_WIDTH: u16 = 38;
const TOAST_WIDTH: u16 = 40;

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"https?://\S+").expect("valid URL pattern"))
}

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping (doesn't break mid-word)
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Convert **bold** markdown to styled spans on top of `base`
fn parse_markdown_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, base.add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }

    spans
}

/// Style one line of message text: URLs are underlined, **bold** is bold.
fn parse_message_line(text: &str, base: Style) -> Line<'static> {
    let mut spans = Vec::new();
    let mut last = 0;

    for found in url_regex().find_iter(text) {
        spans.extend(parse_markdown_spans(&text[last..found.start()], base));
        spans.push(Span::styled(
            found.as_str().to_string(),
            base.fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        ));
        last = found.end();
    }
    spans.extend(parse_markdown_spans(&text[last..], base));

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Checking => Color::Gray,
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Warning => Color::Yellow,
        ConnectionStatus::Error => Color::Red,
    }
}

fn confidence_color(level: ConfidenceLevel) -> Color {
    match level {
        ConfidenceLevel::High => Color::Green,
        ConfidenceLevel::Medium => Color::Yellow,
        ConfidenceLevel::Low => Color::Red,
    }
}

fn role_label(role: Role) -> (&'static str, Style) {
    match role {
        Role::User => ("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Role::Assistant => (
            "F1 Assistant",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Role::System => ("System", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let view = f1qa_core::render(&app.chat);
    let area = frame.area();

    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, &view, frame, header_area);

    if app.settings.show_side_panel {
        let [chat_area, panel_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(SIDE_PANEL_WIDTH),
        ])
        .areas(body_area);
        render_chat(app, &view, frame, chat_area);
        render_side_panel(&view.side_panel, frame, panel_area);
    } else {
        render_chat(app, &view, frame, body_area);
    }

    render_input(app, &view, frame, input_area);
    render_footer(app, frame, footer_area);

    render_toasts(&view, frame, body_area);
    if app.confirm_clear {
        render_confirm_clear(frame, area);
    }
}

fn render_header(app: &App, view: &ChatView, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" F1 Q&A ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled("● ", Style::default().fg(status_color(view.status))),
        Span::styled(view.status_label, Style::default().fg(Color::White)),
        Span::styled(
            format!("  {}", app.api().base_url()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.input_focused {
        (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" BROWSE ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.input_focused {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(if app.chat.is_typing() { " hide " } else { " browse " }, label_style),
        ]
    } else {
        vec![
            Span::styled(" i ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" 1-9 ", key_style),
            Span::styled(" example ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };
    hints.extend(vec![
        Span::styled(" ^L ", key_style),
        Span::styled(" clear ", label_style),
        Span::styled(" ^S ", key_style),
        Span::styled(" save ", label_style),
        Span::styled(" ^B ", key_style),
        Span::styled(
            if app.settings.show_side_panel { " hide panel " } else { " show panel " },
            label_style,
        ),
    ]);

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn welcome_lines(examples: &[String], width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to the F1 Q&A assistant",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::default(),
    ];
    for text in wrap_text_to_width(
        "Ask anything about Formula 1 drivers, teams, circuits and results. Try one of these:",
        width,
    ) {
        lines.push(Line::from(text));
    }
    lines.push(Line::default());

    for (i, example) in examples.iter().enumerate() {
        let prefix = format!(" {}  ", i + 1);
        let wrapped = wrap_text_to_width(example, width.saturating_sub(prefix.len()));
        for (j, text) in wrapped.into_iter().enumerate() {
            let lead = if j == 0 {
                Span::styled(prefix.clone(), Style::default().fg(Color::Yellow).bold())
            } else {
                Span::raw(" ".repeat(prefix.len()))
            };
            lines.push(Line::from(vec![lead, Span::raw(text)]));
        }
    }
    lines
}

fn conversation_lines(app: &App, view: &ChatView, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in &view.messages {
        let (label, label_style) = role_label(msg.role);
        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::styled(format!("  {}", msg.timestamp), Style::default().fg(Color::Gray)),
        ]));

        let base = match msg.role {
            Role::System => Style::default().fg(Color::LightRed),
            _ => Style::default(),
        };
        for paragraph in msg.text.lines() {
            for wrapped in wrap_text_to_width(paragraph, width) {
                lines.push(parse_message_line(&wrapped, base));
            }
        }
        lines.push(Line::default());
    }

    if view.typing_visible {
        let (label, label_style) = role_label(Role::Assistant);
        lines.push(Line::from(Span::styled(label, label_style)));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat(app: &mut App, view: &ChatView, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let inner = block.inner(area);
    let width = inner.width as usize;
    let height = inner.height as usize;

    let lines = match &view.welcome {
        Some(examples) if view.messages.is_empty() => welcome_lines(examples, width),
        _ => conversation_lines(app, view, width),
    };

    // Scroll is counted from the bottom so new messages stay in view
    let limit = max_scroll(lines.len(), height);
    app.scroll = app.scroll.min(limit);
    let top = limit - app.scroll;

    let chat = Paragraph::new(lines).block(block).scroll((top, 0));
    frame.render_widget(chat, area);
}

/// Saturates instead of wrapping for transcripts taller than `u16::MAX` lines.
fn max_scroll(line_count: usize, height: usize) -> u16 {
    u16::try_from(line_count.saturating_sub(height)).unwrap_or(u16::MAX)
}

fn render_side_panel(panel: &SidePanelView, frame: &mut Frame, area: Rect) {
    let [entities_area, confidence_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Related entities ");

    let lines: Vec<Line> = match panel.placeholder {
        Some(text) => vec![Line::from(Span::styled(text, Style::default().fg(Color::Gray)))],
        None => panel
            .entities
            .iter()
            .flat_map(|card| {
                [
                    Line::from(Span::styled(
                        card.label.to_uppercase(),
                        Style::default().fg(Color::Magenta).bold(),
                    )),
                    Line::from(card.value.clone()),
                    Line::default(),
                ]
            })
            .collect(),
    };

    let entities = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(entities, entities_area);

    if let Some(confidence) = &panel.confidence {
        render_confidence(confidence, frame, confidence_area);
    }
}

fn render_confidence(confidence: &ConfidenceView, frame: &mut Frame, area: Rect) {
    let color = confidence_color(confidence.level);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" Confidence: {} ", confidence.level.as_str())),
        )
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .percent(u16::from(confidence.percent.min(100)))
        .label(confidence.text.clone());
    frame.render_widget(gauge, area);
}

fn render_input(app: &App, view: &ChatView, frame: &mut Frame, area: Rect) {
    let char_count = app.input.chars().count();

    let (title, border_color) = if !view.input_enabled {
        let reason = match view.status {
            ConnectionStatus::Error => " Disconnected: waiting for the server ",
            _ => " Waiting for answer ",
        };
        (reason.to_string(), Color::DarkGray)
    } else {
        let color = if char_count > view.max_message_length {
            Color::Red
        } else if app.input_focused {
            Color::Yellow
        } else {
            Color::DarkGray
        };
        (format!(" Ask ({}/{}) ", char_count, view.max_message_length), color)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Horizontal scrolling keeps the cursor visible
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let input = if app.input.is_empty() && view.input_enabled {
        Paragraph::new("Ask a question about Formula 1...")
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
    } else {
        let visible_text: String =
            app.input.chars().skip(scroll_offset).take(inner_width).collect();
        let style = if view.input_enabled {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(input_block), area);

    if app.input_focused && view.input_enabled && !app.confirm_clear {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_toasts(view: &ChatView, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let x = area.x + area.width.saturating_sub(width);
    let mut y = area.y;

    for toast in view.toasts.iter().rev() {
        if y + 3 > area.y + area.height {
            break;
        }
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Warning => Color::Yellow,
            ToastKind::Info => Color::Blue,
        };
        let toast_area = Rect::new(x, y, width, 3);
        frame.render_widget(Clear, toast_area);
        let widget = Paragraph::new(toast.message.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        frame.render_widget(widget, toast_area);
        y += 3;
    }
}

fn render_confirm_clear(frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 44, 5);
    frame.render_widget(Clear, popup_area);

    let text = vec![
        Line::from("Clear the whole conversation?"),
        Line::default(),
        Line::from(vec![
            Span::styled(" y ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" clear   "),
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" cancel"),
        ]),
    ];

    let popup = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Confirm "),
    );
    frame.render_widget(popup, popup_area);
}

/// Static panel shown when the application could not start.
pub fn render_fatal(frame: &mut Frame, message: &str) {
    let area = frame.area();
    frame.render_widget(Clear, area);

    let popup_area = centered(area, 70, 9);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" F1 Q&A could not start ");

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let text = vec![
        Line::from(Span::styled(
            "Failed to initialise the application.",
            Style::default().fg(Color::Red).bold(),
        )),
        Line::default(),
        Line::from(message.to_string()),
        Line::default(),
        Line::from(vec![
            Span::styled(" r ", key_style),
            Span::raw(" reload   "),
            Span::styled(" q ", key_style),
            Span::raw(" quit"),
        ]),
    ];

    let panel = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(panel, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use f1qa_core::{ApiClient, AskResponse, Config, RelatedEntity};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        screen(&terminal)
    }

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(ApiClient::new("http://127.0.0.1:1/api/v1"), &Config::new(), tx, None)
    }

    #[test]
    fn test_max_scroll_saturates() {
        assert_eq!(max_scroll(5, 20), 0);
        assert_eq!(max_scroll(30, 20), 10);
        assert_eq!(max_scroll(70_000, 20), u16::MAX);
    }

    #[test]
    fn test_wrap_text_to_width() {
        assert_eq!(
            wrap_text_to_width("Max Verstappen won the race", 10),
            vec!["Max", "Verstappen", "won the", "race"]
        );
        assert_eq!(wrap_text_to_width("", 10), vec![String::new()]);
    }

    #[test]
    fn test_parse_message_line_styles_urls_and_bold() {
        let line = parse_message_line("See **results** at https://f1.com now", Style::default());
        let texts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, vec!["See ", "results", " at ", "https://f1.com", " now"]);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(line.spans[3].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_message_line("a **b", Style::default());
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[tokio::test]
    async fn test_welcome_screen_lists_examples() {
        let mut app = app();
        let output = draw(&mut app);
        assert!(output.contains("Welcome to the F1 Q&A assistant"));
        assert!(output.contains(" 1  "));
        assert!(output.contains("Checking..."));
        assert!(output.contains("Related entities will appear here"));
    }

    #[tokio::test]
    async fn test_answer_renders_entities_and_confidence() {
        let mut app = app();
        app.chat.submit("Who won?");
        app.chat.response_arrived(AskResponse {
            answer: "Verstappen".to_string(),
            confidence: Some(0.91),
            related_entities: vec![RelatedEntity::new("driver", "Verstappen")],
            query_type: None,
            metadata: None,
        });

        let output = draw(&mut app);
        assert!(output.contains("Who won?"));
        assert!(output.contains("DRIVER"));
        assert!(output.contains("91% confidence"));
        assert!(!output.contains("Welcome"));
    }

    #[tokio::test]
    async fn test_confirm_clear_popup() {
        let mut app = app();
        app.confirm_clear = true;
        assert!(draw(&mut app).contains("Clear the whole conversation?"));
    }

    #[test]
    fn test_fatal_panel() {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|frame| render_fatal(frame, "terminal too small"))
            .unwrap();
        let output = screen(&terminal);
        assert!(output.contains("terminal too small"));
        assert!(output.contains("reload"));
    }
}
