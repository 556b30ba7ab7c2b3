use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;
use deckproof_core::{ChatRole, ConversationState};
use crate::app::{App, FormField, PathInput};

pub fn render(app: &mut App, frame: &mut Frame) {
    let state = app.state().snapshot();

    let error_height = if state.error().is_some() { 3 } else { 0 };
    let [header_area, deck_area, notes_area, transcript_area, error_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(error_height),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    render_header(app, frame, header_area);
    render_path_input(app, frame, deck_area, FormField::Deck);
    render_path_input(app, frame, notes_area, FormField::Notes);
    render_transcript(app, &state, frame, transcript_area);
    if let Some(error) = state.error() {
        render_error(error, frame, error_area);
    }
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let user = match &app.username {
        Some(name) => format!("signed in as {}", name),
        None => "not signed in".to_string(),
    };

    let header = Line::from(vec![
        Span::styled(
            " deckproof ",
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(user, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_path_input(app: &App, frame: &mut Frame, area: Rect, field: FormField) {
    let (input, title) = match field {
        FormField::Deck => (&app.deck_input, " Slide deck (.pptx) "),
        FormField::Notes => (&app.notes_input, " Transcript to correct (.txt) "),
    };
    let focused = app.focus == field;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let text = if input.text.is_empty() && !focused {
        Span::styled("path to file", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(input.text.as_str())
    };
    frame.render_widget(Paragraph::new(text).block(block), area);

    if focused {
        frame.set_cursor_position(cursor_position(input, area));
    }
}

/// Terminal position of the input cursor; wide characters take two columns.
fn cursor_position(input: &PathInput, area: Rect) -> Position {
    let byte_pos = input
        .text
        .char_indices()
        .nth(input.cursor)
        .map(|(i, _)| i)
        .unwrap_or(input.text.len());
    let columns = u16::try_from(input.text[..byte_pos].width()).unwrap_or(u16::MAX);

    let max_x = area.x + area.width.saturating_sub(2);
    let x = (area.x + 1).saturating_add(columns).min(max_x);
    Position::new(x, area.y + 1)
}

/// Transcript lines; each message is split on its line breaks.
fn transcript_lines(state: &ConversationState, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in state.messages() {
        let (label, color) = match msg.role {
            ChatRole::User => ("You:", Color::Cyan),
            ChatRole::Assistant => ("Assistant:", Color::Yellow),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for line in msg.content.split('\n') {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if state.is_loading() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_transcript(app: &mut App, state: &ConversationState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let text = if state.messages().is_empty() && !state.is_loading() {
        Text::from(Span::styled(
            "Pick a slide deck and a transcript, then press Enter.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(transcript_lines(state, app.animation_frame))
    };

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });

    // Scroll bounds depend on the wrapped height, which only the render knows
    app.transcript_height = area.height.saturating_sub(2);
    app.total_transcript_lines = paragraph
        .line_count(area.width.saturating_sub(2))
        .min(u16::MAX as usize) as u16;
    let max_scroll = app.total_transcript_lines.saturating_sub(app.transcript_height);
    app.transcript_scroll = app.transcript_scroll.min(max_scroll);

    frame.render_widget(paragraph.scroll((app.transcript_scroll, 0)), area);
}

fn render_error(error: &str, frame: &mut Frame, area: Rect) {
    let banner = Paragraph::new(error.to_string())
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error "),
        );
    frame.render_widget(banner, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let submit_hint = if app.is_submitting() { "sending…" } else { "Enter submit" };
    let hints = format!(
        " {} | Tab switch field | ↑/↓ scroll | Ctrl-L clear | Ctrl-O sign out | Esc quit",
        submit_hint
    );
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckproof_core::ChatMessage;

    #[test]
    fn test_transcript_splits_on_line_breaks() {
        let mut state = ConversationState::new();
        state.append_message(ChatMessage::assistant("Fixed 3 typos.\nSee highlights."));

        let lines = transcript_lines(&state, 0);
        let rendered: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(rendered, vec!["Assistant:", "Fixed 3 typos.", "See highlights.", ""]);
    }

    #[test]
    fn test_loading_indicator_animates() {
        let mut state = ConversationState::new();
        state.set_loading(true);

        let rendered: Vec<String> = transcript_lines(&state, 2).iter().map(|l| l.to_string()).collect();
        assert_eq!(rendered, vec!["Assistant:", "Thinking..."]);
    }

    #[test]
    fn test_cursor_counts_display_columns() {
        let area = Rect::new(0, 0, 40, 3);
        let input = PathInput {
            text: "講義.txt".to_string(),
            cursor: 2,
        };
        assert_eq!(cursor_position(&input, area), Position::new(5, 1));

        let end = PathInput {
            cursor: input.text.chars().count(),
            ..input
        };
        assert_eq!(cursor_position(&end, area), Position::new(9, 1));
    }

    #[test]
    fn test_cursor_stays_inside_border() {
        let area = Rect::new(2, 4, 6, 3);
        let input = PathInput {
            text: "long/path/deck.pptx".to_string(),
            cursor: 19,
        };
        assert_eq!(cursor_position(&input, area), Position::new(6, 5));
    }
}
