use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, PathInput};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await,
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    app.poll_submission().await;
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('l') => app.clear_conversation(),
            KeyCode::Char('o') => app.sign_out().await,
            KeyCode::Char('d') => app.scroll_half_page_down(),
            KeyCode::Char('u') => app.scroll_half_page_up(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
        KeyCode::Enter => app.submit(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::PageDown => app.scroll_half_page_down(),
        _ => edit_input(app.focused_input(), key.code),
    }
}

fn edit_input(input: &mut PathInput, code: KeyCode) {
    match code {
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&input.text, input.cursor);
            input.text.insert(byte_pos, c);
            input.cursor += 1;
        }
        KeyCode::Backspace => {
            if input.cursor > 0 {
                input.cursor -= 1;
                let byte_pos = char_to_byte_index(&input.text, input.cursor);
                input.text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if input.cursor < input.text.chars().count() {
                let byte_pos = char_to_byte_index(&input.text, input.cursor);
                input.text.remove(byte_pos);
            }
        }
        KeyCode::Left => input.cursor = input.cursor.saturating_sub(1),
        KeyCode::Right => input.cursor = (input.cursor + 1).min(input.text.chars().count()),
        KeyCode::Home => input.cursor = 0,
        KeyCode::End => input.cursor = input.text.chars().count(),
        _ => {}
    }
}
