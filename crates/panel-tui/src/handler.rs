use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use panel_core::Phase;
use crate::app::{App, FocusPane, InputMode};
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
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_tasks().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,

        // Start over with the draft's skills
        KeyCode::Char('b') => app.begin_evaluation(),

        KeyCode::Char('i') | KeyCode::Enter => match app.evaluation.phase() {
            Phase::Evaluating(_) | Phase::AwaitingRemote(_) => {
                app.input_mode = InputMode::Editing;
            }
            Phase::NotStarted => {
                app.status = Some("Press 'b' to begin the evaluation".to_string());
            }
            Phase::Complete => {
                app.status = Some("Evaluation complete, press 's' to submit".to_string());
            }
        },

        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Chat => FocusPane::Ratings,
                FocusPane::Ratings => FocusPane::Chat,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Chat => app.scroll_chat_down(1),
            FocusPane::Ratings => app.ratings_nav_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Chat => app.scroll_chat_up(1),
            FocusPane::Ratings => app.ratings_nav_up(),
        },
        KeyCode::PageDown => app.scroll_chat_down((app.chat_height / 2).max(1)),
        KeyCode::PageUp => app.scroll_chat_up((app.chat_height / 2).max(1)),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Manual rating for the selected skill; 0 stands for 10
        KeyCode::Char(c @ '0'..='9') => {
            let rating = match c.to_digit(10) {
                Some(0) => 10.0,
                Some(d) => d as f64,
                None => return,
            };
            app.set_manual_rating(rating);
        }

        KeyCode::Char('s') => app.submit_interview(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_ratings = app.ratings_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp if in_chat => app.scroll_chat_up(3),
        MouseEventKind::ScrollDown if in_ratings => app.ratings_nav_down(),
        MouseEventKind::ScrollUp if in_ratings => app.ratings_nav_up(),
        _ => {}
    }
}
