use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use panel_core::{ChatRole, Phase};
use crate::app::{App, FocusPane, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        if end > 0 {
            spans.push(Span::styled(
                after[..end].to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{:.0}", rating)
    } else {
        format!("{:.1}", rating)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [chat_column, ratings_area] = Layout::horizontal([
        Constraint::Percentage(65),
        Constraint::Percentage(35),
    ])
    .areas(body_area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_ratings(app, frame, ratings_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let candidate = if app.draft.candidate_name.trim().is_empty() {
        "Unnamed candidate".to_string()
    } else {
        app.draft.candidate_name.clone()
    };

    let title = Line::from(vec![
        Span::styled(" Interview Panel ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(format!("{} ", candidate)),
        Span::styled(app.draft.subject.clone(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(app.draft.date.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    // Inner size minus borders, used for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.focus == FocusPane::Chat { Color::Cyan } else { Color::DarkGray };
    let title = match app.evaluation.current_skill() {
        Some(skill) => format!(" {} | discussing {} ", app.taker_label, skill),
        None => format!(" {} ", app.taker_label),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let text = if app.evaluation.phase() == Phase::NotStarted {
        Text::from(Span::styled(
            "Press 'b' to start the expertise evaluation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.evaluation.transcript() {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "Candidate:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.content.clone()));
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Evaluator:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.is_thinking() {
            lines.push(Line::from(Span::styled(
                "Evaluator:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Your answer ");

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.input_cursor >= inner_width {
        app.input_cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (app.input_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_ratings(app: &mut App, frame: &mut Frame, area: Rect) {
    app.ratings_area = Some(area);

    let summary = app.evaluation.finalize();
    let current = app.evaluation.current_skill_index();
    let border_color = if app.focus == FocusPane::Ratings { Color::Cyan } else { Color::Magenta };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Ratings | overall {} ", summary.overall));

    let items: Vec<ListItem> = app
        .rating_rows()
        .into_iter()
        .enumerate()
        .map(|(i, (skill, rating))| {
            let marker = if current == Some(i) { "▶ " } else { "  " };
            let value = rating.map(format_rating).unwrap_or_else(|| "-".to_string());
            let style = if rating.is_some() {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::raw(format!("{:<20}", skill)),
                Span::styled(value, style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(list, area, &mut app.ratings_state);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ANSWER ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " done ")],
        InputMode::Normal => &[
            (" b ", " begin "),
            (" i ", " answer "),
            (" Tab ", " focus "),
            (" j/k ", " move "),
            (" 0-9 ", " rate "),
            (" s ", " submit "),
            (" q ", " quit "),
        ],
    };
    for (key, label) in hints {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    if let Some(status) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_markdown_is_styled() {
        let line = parse_markdown_line("Rated **7** for Go");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "7");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_markers_stay_literal() {
        let line = parse_markdown_line("**open only");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "**open only");
    }

    #[test]
    fn ratings_format_compactly() {
        assert_eq!(format_rating(7.0), "7");
        assert_eq!(format_rating(6.5), "6.5");
    }
}
