use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus};
use crate::form::{HasValue, TextField, UploadStatus};

const FORM_WIDTH: u16 = 60;

fn border_style(focused: bool, has_error: bool) -> Style {
    if has_error {
        Style::default().fg(Color::Red)
    } else if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    }
}

/// Bordered block titled with the label, error message on the bottom edge.
fn field_block<'a>(label: &'a str, error: Option<&'a str>, focused: bool) -> Block<'a> {
    let mut block = Block::default()
        .title(format!(" {} ", label))
        .borders(Borders::ALL)
        .border_style(border_style(focused, error.is_some()));

    if let Some(error) = error {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::Red),
        )));
    }

    block
}

pub fn draw(f: &mut Frame, app: &App) {
    draw_form(f, app);

    if let Some(ref path) = app.upload_prompt {
        draw_upload_prompt(f, path);
    }

    if let Some(ref notice) = app.notice {
        draw_notice(f, &notice.message);
    }
}

fn draw_form(f: &mut Frame, app: &App) {
    let area = f.area();
    let form = &app.form;
    let email_visible = form.email.is_visible();

    let mut constraints = vec![
        Constraint::Length(3), // First name
        Constraint::Length(3), // Last name
        Constraint::Length(3), // Handle
        Constraint::Length(4), // Avatar
        Constraint::Length(3), // Password
        Constraint::Length(3), // Password again
        Constraint::Length(1), // Allow marketing
    ];
    if email_visible {
        constraints.push(Constraint::Length(3));
    }
    constraints.extend([
        Constraint::Length(2), // Status label
        Constraint::Length(3), // Submit
        Constraint::Length(1), // Hints
    ]);
    let form_height: u16 = constraints
        .iter()
        .map(|c| match c {
            Constraint::Length(n) => *n,
            _ => 0,
        })
        .sum::<u16>()
        + 4;

    let width = FORM_WIDTH.min(area.width);
    let height = form_height.min(area.height);
    let form_area = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let form_block = Block::default()
        .title(" Signup form ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = form_block.inner(form_area);
    f.render_widget(form_block, form_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(inner);

    draw_text_field(f, chunks[0], &form.firstname, app.focus == Focus::Firstname);
    draw_text_field(f, chunks[1], &form.lastname, app.focus == Focus::Lastname);
    draw_text_field(f, chunks[2], &form.handle, app.focus == Focus::Handle);
    draw_avatar_field(f, chunks[3], app);
    draw_text_field(f, chunks[4], &form.password, app.focus == Focus::Password);
    draw_text_field(
        f,
        chunks[5],
        &form.password_confirm,
        app.focus == Focus::PasswordConfirm,
    );
    draw_checkbox(f, chunks[6], app);

    let mut next = 7;
    if email_visible {
        draw_text_field(f, chunks[next], &form.email, app.focus == Focus::Email);
        next += 1;
    }

    // Status label
    if let Some(status) = app.status() {
        let text = Paragraph::new(status)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        f.render_widget(text, chunks[next]);
    }

    draw_submit(f, chunks[next + 1], app);

    let hint = Paragraph::new("Tab next | Enter select | Ctrl+S submit | Ctrl+R reset | Esc quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[next + 2]);

    // Cursor at the end of the focused text input
    let cursor_chunk = match app.focus {
        Focus::Firstname => Some((0, &form.firstname)),
        Focus::Lastname => Some((1, &form.lastname)),
        Focus::Handle => Some((2, &form.handle)),
        Focus::Password => Some((4, &form.password)),
        Focus::PasswordConfirm => Some((5, &form.password_confirm)),
        Focus::Email if email_visible => Some((7, &form.email)),
        _ => None,
    };
    if app.upload_prompt.is_none() {
        if let Some((idx, field)) = cursor_chunk {
            let chunk = chunks[idx];
            let offset = field.display().chars().count() as u16;
            f.set_cursor_position((chunk.x + 1 + offset, chunk.y + 1));
        }
    }
}

fn draw_text_field(f: &mut Frame, area: Rect, field: &TextField, focused: bool) {
    let block = field_block(field.label, field.error(), focused);
    let text = Paragraph::new(field.display()).block(block);
    f.render_widget(text, area);
}

fn draw_avatar_field(f: &mut Frame, area: Rect, app: &App) {
    let avatar = &app.form.avatar;
    let focused = app.focus == Focus::Avatar;
    let block = field_block(avatar.label, avatar.error(), focused);

    let preview = match avatar.preview() {
        Some(caption) => Span::styled(caption, Style::default().fg(Color::Green)),
        None => Span::styled("No avatar", Style::default().fg(Color::DarkGray)),
    };

    let status = match avatar.status() {
        UploadStatus::Receiving => Span::styled(
            format!(
                "Receiving... {} bytes",
                avatar.received_bytes().unwrap_or(0)
            ),
            Style::default().fg(Color::Yellow),
        ),
        UploadStatus::Failed => Span::styled(
            format!("Upload failed: {}", avatar.upload_error().unwrap_or("unknown error")),
            Style::default().fg(Color::Red),
        ),
        UploadStatus::Idle | UploadStatus::HasValue => Span::styled(
            if focused {
                "Enter to upload file..."
            } else {
                "Upload file..."
            },
            Style::default().fg(Color::DarkGray),
        ),
    };

    let text = Paragraph::new(vec![Line::from(preview), Line::from(status)]).block(block);
    f.render_widget(text, area);
}

fn draw_checkbox(f: &mut Frame, area: Rect, app: &App) {
    let checkbox = &app.form.allows_marketing;
    let focused = app.focus == Focus::AllowsMarketing;
    let mark = if checkbox.is_checked() { "[x]" } else { "[ ]" };

    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let text = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} ", mark), style.add_modifier(Modifier::BOLD)),
        Span::styled(checkbox.label, style),
    ]));
    f.render_widget(text, area);
}

fn draw_submit(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Submit;
    let style = if focused {
        Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Blue)
    };
    let button = Paragraph::new("Join the community")
        .style(style)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
    f.render_widget(button, area);
}

fn draw_upload_prompt(f: &mut Frame, path: &str) {
    let area = centered_rect(60, 20, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Avatar image path ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text = Paragraph::new(vec![
        Line::from(path),
        Line::from(""),
        Line::from(Span::styled(
            "Enter upload | Esc cancel | images up to 1 MiB",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(block);

    f.render_widget(text, area);
    f.set_cursor_position((area.x + 1 + path.chars().count() as u16, area.y + 1));
}

fn draw_notice(f: &mut Frame, message: &str) {
    let area = centered_rect(50, 15, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Success ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let text = Paragraph::new(message)
        .style(Style::default().fg(Color::Green))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};
    use rstest::rstest;
    use signup_shared::InMemoryUserDetailsService;
    use std::sync::Arc;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 50)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        App::new(Arc::new(InMemoryUserDetailsService::new()), Config::default())
    }

    #[rstest]
    fn test_email_only_drawn_when_marketing_allowed() {
        let mut app = app();

        assert!(!render(&app).contains(" Email "));

        app.toggle_marketing();

        assert!(render(&app).contains(" Email "));
    }

    #[rstest]
    fn test_field_errors_are_drawn() {
        let mut app = app();

        app.submit();

        assert!(render(&app).contains("First name is required"));
    }

    #[rstest]
    fn test_rejected_upload_shows_reason() {
        let mut app = app();

        app.form
            .avatar
            .on_file_rejected(crate::form::INCORRECT_FILE_TYPE_MESSAGE);

        assert!(render(&app).contains("Upload failed: Incorrect File Type."));
    }

    #[rstest]
    fn test_password_is_masked_on_screen() {
        let mut app = app();
        app.form.password.set_value("hunter22".to_string());

        let screen = render(&app);

        assert!(!screen.contains("hunter22"));
        assert!(screen.contains("********"));
    }
}
