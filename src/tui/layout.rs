use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use crate::session::SessionController;
use crate::tui::app::{AddField, TuiApp};

pub fn render(frame: &mut Frame, app: &mut TuiApp, controller: &SessionController) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Bookmark list or sign-in prompt
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    if controller.is_signed_in() {
        render_bookmark_list(frame, app, controller, chunks[0]);
    } else {
        render_signed_out(frame, chunks[0]);
    }
    render_status_bar(frame, app, controller, chunks[1]);

    if app.add_dialog.is_some() {
        render_add_dialog(frame, app);
    }
}

fn render_signed_out(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Not signed in",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press s to sign in with your browser."),
    ];

    let block = Block::default().title(" ribbon ").borders(Borders::ALL);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

fn render_bookmark_list(
    frame: &mut Frame,
    app: &mut TuiApp,
    controller: &SessionController,
    area: Rect,
) {
    let bookmarks = controller.bookmarks();

    if bookmarks.is_empty() {
        let block = Block::default().title(" Bookmarks ").borders(Borders::ALL);
        let paragraph = Paragraph::new("No bookmarks yet. Press a to add one.")
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = bookmarks
        .iter()
        .map(|bookmark| {
            let date = bookmark.created_at.format("%m/%d").to_string();
            let line = Line::from(vec![
                Span::styled(date, Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    bookmark.display_title().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(bookmark.url.clone(), Style::default().fg(Color::Blue)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let title = format!(
        " Bookmarks ({}) [{}/{}] ",
        bookmarks.len(),
        app.selected + 1,
        bookmarks.len().max(1)
    );

    let block = Block::default().title(title).borders(Borders::ALL);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_status_bar(frame: &mut Frame, app: &TuiApp, controller: &SessionController, area: Rect) {
    let status = if let Some((_, ref title)) = app.pending_delete {
        format!("Delete \"{}\"? (y/n)", title)
    } else if let Some(ref msg) = app.status_message {
        msg.clone()
    } else if controller.is_signed_in() {
        "j/k:Nav  a:Add  d:Delete  o:Open  R:Refresh  S:Sign out  q:Quit".to_string()
    } else {
        "s:Sign in  q:Quit".to_string()
    };

    let paragraph =
        Paragraph::new(status).style(Style::default().fg(Color::Black).bg(Color::Gray));

    frame.render_widget(paragraph, area);
}

fn render_add_dialog(frame: &mut Frame, app: &TuiApp) {
    let Some(dialog) = app.add_dialog.as_ref() else {
        return;
    };

    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);

    let field_style = |active: bool| {
        if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Title: ", field_style(dialog.field == AddField::Title)),
            Span::raw(dialog.title.clone()),
            cursor_span(dialog.field == AddField::Title),
        ]),
        Line::from(vec![
            Span::styled("URL:   ", field_style(dialog.field == AddField::Url)),
            Span::raw(dialog.url.clone()),
            cursor_span(dialog.field == AddField::Url),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Enter:Next/Save  Esc:Cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(" Add bookmark ")
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn cursor_span(active: bool) -> Span<'static> {
    if active {
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK))
    } else {
        Span::raw("")
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
