// UI module for rendering the TUI.
// Contains the tab bar, card grids, login screen, console and overlays.

mod grid;
mod modal;
mod tabs;

use ratatui::{prelude::*, widgets::*};

use crate::app::{App, Modal, Tab};
use crate::feed::endpoints;
use crate::state::ConsoleLevel;

/// Main draw function that renders the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    tabs::draw_tabs(frame, app, chunks[0]);
    draw_content(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    match &app.modal {
        Some(Modal::Video(video)) => modal::draw_video_modal(frame, video),
        Some(Modal::Login { input }) => {
            let login_url = endpoints::login_url(app.client().config())
                .ok()
                .map(|url| url.to_string());
            modal::draw_login_modal(frame, input, login_url.as_deref());
        }
        None => {}
    }

    // Help overlay (rendered last, on top of everything)
    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the main content area based on active tab.
fn draw_content(frame: &mut Frame, app: &mut App, area: Rect) {
    if app.active_tab.requires_auth() && !app.auth.is_authenticated() {
        draw_login_screen(frame, app, area);
        return;
    }

    match app.active_tab {
        Tab::Feed => grid::draw_video_grid(frame, &app.feed, area, "Subscriptions Feed"),
        Tab::Search => draw_search_tab(frame, app, area),
        Tab::Subscriptions => grid::draw_channel_grid(frame, &app.subscriptions, area),
        Tab::Console => draw_console_tab(frame, app, area),
    }
}

/// Shown in place of Feed and Search while no credential is cached.
fn draw_login_screen(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Log In ");

    let mut lines = vec![Line::from("")];
    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from("You are not logged in."));
    lines.push(Line::from(""));

    match endpoints::login_url(app.client().config()) {
        Ok(url) => {
            lines.push(Line::from("Sign in with your video account at:"));
            lines.push(Line::from(Span::styled(
                url.to_string(),
                Style::default().fg(Color::Blue),
            )));
        }
        Err(e) => lines.push(Line::from(Span::styled(
            e.to_string(),
            Style::default().fg(Color::Red),
        ))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Then press "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" and paste the address you were redirected to."),
    ]));

    let text = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(text, area);
}

fn draw_search_tab(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search = &app.search;
    let border = if search.editing {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let mut input = vec![
        Span::styled("Search: ", Style::default().fg(Color::DarkGray)),
        Span::raw(search.input.clone()),
    ];
    if search.editing {
        input.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    } else if search.input.is_empty() {
        input.push(Span::styled(
            "press / to type",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let input_widget = Paragraph::new(Line::from(input)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(input_widget, chunks[0]);

    match &search.query {
        Some(query) => grid::draw_video_grid(
            frame,
            &search.results,
            chunks[1],
            &format!("Results for \"{}\"", query),
        ),
        None => {
            let block = Block::default().borders(Borders::ALL).title(" Results ");
            let inner = block.inner(chunks[1]);
            frame.render_widget(block, chunks[1]);
            grid::render_empty(frame, inner, "Type a query and press Enter");
        }
    }
}

fn draw_console_tab(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Console ");

    if app.console.messages.is_empty() {
        let text = Paragraph::new("No messages")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .console
        .messages
        .iter()
        .map(|msg| {
            let (icon, color) = match msg.level {
                ConsoleLevel::Error => ("❌", Color::Red),
                ConsoleLevel::Warn => ("⚠️", Color::Yellow),
                ConsoleLevel::Info => ("ℹ️", Color::Cyan),
            };

            let time = grid::format_relative_time(&msg.timestamp);

            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", icon)),
                Span::styled(time, Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(msg.message.clone(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let list_widget = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list_widget, area, &mut app.console.list_state);
}

fn hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::raw(format!("  {} ", key)),
        Span::styled(action, Style::default().fg(Color::DarkGray)),
    ]
}

/// Draw the status bar with keybinding hints.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut pairs = vec![hint("Tab", "Switch")];

    if app.active_tab.requires_auth() && !app.auth.is_authenticated() {
        pairs.push(hint("↵", "Log in"));
    } else {
        match app.active_tab {
            Tab::Feed => {
                pairs.push(hint("←↓↑→", "Navigate"));
                pairs.push(hint("↵", "Open"));
                pairs.push(hint("r", "Refresh"));
            }
            Tab::Search if app.search.editing => {
                pairs.push(hint("↵", "Search"));
                pairs.push(hint("Esc", "Stop typing"));
            }
            Tab::Search => {
                pairs.push(hint("/", "Type"));
                pairs.push(hint("←↓↑→", "Navigate"));
                pairs.push(hint("↵", "Open"));
            }
            Tab::Subscriptions => {
                pairs.push(hint("←↓↑→", "Navigate"));
                pairs.push(hint("Space", "Toggle"));
                pairs.push(hint("f", "Filter"));
            }
            Tab::Console => pairs.push(hint("↑↓", "Scroll")),
        }
    }

    if app.auth.is_authenticated() {
        pairs.push(hint("x", "Log out"));
    }
    pairs.push(hint("?", "Help"));
    pairs.push(hint("q", "Quit"));

    let mut spans: Vec<Span> = pairs.into_iter().flatten().collect();

    if let Some(loaded_at) = &app.feed.loaded_at {
        spans.push(Span::styled(
            format!("  Updated {}", grid::format_relative_time(loaded_at)),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let status = Paragraph::new(Line::from(spans));
    frame.render_widget(status, area);
}

/// Draw the help overlay.
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 50.min(area.width);
    let popup_height = 20.min(area.height);
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let key = |keys: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<14}", keys), Style::default().fg(Color::Cyan)),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        key("←↓↑→ or hjkl", "Move through the grid"),
        key("Enter", "Open video / log in"),
        key("Esc", "Close dialog / stop typing"),
        key("Tab / S-Tab", "Switch tabs"),
        key("r", "Refresh feed or search"),
        key("/", "Type a search query"),
        key("Space", "Toggle subscription"),
        key("f", "Cycle channel filter"),
        key("L", "Log in"),
        key("x", "Log out"),
        key("?", "Show/hide this help"),
        key("q", "Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press Esc or ? to close",
            Style::default().fg(Color::DarkGray),
        )]),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help "),
    );

    frame.render_widget(help, popup_area);
}
