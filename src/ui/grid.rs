// Card grid rendering for videos and channels.
// Provides grid layouts with loading, error and empty states.

use chrono::{DateTime, Utc};
use ratatui::{prelude::*, widgets::*};

use crate::feed::VideoSummary;
use crate::state::{Channel, GridState, LoadingState, SubscriptionsTabState, VideoListState};

/// Height of one card, borders included.
const CARD_HEIGHT: u16 = 5;

/// Format a timestamp as relative time (e.g., "2h ago").
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(*dt);

    if duration.num_days() > 0 {
        format!("{}d ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Render a loading indicator.
pub fn render_loading(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(format!("⏳ {}...", message))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(text, area);
}

/// Render an error message.
pub fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let text = Paragraph::new(format!("❌ {}", error))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Red));
    frame.render_widget(text, area);
}

/// Render an empty state message.
pub fn render_empty(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(text, area);
}

/// First row to draw so the selected row stays on screen.
pub fn first_visible_row(selected_row: usize, visible_rows: usize) -> usize {
    selected_row.saturating_sub(visible_rows.saturating_sub(1))
}

/// Draw the grid of video cards for the Feed and Search tabs.
pub fn draw_video_grid(frame: &mut Frame, list: &VideoListState, area: Rect, title: &str) {
    let title = if list.is_fetching() && list.status().is_loaded() {
        format!(" {} (refreshing) ", title)
    } else {
        format!(" {} ", title)
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match list.status() {
        LoadingState::Idle => render_empty(frame, inner, "Press 'r' to load videos"),
        LoadingState::Loading => render_loading(frame, inner, "Loading videos"),
        LoadingState::Error(e) => render_error(frame, inner, e),
        LoadingState::Loaded(videos) if videos.is_empty() => {
            render_empty(frame, inner, "No videos found")
        }
        LoadingState::Loaded(_) => draw_cards(frame, &list.grid, inner, video_card),
    }
}

/// Draw the mock channel grid for the Subscriptions tab.
pub fn draw_channel_grid(frame: &mut Frame, state: &SubscriptionsTabState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Channels: {} ", state.filter.title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    draw_cards(frame, &state.grid, inner, |channel, selected| {
        channel_card(channel, selected, state.is_subscribed(channel))
    });
}

/// Lay out the loaded items of a grid as bordered cards.
fn draw_cards<T>(
    frame: &mut Frame,
    grid: &GridState<T>,
    area: Rect,
    card: impl Fn(&T, bool) -> Paragraph<'static>,
) {
    let Some(items) = grid.data.data() else {
        return;
    };

    let columns = grid.columns();
    let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
    let first_row = first_visible_row(grid.selected_row().unwrap_or(0), visible_rows);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(CARD_HEIGHT); visible_rows])
        .split(area);

    for (row_offset, row_area) in row_areas.iter().enumerate() {
        let row = first_row + row_offset;
        let start = row * columns;
        if start >= items.len() {
            break;
        }

        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row_area);

        for (col, cell) in cells.iter().enumerate() {
            let index = start + col;
            let Some(item) = items.get(index) else {
                break;
            };
            let selected = grid.selected() == Some(index);
            frame.render_widget(card(item, selected), *cell);
        }
    }
}

fn card_block(selected: bool) -> Block<'static> {
    let style = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if selected {
        BorderType::Thick
    } else {
        BorderType::Rounded
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(style)
}

fn video_card(video: &VideoSummary, selected: bool) -> Paragraph<'static> {
    let title_style = if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let published = video
        .published_at
        .as_ref()
        .map(format_relative_time)
        .unwrap_or_default();

    let lines = vec![
        Line::from(Span::styled(video.title.clone(), title_style)),
        Line::from(vec![
            Span::styled(video.channel_title.clone(), Style::default().fg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(published, Style::default().fg(Color::DarkGray)),
        ]),
    ];

    Paragraph::new(lines)
        .block(card_block(selected))
        .wrap(Wrap { trim: true })
}

fn channel_card(channel: &Channel, selected: bool, subscribed: bool) -> Paragraph<'static> {
    let (label, color) = if subscribed {
        ("✓ Subscribed", Color::Green)
    } else {
        ("+ Subscribe", Color::DarkGray)
    };

    let lines = vec![
        Line::from(vec![
            Span::raw(format!("{} ", channel.icon)),
            Span::styled(channel.name, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(
            format!("{} subscribers", channel.subscribers),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(label, Style::default().fg(color))),
    ];

    Paragraph::new(lines).block(card_block(selected))
}
