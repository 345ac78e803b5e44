// Modal UI components.
// Video details and the login redirect input, drawn over the current view.

use ratatui::{prelude::*, widgets::*};

use crate::feed::VideoSummary;

use super::grid::format_relative_time;

/// Centered rect of at most the given size.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn instructions(frame: &mut Frame, area: Rect, keys: &[(&'static str, &'static str)]) {
    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!(" {}", key), Style::default().fg(Color::Yellow)),
                Span::styled(format!(" = {} ", action), Style::default().fg(Color::DarkGray)),
            ]
        })
        .collect();

    let widget = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(widget, area);
}

/// Draw the details of one video.
pub fn draw_video_modal(frame: &mut Frame, video: &VideoSummary) {
    let modal_area = centered(frame.area(), 80, 14);
    frame.render_widget(Clear, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(modal_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Video ");

    let label = Style::default().fg(Color::DarkGray);
    let published = video
        .published_at
        .as_ref()
        .map(|at| {
            format!(
                "{} ({})",
                at.format("%Y-%m-%d %H:%M"),
                format_relative_time(at)
            )
        })
        .unwrap_or_else(|| "unknown".to_string());

    let lines = vec![
        Line::from(Span::styled(
            video.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Channel:   ", label),
            Span::styled(video.channel_title.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![Span::styled("Published: ", label), Span::raw(published)]),
        Line::from(vec![
            Span::styled("Watch:     ", label),
            Span::styled(video.watch_url(), Style::default().fg(Color::Blue)),
        ]),
        Line::from(vec![
            Span::styled("Embed:     ", label),
            Span::styled(video.embed_url(), Style::default().fg(Color::Blue)),
        ]),
    ];

    let body = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, chunks[0]);

    instructions(frame, chunks[1], &[("Esc", "Close")]);
}

/// Draw the input for the URL the login flow redirected to.
pub fn draw_login_modal(frame: &mut Frame, input: &str, login_url: Option<&str>) {
    let modal_area = centered(frame.area(), 80, 12);
    frame.render_widget(Clear, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Explanation
            Constraint::Length(3), // Input
            Constraint::Length(1), // Instructions
        ])
        .split(modal_area);

    let mut lines = vec![Line::from("Open this address in a browser and sign in:")];
    match login_url {
        Some(url) => lines.push(Line::from(Span::styled(
            url.to_string(),
            Style::default().fg(Color::Blue),
        ))),
        None => lines.push(Line::from(Span::styled(
            "login URL is not configured",
            Style::default().fg(Color::Red),
        ))),
    }
    lines.push(Line::from("Then paste the address you were sent back to."));

    let explanation = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Log In "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(explanation, chunks[0]);

    // Show the tail so the cursor stays visible for long URLs
    let width = chunks[1].width.saturating_sub(12) as usize;
    let skip = input.chars().count().saturating_sub(width);
    let visible: String = input.chars().skip(skip).collect();

    let input_line = Line::from(vec![
        Span::styled("Redirect: ", Style::default().fg(Color::DarkGray)),
        Span::raw(visible),
        Span::styled("█", Style::default().fg(Color::Yellow)),
    ]);
    let input_widget = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(input_widget, chunks[1]);

    instructions(frame, chunks[2], &[("Enter", "Log in"), ("Esc", "Cancel")]);
}
