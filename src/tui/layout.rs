use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::i18n;
use crate::tui::app::{ActivePane, TuiApp};

pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),      // Creators pane
            Constraint::Percentage(40), // Posts pane
            Constraint::Min(10),        // Preview pane
            Constraint::Length(1),      // Status bar
        ])
        .split(frame.area());

    render_creators_pane(frame, app, chunks[0]);
    render_posts_pane(frame, app, chunks[1]);
    render_preview_pane(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn selection_style(selected: bool, pane_active: bool) -> Option<Style> {
    if selected && pane_active {
        Some(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
    } else if selected {
        Some(Style::default().bg(Color::DarkGray))
    } else {
        None
    }
}

fn render_creators_pane(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let is_active = app.active_pane == ActivePane::Creators;

    let items: Vec<ListItem> = app
        .groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let content = format!("{} ({})", group.creator_name, group.count());
            let style = selection_style(i == app.group_index, is_active).unwrap_or_default();
            ListItem::new(content).style(style)
        })
        .collect();

    let title = format!(
        " {} ",
        i18n::tf("creators_header", &[("count", app.groups.len().to_string())])
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_active));

    frame.render_widget(List::new(items).block(block), area);
}

fn render_posts_pane(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let is_active = app.active_pane == ActivePane::Posts;

    let posts = app
        .selected_group()
        .map(|g| g.posts.as_slice())
        .unwrap_or(&[]);

    let items: Vec<ListItem> = posts
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let content = format!(
                "{} [{}] {}",
                post.publish_time.format("%m/%d"),
                i18n::t(post.kind.label_key()),
                post.display_title()
            );
            let style = selection_style(i == app.post_index, is_active).unwrap_or_default();
            ListItem::new(content).style(style)
        })
        .collect();

    let title = format!(" Posts ({}) ", posts.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_active));

    frame.render_widget(List::new(items).block(block), area);
}

fn render_preview_pane(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let is_active = app.active_pane == ActivePane::Preview;

    let (title, content) = if app.summary_for_selected().is_some() {
        (summary_title(app), summary_text(app))
    } else if let Some(post) = app.selected_post() {
        let mut lines = Vec::new();
        lines.push(Line::from(Span::styled(
            post.display_title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Date: {}", post.publish_time.format("%Y-%m-%d %H:%M")),
            Style::default().fg(Color::Yellow),
        )));
        if !post.url.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Link: {}", post.url),
                Style::default().fg(Color::Blue),
            )));
        }
        lines.push(Line::from(""));
        for line in post.body_text.lines() {
            lines.push(Line::from(line.to_string()));
        }
        (format!(" {} ", post.display_title()), Text::from(lines))
    } else {
        (
            " Preview ".to_string(),
            Text::from(i18n::t("tui_no_summary")),
        )
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_active));

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll, 0));

    frame.render_widget(paragraph, area);
}

fn summary_title(app: &TuiApp) -> String {
    let (name, provider) = match (app.selected_group(), app.summary_for_selected()) {
        (Some(g), Some(s)) => (g.creator_name.clone(), s.provider_used.to_string()),
        _ => (String::new(), String::new()),
    };
    format!(
        " {} ",
        i18n::tf("summary_header", &[("name", name), ("provider", provider)])
    )
}

fn summary_text(app: &TuiApp) -> Text<'static> {
    let Some(summary) = app.summary_for_selected() else {
        return Text::default();
    };
    let Some(group) = app.selected_group() else {
        return Text::default();
    };

    // Ids back to prompt indices so citations render as compact [n] marks.
    let index_of: std::collections::HashMap<&str, usize> = group
        .posts
        .iter()
        .take(summary.source_count)
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i + 1))
        .collect();

    let mut lines = Vec::new();
    for sentence in &summary.sentences {
        let marks: Vec<String> = sentence
            .refs
            .iter()
            .filter_map(|id| index_of.get(id.as_str()).map(ToString::to_string))
            .collect();
        let text = if marks.is_empty() {
            format!("- {}", sentence.text)
        } else {
            format!("- {} [{}]", sentence.text, marks.join(","))
        };
        lines.push(Line::from(text));
    }

    lines.push(Line::from(""));
    for (i, post) in group.posts.iter().take(summary.source_count).enumerate() {
        lines.push(Line::from(Span::styled(
            format!(
                "[{}] {} {}",
                i + 1,
                post.publish_time.format("%Y-%m-%d"),
                post.display_title()
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}

fn render_status_bar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let status = if app.is_busy {
        app.status_message
            .clone()
            .unwrap_or_else(|| i18n::t("tui_refreshing"))
    } else if let Some(ref msg) = app.status_message {
        msg.clone()
    } else {
        i18n::t("tui_keys")
    };

    let paragraph =
        Paragraph::new(status).style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
