use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use transdoc_core::BlockId;

use crate::app::App;
use crate::view::render_footer;

/// Render the block screen: source on top, editable destination below.
pub fn render(f: &mut Frame, app: &App, block_id: &BlockId) {
    let theme = &app.theme;
    let area = f.area();
    let cached = app.session.blocks.iter().find(|b| &b.id == block_id);

    let chunks = Layout::vertical([
        Constraint::Length(1),      // breadcrumb
        Constraint::Percentage(45), // source
        Constraint::Min(5),         // destination
        Constraint::Length(1),      // footer
    ])
    .split(area);

    // --- Breadcrumb ---
    let mut spans = vec![
        Span::styled(" TRANSDOC ", theme.header_style()),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(
            format!("block {block_id}"),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ];
    match cached {
        Some(b) => {
            spans.push(Span::styled(
                format!("  #{}  {}  {}", b.order_no, b.kind, b.locator),
                Style::default().fg(theme.dim),
            ));
            spans.push(Span::styled(
                format!("  {}", b.status),
                Style::default().fg(theme.block_status_color(&b.status)),
            ));
        }
        None => spans.push(Span::styled(
            "  (no longer in the block list)",
            Style::default().fg(theme.failed),
        )),
    }
    if app.session.dirty {
        spans.push(Span::styled("  [modified]", Style::default().fg(theme.edited)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

    // --- Source ---
    let source = Paragraph::new(app.session.source.as_str())
        .style(Style::default().fg(theme.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Source "),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    f.render_widget(source, chunks[1]);

    render_destination(f, chunks[2], app);

    let hints = if app.editing {
        "Ctrl+S:save  Esc:discard"
    } else {
        "e:edit  Ctrl+S:save  j/k:scroll  Esc:back  ?:help"
    };
    render_footer(f, chunks[3], app, hints);
}

fn render_destination(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let (text, border, title) = if app.editing {
        let mut text = app.draft.clone();
        text.push('▏');
        (text, theme.focused_border_style(), " Translation (editing) ")
    } else {
        (
            app.session.destination.clone(),
            theme.border_style(),
            " Translation ",
        )
    };

    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(theme.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}
