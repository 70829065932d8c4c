use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState};
use ratatui::Frame;

use transdoc_core::TaskStatus;

use crate::app::App;
use crate::theme::Theme;
use crate::view::{render_footer, spinner_char, truncate};

/// Render the task screen: progress gauge and block table.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    let chunks = Layout::vertical([
        Constraint::Length(1), // breadcrumb
        Constraint::Length(3), // progress bar
        Constraint::Min(5),    // block table
        Constraint::Length(1), // footer
    ])
    .split(area);

    render_breadcrumb(f, chunks[0], app);
    render_progress(f, chunks[1], app);
    render_block_table(f, chunks[2], app);
    render_footer(
        f,
        chunks[3],
        app,
        "j/k:nav  Enter:open  b:blocks  t:translate  x:export  ?:help  q:quit",
    );
}

fn render_breadcrumb(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans = vec![Span::styled(" TRANSDOC ", theme.header_style())];
    if let Some(document) = &app.document {
        spans.push(Span::styled(" > ", Style::default().fg(theme.dim)));
        spans.push(Span::styled(
            document.as_str(),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ));
    }
    let task = match &app.session.task_id {
        Some(id) => format!(" task {id}"),
        None => " no task".to_string(),
    };
    spans.push(Span::styled(task, Style::default().fg(theme.dim)));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_progress(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let progress = &app.session.progress;
    let running = progress.status == Some(TaskStatus::Running);

    let mut label = format!("{}%  {}", progress.percent(), progress.status_label());
    if running {
        label = format!("{} {label}", spinner_char(app.tick));
    }
    if app.session.blocks_loaded {
        label.push_str(&format!("  ·  {} blocks", app.session.completion));
    }
    if let Some(error) = &progress.error {
        label.push_str(&format!("  ·  {error}"));
    }

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style()),
        )
        .gauge_style(Style::default().fg(theme.task_status_color(progress.status.as_ref())))
        .ratio(progress.fraction)
        .label(label);

    f.render_widget(gauge, area);
}

fn render_block_table(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;

    if !app.session.blocks_loaded {
        let hint = if app.session.task_id.is_some() {
            "Press b to load blocks."
        } else {
            "Waiting for a task..."
        };
        let paragraph = Paragraph::new(hint)
            .style(Style::default().fg(theme.dim))
            .block(block_frame(theme));
        f.render_widget(paragraph, area);
        return;
    }

    let wide = area.width >= 100;
    let text_width = if wide {
        (area.width as usize).saturating_sub(30) / 2
    } else {
        (area.width as usize).saturating_sub(20)
    };

    let header_cells = if wide {
        vec!["#", "Source", "Translation", "Status"]
    } else {
        vec!["#", "Source", "Status"]
    };
    let header = Row::new(header_cells.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let rows: Vec<Row> = app
        .session
        .blocks
        .iter()
        .map(|b| {
            let status_style = Style::default().fg(theme.block_status_color(&b.status));
            let mut cells = vec![
                Cell::from(b.order_no.to_string()).style(Style::default().fg(theme.dim)),
                Cell::from(truncate(&b.source_text, text_width))
                    .style(Style::default().fg(theme.text)),
            ];
            if wide {
                cells.push(
                    Cell::from(truncate(b.translated(), text_width))
                        .style(Style::default().fg(theme.text)),
                );
            }
            cells.push(Cell::from(b.status.label().to_string()).style(status_style));
            Row::new(cells)
        })
        .collect();

    let widths = if wide {
        vec![
            Constraint::Length(6),
            Constraint::Percentage(45),
            Constraint::Percentage(45),
            Constraint::Length(11),
        ]
    } else {
        vec![
            Constraint::Length(6),
            Constraint::Min(15),
            Constraint::Length(11),
        ]
    };

    let table = Table::new(rows, &widths)
        .header(header)
        .block(block_frame(theme))
        .row_highlight_style(theme.highlight_style());

    let mut state = TableState::default();
    state.select(Some(app.cursor));
    f.render_stateful_widget(table, area, &mut state);
}

fn block_frame(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(" Blocks ")
}
