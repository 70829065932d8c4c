use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::App;

pub mod block;
pub mod help;
pub mod task;

/// Spinner frames for animated progress indication.
const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Get the current spinner character based on a tick counter.
pub fn spinner_char(tick: usize) -> char {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Truncate a string to at most `max_chars` characters, appending "…" if truncated.
///
/// Line breaks are flattened so a block renders on a single table row.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let flat: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut truncated: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Footer row: the status message when there is one, otherwise the key hints.
pub fn render_footer(f: &mut Frame, area: Rect, app: &App, hints: &str) {
    let theme = &app.theme;
    let mut spans = Vec::new();
    if app.busy > 0 {
        spans.push(Span::styled(
            format!(" {} ", spinner_char(app.tick)),
            ratatui::style::Style::default().fg(theme.spinner),
        ));
    }
    match &app.status {
        Some(status) => spans.push(Span::styled(
            format!(" {} ", status.text),
            theme.status_line_style(status.kind),
        )),
        None => spans.push(Span::styled(format!(" {hints}"), theme.footer_style())),
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("季度报告摘要", 4), "季度报…");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a\nb", 10), "a b");
        assert_eq!(truncate("anything", 0), "");
    }
}
