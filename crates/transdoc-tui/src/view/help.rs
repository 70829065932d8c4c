use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::Screen;
use crate::theme::Theme;

type Keys = &'static [(&'static str, &'static str)];

const TASK_KEYS: Keys = &[
    ("j / k", "Move through blocks"),
    ("Ctrl+d / Ctrl+u", "Page down / up"),
    ("g / G", "First / last block"),
    ("Enter", "Open block"),
    ("b", "Load blocks and keep them in sync"),
    ("t", "Start translation"),
    ("x", "Export translated document"),
];

const BLOCK_KEYS: Keys = &[
    ("j / k", "Scroll"),
    ("e", "Edit the translation"),
    ("Ctrl+s", "Save the translation"),
    ("t / x", "Translate / export the task"),
    ("Esc", "Back to the block list"),
];

const EDIT_KEYS: Keys = &[
    ("Enter", "New line"),
    ("Backspace", "Delete last character"),
    ("Ctrl+s", "Save and leave edit mode"),
    ("Esc", "Discard the edit"),
];

const GLOBAL_KEYS: Keys = &[("?", "Toggle this help"), ("q / Ctrl+c", "Quit")];

/// Key groups that apply to `screen`, in display order.
fn sections(screen: &Screen) -> Vec<(&'static str, Keys)> {
    match screen {
        Screen::Task => vec![("Block list", TASK_KEYS), ("Global", GLOBAL_KEYS)],
        Screen::Block(_) => vec![
            ("Block", BLOCK_KEYS),
            ("Editing", EDIT_KEYS),
            ("Global", GLOBAL_KEYS),
        ],
    }
}

/// Rows needed for `sections`: one header per group, its keys, a gap between
/// groups, and the border.
fn popup_height(sections: &[(&str, Keys)]) -> u16 {
    let rows: usize = sections.iter().map(|(_, keys)| keys.len() + 2).sum();
    (rows + 1) as u16
}

/// Render the help overlay for the current screen as a centered popup.
pub fn render(f: &mut Frame, screen: &Screen, theme: &Theme) {
    let groups = sections(screen);
    let popup = centered_rect(60, popup_height(&groups), f.area());

    let mut lines = Vec::new();
    for (i, (title, keys)) in groups.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(section_header(title, theme));
        lines.extend(keys.iter().map(|(key, desc)| key_line(key, desc, theme)));
    }

    let title = match screen {
        Screen::Task => " Help: task ",
        Screen::Block(_) => " Help: block ",
    };
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.active))
                .title(Span::styled(title, theme.header_style())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn section_header<'a>(title: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(Span::styled(
        format!(" {title}"),
        Style::default()
            .fg(theme.active)
            .add_modifier(Modifier::BOLD),
    ))
}

fn key_line<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("   {key:<18}"), Style::default().fg(theme.text)),
        Span::styled(desc, Style::default().fg(theme.dim)),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .split(area);
    Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .split(vertical[0])[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use transdoc_core::BlockId;

    #[test]
    fn task_help_has_no_edit_keys() {
        let groups = sections(&Screen::Task);
        assert!(groups.iter().all(|(title, _)| *title != "Editing"));
        assert!(groups
            .iter()
            .flat_map(|(_, keys)| keys.iter())
            .any(|(key, _)| *key == "b"));
    }

    #[test]
    fn block_help_lists_edit_keys() {
        let groups = sections(&Screen::Block(BlockId::new("b7")));
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().any(|(title, _)| *title == "Editing"));
    }

    #[test]
    fn popup_fits_every_row() {
        let groups = sections(&Screen::Task);
        // 2 headers + 9 keys + 1 gap + 2 border rows
        assert_eq!(popup_height(&groups), 14);
    }
}
