use ratatui::style::{Color, Modifier, Style};

use transdoc_core::{BlockStatus, TaskStatus};

use crate::model::status::StatusKind;

/// Color theme for the TUI.
pub struct Theme {
    pub translated: Color,
    pub edited: Color,
    pub pending: Color,
    pub failed: Color,

    pub header_fg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub text: Color,
    pub dim: Color,
    pub highlight_bg: Color,
    pub active: Color,
    pub spinner: Color,
    pub footer_fg: Color,
    pub footer_bg: Color,
}

impl Theme {
    /// Hacker-green terminal theme.
    pub fn hacker() -> Self {
        Self {
            translated: Color::Green,
            edited: Color::Yellow,
            pending: Color::DarkGray,
            failed: Color::Red,

            header_fg: Color::Black,
            header_bg: Color::Green,
            border: Color::DarkGray,
            text: Color::White,
            dim: Color::DarkGray,
            highlight_bg: Color::Rgb(30, 50, 30),
            active: Color::Cyan,
            spinner: Color::Cyan,
            footer_fg: Color::DarkGray,
            footer_bg: Color::Reset,
        }
    }

    pub fn block_status_color(&self, status: &BlockStatus) -> Color {
        match status {
            BlockStatus::Translated => self.translated,
            BlockStatus::Edited => self.edited,
            BlockStatus::Pending => self.pending,
            BlockStatus::Other(_) => self.dim,
        }
    }

    pub fn task_status_color(&self, status: Option<&TaskStatus>) -> Color {
        match status {
            Some(TaskStatus::Finished) => self.translated,
            Some(TaskStatus::Error) => self.failed,
            Some(TaskStatus::Running) => self.active,
            Some(TaskStatus::Created) | Some(TaskStatus::Other(_)) | None => self.dim,
        }
    }

    pub fn status_line_style(&self, kind: StatusKind) -> Style {
        match kind {
            StatusKind::Info => Style::default().fg(self.active),
            StatusKind::Error => Style::default().fg(self.failed).add_modifier(Modifier::BOLD),
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.header_fg).bg(self.header_bg).add_modifier(Modifier::BOLD)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().bg(self.highlight_bg).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.edited).add_modifier(Modifier::BOLD)
    }

    pub fn footer_style(&self) -> Style {
        Style::default().fg(self.footer_fg).bg(self.footer_bg)
    }
}
