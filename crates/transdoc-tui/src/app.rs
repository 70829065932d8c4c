use transdoc_core::{BlockId, SessionEvent, SessionView};

use crate::action::{Action, Command};
use crate::model::status::StatusLine;
use crate::theme::Theme;
use crate::tui_event::BackendEvent;

/// Which screen is currently displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Task,
    Block(BlockId),
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    /// Latest session snapshot; replaced wholesale on every sync.
    pub session: SessionView,
    /// Name of the uploaded document, when the task was created from this run.
    pub document: Option<String>,
    pub cursor: usize,
    pub tick: usize,
    pub theme: Theme,
    pub should_quit: bool,
    pub show_help: bool,
    pub detail_scroll: u16,
    /// Height of the visible table area (set on resize, used for page up/down).
    pub visible_rows: usize,
    /// The destination pane has keyboard focus.
    pub editing: bool,
    pub draft: String,
    pub status: Option<StatusLine>,
    /// Backend commands still in flight.
    pub busy: usize,
}

impl App {
    pub fn new(document: Option<String>) -> Self {
        Self {
            screen: Screen::Task,
            session: SessionView::default(),
            document,
            cursor: 0,
            tick: 0,
            theme: Theme::hacker(),
            should_quit: false,
            show_help: false,
            detail_scroll: 0,
            visible_rows: 20,
            editing: false,
            draft: String::new(),
            status: None,
            busy: 0,
        }
    }

    /// Process a user action and update state. Returns the session work it implies.
    pub fn update(&mut self, action: Action) -> Option<Command> {
        // When help overlay is shown, only allow a few actions through
        if self.show_help {
            match action {
                Action::Quit => self.should_quit = true,
                Action::ToggleHelp | Action::NavigateBack => self.show_help = false,
                Action::Tick => self.on_tick(),
                Action::Resize(_w, h) => self.visible_rows = (h as usize).saturating_sub(8),
                _ => {}
            }
            return None;
        }

        if self.editing {
            if let Some(command) = self.update_editing(&action) {
                return command;
            }
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                None
            }
            Action::ToggleHelp => {
                self.show_help = true;
                None
            }
            Action::NavigateBack => {
                self.screen = Screen::Task;
                None
            }
            Action::DrillIn => match &self.screen {
                Screen::Task => {
                    let block = self.session.blocks.get(self.cursor)?;
                    let id = block.id.clone();
                    self.detail_scroll = 0;
                    self.screen = Screen::Block(id.clone());
                    Some(Command::Select(id))
                }
                Screen::Block(_) => None,
            },
            Action::MoveDown => {
                match &self.screen {
                    Screen::Task => {
                        if self.cursor + 1 < self.session.blocks.len() {
                            self.cursor += 1;
                        }
                    }
                    Screen::Block(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_add(1);
                    }
                }
                None
            }
            Action::MoveUp => {
                match &self.screen {
                    Screen::Task => self.cursor = self.cursor.saturating_sub(1),
                    Screen::Block(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_sub(1);
                    }
                }
                None
            }
            Action::PageDown => {
                let page = self.visible_rows.max(1);
                match &self.screen {
                    Screen::Task => {
                        self.cursor =
                            (self.cursor + page).min(self.session.blocks.len().saturating_sub(1));
                    }
                    Screen::Block(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_add(page as u16);
                    }
                }
                None
            }
            Action::PageUp => {
                let page = self.visible_rows.max(1);
                match &self.screen {
                    Screen::Task => self.cursor = self.cursor.saturating_sub(page),
                    Screen::Block(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_sub(page as u16);
                    }
                }
                None
            }
            Action::GoTop => {
                match &self.screen {
                    Screen::Task => self.cursor = 0,
                    Screen::Block(_) => self.detail_scroll = 0,
                }
                None
            }
            Action::GoBottom => {
                match &self.screen {
                    Screen::Task => self.cursor = self.session.blocks.len().saturating_sub(1),
                    Screen::Block(_) => self.detail_scroll = u16::MAX,
                }
                None
            }
            Action::LoadBlocks => Some(Command::LoadBlocks),
            Action::Translate => Some(Command::Translate),
            Action::Export => Some(Command::Export),
            Action::Save => Some(Command::Save),
            Action::Edit => match &self.screen {
                Screen::Block(_) => {
                    self.editing = true;
                    self.draft = self.session.destination.clone();
                    Some(Command::BeginEdit)
                }
                Screen::Task => {
                    self.set_error("open a block with Enter before editing");
                    None
                }
            },
            Action::Tick => {
                self.on_tick();
                None
            }
            Action::Resize(_w, h) => {
                // Rough estimate: total height minus header, gauge, footer and borders
                self.visible_rows = (h as usize).saturating_sub(8);
                None
            }
            Action::InsertChar(_) | Action::Newline | Action::Backspace | Action::None => None,
        }
    }

    /// Edit-mode handling. `None` falls through to the regular key handling.
    fn update_editing(&mut self, action: &Action) -> Option<Option<Command>> {
        let command = match action {
            Action::InsertChar(c) => {
                self.draft.push(*c);
                Command::SetDestination(self.draft.clone())
            }
            Action::Newline => {
                self.draft.push('\n');
                Command::SetDestination(self.draft.clone())
            }
            Action::Backspace => {
                self.draft.pop();
                Command::SetDestination(self.draft.clone())
            }
            Action::Save => {
                self.editing = false;
                Command::Save
            }
            Action::NavigateBack => {
                self.editing = false;
                self.draft.clear();
                self.set_info("edit discarded");
                Command::DiscardEdit
            }
            _ => return None,
        };
        Some(Some(command))
    }

    fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if self.status.as_ref().is_some_and(|s| s.is_expired(self.tick)) {
            self.status = None;
        }
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine::info(text, self.tick));
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine::error(text, self.tick));
    }

    pub fn command_started(&mut self) {
        self.busy += 1;
    }

    /// Replace the rendered snapshot, keeping cursor and screen consistent with it.
    pub fn sync(&mut self, view: SessionView) {
        if view.task_id != self.session.task_id {
            self.cursor = 0;
            self.detail_scroll = 0;
        }
        self.session = view;
        self.cursor = self
            .cursor
            .min(self.session.blocks.len().saturating_sub(1));

        if let Screen::Block(id) = &self.screen {
            if self.session.selected.as_ref() != Some(id) {
                self.screen = Screen::Task;
                self.editing = false;
            }
        }
        if !self.session.dirty {
            self.editing = false;
        }
    }

    /// Process a backend event and update the status line.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::CommandDone { message } => {
                self.busy = self.busy.saturating_sub(1);
                if !message.is_empty() {
                    self.set_info(message);
                }
            }
            BackendEvent::CommandFailed { message } => {
                self.busy = self.busy.saturating_sub(1);
                self.set_error(message);
            }
            BackendEvent::Session(event) => self.handle_session_event(event),
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Finished { task_id } => {
                self.set_info(format!("task {task_id} finished"));
            }
            SessionEvent::Failed { message, .. } => {
                self.set_error(format!("translation failed: {message}"));
            }
            SessionEvent::TaskCreated { .. }
            | SessionEvent::TaskAttached { .. }
            | SessionEvent::Progress(_)
            | SessionEvent::BlocksRefreshed { .. }
            | SessionEvent::SelectionRefreshed { .. }
            | SessionEvent::PollingStarted
            | SessionEvent::PollingStopped => {}
        }
    }

    /// Render the current screen.
    pub fn view(&self, f: &mut ratatui::Frame) {
        match &self.screen {
            Screen::Task => crate::view::task::render(f, self),
            Screen::Block(id) => crate::view::block::render(f, self, id),
        }

        if self.show_help {
            crate::view::help::render(f, &self.screen, &self.theme);
        }
    }
}
