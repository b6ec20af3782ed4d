use crate::controller::{ChatController, ExchangeResult, PendingExchange, Settlement, SubmitRejection, Ticket};
use crate::events::Preferences;
use crate::prompts::{suggestion, COMPOSER_PLACEHOLDER, SUGGESTIONS};
use crate::ui::conversation::commands::{get_help_text, ParsedCommand, PreferenceChange, SlashCommand};
use crate::ui::conversation::composer::{ComposerResult, ConversationComposer};
use crate::ui::conversation::history::{max_scroll, ConversationHistory};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Widget},
};
use std::time::Instant;

/// Actions the app loop has to carry out on behalf of the manager
#[derive(Debug)]
pub enum ConversationAction {
    None,
    /// Send this exchange to the recipe service
    Send(PendingExchange),
    Exit,
}

/// Ties the controller to the composer, the transcript view and the
/// preference selectors.
pub struct ConversationManager {
    controller: ChatController,
    composer: ConversationComposer,
    preferences: Preferences,
    scroll: usize,
    tick: u64,
    next_suggestion: usize,
    help_visible: bool,
}

impl ConversationManager {
    pub fn new(controller: ChatController, preferences: Preferences) -> Self {
        Self {
            controller,
            composer: ConversationComposer::new(COMPOSER_PLACEHOLDER),
            preferences,
            scroll: 0,
            tick: 0,
            next_suggestion: 0,
            help_visible: false,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return ConversationAction::Exit,
                KeyCode::Char('r') => {
                    self.reset();
                    return ConversationAction::None;
                }
                KeyCode::Char('d') => {
                    self.download();
                    return ConversationAction::None;
                }
                KeyCode::Char('n') => {
                    self.suggest(None);
                    return ConversationAction::None;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc if self.help_visible => {
                self.help_visible = false;
                return ConversationAction::None;
            }
            KeyCode::Esc if !self.composer.palette_open() => return ConversationAction::Exit,
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_add(5);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(5);
                return ConversationAction::None;
            }
            KeyCode::Up if !self.composer.palette_open() => {
                self.scroll = self.scroll.saturating_add(1);
                return ConversationAction::None;
            }
            KeyCode::Down if !self.composer.palette_open() => {
                self.scroll = self.scroll.saturating_sub(1);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(entry) => self.submit(&entry),
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Start an exchange for `entry`
    pub fn submit(&mut self, entry: &str) -> ConversationAction {
        match self.controller.begin_submit(entry, self.preferences) {
            Ok(pending) => {
                self.help_visible = false;
                self.scroll = 0;
                self.composer.set_enabled(false);
                ConversationAction::Send(pending)
            }
            Err(SubmitRejection::EmptyEntry) => ConversationAction::None,
            Err(SubmitRejection::Busy) => {
                self.composer.set_text(entry);
                ConversationAction::None
            }
        }
    }

    /// Apply the result of an exchange
    pub fn settle(&mut self, ticket: Ticket, result: ExchangeResult) {
        match self.controller.settle(ticket, result) {
            Settlement::Replied => self.scroll = 0,
            Settlement::RolledBack { entry, .. } => {
                if self.composer.get_content().is_empty() {
                    self.composer.set_text(&entry);
                }
            }
            Settlement::Stale => {}
        }
        self.sync_input();
    }

    /// Periodic housekeeping: animation frame and notice expiry
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.controller.expire_notice(Instant::now());
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    fn reset(&mut self) {
        self.controller.reset();
        self.composer.clear();
        self.scroll = 0;
        self.help_visible = false;
        self.sync_input();
    }

    fn download(&mut self) {
        match self.controller.download() {
            Ok(Some(path)) => self
                .controller
                .show_notice(format!("Recipe saved to {}", path.display())),
            Ok(None) => self.controller.show_notice("No recipe to download yet."),
            Err(err) => {
                tracing::error!(error = %err, "download failed");
                self.controller
                    .show_notice(format!("Could not save the recipe: {}", err));
            }
        }
    }

    fn suggest(&mut self, index: Option<usize>) {
        if !self.controller.is_input_enabled() {
            return;
        }
        let index = index.unwrap_or(self.next_suggestion);
        self.composer.set_text(suggestion(index));
        self.next_suggestion = (index + 1) % SUGGESTIONS.len();
    }

    fn sync_input(&mut self) {
        self.composer.set_enabled(self.controller.is_input_enabled());
        if self.controller.take_focus_request() {
            self.composer.set_focus(true);
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        // Commands share the disabled input surface; Ctrl shortcuts stay live.
        if !self.controller.is_input_enabled() {
            return ConversationAction::None;
        }

        match command.command {
            SlashCommand::Meal | SlashCommand::Diet | SlashCommand::Skill => {
                match command.preference_change() {
                    Ok(change) => {
                        self.apply_preference(change);
                        self.controller
                            .show_notice(format!("Preferences updated: {}", self.preferences.summary()));
                    }
                    Err(message) => self.controller.show_notice(message),
                }
            }
            SlashCommand::Suggest => self.suggest(command.suggestion_index()),
            SlashCommand::Reset => self.reset(),
            SlashCommand::Download => self.download(),
            SlashCommand::Help => self.help_visible = !self.help_visible,
            SlashCommand::Quit => return ConversationAction::Exit,
        }
        ConversationAction::None
    }

    fn apply_preference(&mut self, change: PreferenceChange) {
        match change {
            PreferenceChange::Meal(meal) => self.preferences.meal_type = meal,
            PreferenceChange::Diet(diet) => self.preferences.dietary_preference = diet,
            PreferenceChange::Skill(skill) => self.preferences.skill_level = skill,
        }
        tracing::info!(preferences = %self.preferences.summary(), "preferences changed");
    }

    /// Render the conversation UI components
    pub fn render_conversation_ui(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // Transcript
                Constraint::Length(1), // Notice
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        let history = ConversationHistory::new(self.controller.transcript(), self.scroll, self.tick);
        let inner_height = chunks[0].height.saturating_sub(2) as usize;
        let total = history.lines(chunks[0].width.saturating_sub(2)).len();
        let scroll = self.scroll.min(max_scroll(total, inner_height));
        ConversationHistory::new(self.controller.transcript(), scroll, self.tick).render(chunks[0], buf);

        if let Some(notice) = self.controller.notice() {
            let line = Line::from(vec![
                Span::styled(" ⚠ ", Style::default().fg(Color::Black).bg(Color::Yellow)),
                Span::styled(format!(" {}", notice), Style::default().fg(Color::Yellow)),
            ]);
            buf.set_line(chunks[1].x, chunks[1].y, &line, chunks[1].width);
        }

        self.composer.clone().render(chunks[2], buf);
        self.render_status_bar(chunks[3], buf);

        if self.help_visible {
            self.render_help(chunks[0], buf);
        }
    }

    fn render_status_bar(&self, area: Rect, buf: &mut Buffer) {
        let download = if self.controller.can_download() {
            Span::styled("Ctrl+D download ✓", Style::default().fg(Color::Green))
        } else {
            Span::styled("Ctrl+D download –", Style::default().fg(Color::DarkGray))
        };
        let line = Line::from(vec![
            Span::styled(self.preferences.summary(), Style::default().fg(Color::Cyan)),
            Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
            download,
            Span::styled(
                " │ Ctrl+R reset · Ctrl+N idea · /help · Esc quit",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let help = get_help_text();
        let height = (help.lines().count() as u16 + 2).min(area.height);
        let width = area.width.saturating_sub(4);
        let popup = Rect {
            x: area.x + 2,
            y: area.y + area.height.saturating_sub(height),
            width,
            height,
        };

        let block = ratatui::widgets::Block::default()
            .borders(ratatui::widgets::Borders::ALL)
            .title("Help (Esc to close)")
            .style(Style::default().fg(Color::White));
        let inner = block.inner(popup);
        Clear.render(popup, buf);
        block.render(popup, buf);

        for (i, text) in help.lines().enumerate() {
            if i >= inner.height as usize {
                break;
            }
            let style = if text.starts_with('/') {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            buf.set_line(inner.x, inner.y + i as u16, &Line::from(Span::styled(text, style)), inner.width);
        }
    }
}
