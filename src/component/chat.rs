use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::{
    text::{Line, Text},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

use super::sidebar::{self, set_focus, single_line, text_of, Sidebar};
use super::{ctrl, Context, Status};
use crate::llm::conversation::Conversation;
use crate::llm::resolve_api_key;
use crate::llm::worker::{Job, Outcome};
use crate::sys::{Exchange, Speaker, Transcript};

pub struct MessagesComponent {
    scroll: u16,
    lock_on_bottom: bool,
}

impl MessagesComponent {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            lock_on_bottom: true,
        }
    }

    fn push_wrapped(text: &mut Text<'static>, message: &str, max_len: usize, style: Style) {
        let mut s = String::with_capacity(max_len);
        let mut len = 0;
        for c in message.chars() {
            if c == '\n' {
                text.extend([Line::styled(std::mem::take(&mut s), style)]);
                len = 0;
                continue;
            }
            s.push(c);
            len += if c.is_ascii() { 1 } else { 2 };
            if len >= max_len {
                text.extend([Line::styled(std::mem::take(&mut s), style)]);
                len = 0;
            }
        }
        text.extend([Line::styled(s, style)]);
    }

    pub fn render(
        &mut self,
        exchanges: &[Exchange],
        pending: Option<&str>,
        frame: &mut Frame,
        area: Rect,
    ) {
        let max_len = (area.width.max(3) - 2) as usize;
        let mut text = Text::default();
        let mut push = |speaker: Speaker, message: &str| {
            let style = match speaker {
                Speaker::User => Style::new().fg(Color::Yellow),
                Speaker::Bot => Style::new().fg(Color::Cyan),
            };
            let label = format!("{}:", speaker.as_ref().to_uppercase());
            text.extend([Line::styled(label, style.add_modifier(Modifier::BOLD))]);
            Self::push_wrapped(&mut text, message, max_len, style);
        };
        for exchange in exchanges {
            push(Speaker::User, &exchange.user);
            push(Speaker::Bot, &exchange.bot);
        }
        if let Some(utterance) = pending {
            push(Speaker::User, utterance);
            push(Speaker::Bot, "Thinking...");
        }

        let line_n = text.lines.len();
        let max_line = area.height.saturating_sub(2) as usize;
        if line_n > max_line {
            let max_scroll = (line_n - max_line) as u16;
            if self.scroll >= max_scroll {
                self.lock_on_bottom = true;
            }
            if self.lock_on_bottom {
                self.scroll = max_scroll;
            }
        } else {
            self.scroll = 0;
        }

        let paragraph = Paragraph::new(text)
            .block(Block::bordered().title("Chat Bot with Memory").gray())
            .scroll((self.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(3),
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(3);
                self.lock_on_bottom = false;
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                self.lock_on_bottom = false;
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    ApiKey,
    Model,
}

pub struct ChatComponent {
    pub messages: MessagesComponent,
    pub sidebar: Sidebar,
    input: TextArea<'static>,
    focus: Focus,
    show_history: bool,
    pending: Option<String>,
    status: Status,
}

impl ChatComponent {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            messages: MessagesComponent::new(),
            sidebar: Sidebar::new(models),
            input: Self::new_textarea(),
            focus: Focus::Input,
            show_history: false,
            pending: None,
            status: Status::Empty,
        }
    }

    fn new_textarea() -> TextArea<'static> {
        let mut textarea = single_line("You", false);
        textarea.set_placeholder_text("Your AI assistant here! Ask me anything....");
        textarea
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn clear_status(&mut self) {
        self.status = Status::Empty;
    }

    fn reset_input(&mut self) {
        self.input = Self::new_textarea();
        self.pending = None;
    }

    fn submit_message(&mut self, ctx: &mut Context) {
        let message = text_of(&self.input).trim().to_string();
        if message.is_empty() {
            return;
        }
        if ctx.worker.is_pending() {
            self.status = Status::info("Still waiting for the previous reply");
            return;
        }

        let api_key = match resolve_api_key(&self.sidebar.api_key(), ctx.env_api_key.as_deref()) {
            Ok(key) => key,
            Err(err) => {
                self.status = Status::error(&err);
                return;
            }
        };

        let model = ctx.backend.open(&api_key, self.sidebar.model());
        let conversation = match Conversation::new(
            model,
            ctx.settings.temperature,
            ctx.settings.chat.entity_memory,
        ) {
            Ok(conversation) => conversation,
            Err(err) => {
                self.status = Status::error(&err);
                return;
            }
        };

        log::debug!("asking {} with {} chars", self.sidebar.model(), message.len());
        let job = Job::Reply {
            conversation,
            memory: ctx.session.memory.clone(),
            utterance: message.clone(),
        };
        if ctx.worker.submit(job) {
            ctx.session.input = message.clone();
            self.pending = Some(message);
            self.input = Self::new_textarea();
            self.messages.lock_on_bottom = true;
            self.status = Status::Empty;
        }
    }

    fn new_chat(&mut self, ctx: &mut Context) {
        if ctx.worker.is_pending() {
            self.status = Status::info("Wait for the current reply first");
            return;
        }
        match ctx.session.reset(ctx.store.as_ref()) {
            Ok(()) => {
                self.reset_input();
                self.status = Status::info("New chat started");
            }
            Err(err) => self.status = Status::error(&err),
        }
    }

    fn clear_all(&mut self, ctx: &mut Context) {
        if ctx.worker.is_pending() {
            self.status = Status::info("Wait for the current reply first");
            return;
        }
        match ctx.session.clear_all(ctx.store.as_ref()) {
            Ok(()) => self.status = Status::info("Cleared all saved conversations"),
            Err(err) => self.status = Status::error(&err),
        }
    }

    pub fn on_outcome(&mut self, ctx: &mut Context, outcome: Outcome) {
        let Outcome::Reply {
            utterance,
            memory,
            result,
        } = outcome
        else {
            return;
        };
        self.pending = None;
        match result {
            Ok(reply) => {
                ctx.session.memory = memory;
                ctx.session.record_turn(utterance, reply);
            }
            Err(err) => {
                self.status = Status::error(&err);
                if text_of(&self.input).is_empty() {
                    self.input.insert_str(&utterance);
                }
            }
        }
    }

    pub fn handle_key(&mut self, ctx: &mut Context, key: KeyEvent) {
        match key.code {
            _ if ctrl(&key, 'n') => self.new_chat(ctx),
            _ if ctrl(&key, 'd') => self.clear_all(ctx),
            _ if ctrl(&key, 'e') => self.show_history = !self.show_history,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Input => Focus::ApiKey,
                    Focus::ApiKey => Focus::Model,
                    Focus::Model => Focus::Input,
                }
            }
            KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Model,
                    Focus::ApiKey => Focus::Input,
                    Focus::Model => Focus::ApiKey,
                }
            }
            KeyCode::PageUp | KeyCode::PageDown => self.messages.handle_key(key),
            KeyCode::Enter if self.focus == Focus::Input => self.submit_message(ctx),
            KeyCode::Enter => self.focus = Focus::Input,
            _ => match self.focus {
                Focus::Input => {
                    self.input.input(key);
                }
                Focus::ApiKey => self.sidebar.handle_key(sidebar::Field::ApiKey, key),
                Focus::Model => self.sidebar.handle_key(sidebar::Field::Model, key),
            },
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        self.messages.handle_mouse(event);
    }

    fn render_archive(&self, ctx: &Context, frame: &mut Frame, area: Rect) {
        let archive = ctx.session.archive();
        let mut text = Text::default();
        if archive.is_empty() {
            text.extend([Line::raw("No saved conversations").italic()]);
        }
        for (i, transcript) in archive.iter().enumerate() {
            text.extend([Line::from(format!("Conversation-Session:{i}")).bold()]);
            if self.show_history {
                Self::push_transcript(&mut text, transcript);
            }
        }
        let title = if self.show_history { "History [-]" } else { "History [+]" };
        let paragraph = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(title));
        frame.render_widget(paragraph, area);
    }

    fn push_transcript(text: &mut Text<'_>, transcript: &Transcript) {
        for line in transcript.lines() {
            let style = match line.speaker {
                Speaker::User => Style::new().fg(Color::Yellow),
                Speaker::Bot => Style::new().fg(Color::Cyan),
            };
            text.extend([Line::styled(format!("  {line}"), style)]);
        }
    }

    pub fn render(&mut self, ctx: &Context, frame: &mut Frame, area: Rect) {
        let [side_area, main_area] =
            Layout::horizontal([Constraint::Length(36), Constraint::Min(20)]).areas(area);

        let sidebar_focus = match self.focus {
            Focus::Input => None,
            Focus::ApiKey => Some(sidebar::Field::ApiKey),
            Focus::Model => Some(sidebar::Field::Model),
        };
        let has_key = resolve_api_key(&self.sidebar.api_key(), ctx.env_api_key.as_deref()).is_ok();
        let rest = self.sidebar.render(frame, side_area, sidebar_focus, has_key);

        let [actions_area, archive_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(rest);
        let actions = Paragraph::new(Line::from(vec![
            "[New Chat ^N]".bold(),
            " ".into(),
            "[Clear-all ^D]".into(),
        ]))
        .block(Block::bordered());
        frame.render_widget(actions, actions_area);
        self.render_archive(ctx, frame, archive_area);

        let [messages_area, input_area, status_area] = Layout::vertical([
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(main_area);

        self.messages
            .render(ctx.session.active(), self.pending.as_deref(), frame, messages_area);
        set_focus(&mut self.input, self.focus == Focus::Input);
        frame.render_widget(self.input.widget(), input_area);

        let status = if ctx.worker.is_pending() && self.status == Status::Empty {
            Line::raw("Thinking...").italic()
        } else {
            self.status.line()
        };
        frame.render_widget(Paragraph::new(status), status_area);
    }
}
