use std::{sync::Arc, time::Duration};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Paragraph, Tabs},
    Frame, Terminal,
};

use crate::config::Settings;
use crate::error::Error;
use crate::llm::worker::{Outcome, Worker};
use crate::llm::ModelBackend;
use crate::sys::session::SessionState;
use crate::sys::store::CredentialStore;

pub mod caption;
pub mod chat;
pub mod login;
pub mod sidebar;
pub mod welcome;

/// Everything a screen handler may read or change for the current session.
pub struct Context {
    pub settings: Settings,
    pub store: Option<CredentialStore>,
    pub session: SessionState,
    pub backend: Arc<dyn ModelBackend>,
    pub worker: Worker,
    pub env_api_key: Option<String>,
}

impl Context {
    pub fn new(
        settings: Settings,
        store: Option<CredentialStore>,
        backend: Arc<dyn ModelBackend>,
    ) -> Self {
        let env_api_key = settings.env_api_key();
        let session = SessionState::new(settings.chat.memory_window);
        Self {
            settings,
            store,
            session,
            backend,
            worker: Worker::spawn(),
            env_api_key,
        }
    }

    /// Login is required whenever accounts are backed by a store.
    pub fn needs_login(&self) -> bool {
        self.store.is_some() && !self.session.is_authenticated()
    }
}

#[derive(Debug)]
pub enum Input {
    Event(Event),
    Outcome(Outcome),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Output {
    Exit,
    Normal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Empty,
    Info(String),
    Error(String),
}

impl Status {
    fn stamp(message: &str) -> String {
        format!("[{}] {message}", chrono::Local::now().format("%H:%M:%S"))
    }

    pub fn info(message: impl AsRef<str>) -> Self {
        Status::Info(Self::stamp(message.as_ref()))
    }

    /// Errors are shown inline; model-side ones are also logged.
    pub fn error(err: &Error) -> Self {
        if err.is_model_side() {
            log::warn!("{err}");
        }
        Status::Error(Self::stamp(&err.to_string()))
    }

    #[cfg(test)]
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error(_))
    }

    pub fn line(&self) -> Line<'_> {
        match self {
            Status::Empty => Line::raw(""),
            Status::Info(m) => Line::styled(m.as_str(), Style::new().fg(Color::Green)),
            Status::Error(m) => Line::styled(m.as_str(), Style::new().fg(Color::Red)),
        }
    }
}

pub(crate) fn ctrl(key: &crossterm::event::KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Welcome,
    Chatbot,
    ImageCaptioning,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Welcome, Page::Chatbot, Page::ImageCaptioning];

    pub fn label(self) -> &'static str {
        match self {
            Page::Welcome => "Welcome",
            Page::Chatbot => "Chatbot",
            Page::ImageCaptioning => "Image Captioning",
        }
    }

    /// `F1`..`F3` select pages in tab order.
    fn from_function_key(n: u8) -> Option<Page> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }
}

pub struct App {
    pub ctx: Context,
    pub page: Page,
    pub login: login::LoginComponent,
    pub chat: chat::ChatComponent,
    pub caption: caption::CaptionComponent,
    exit_n: u8,
}

impl App {
    pub fn new(ctx: Context) -> Self {
        let chat = chat::ChatComponent::new(ctx.settings.chat.models.clone());
        let caption = caption::CaptionComponent::new(ctx.settings.vision.models.clone());
        Self {
            ctx,
            page: Page::Welcome,
            login: login::LoginComponent::new(),
            chat,
            caption,
            exit_n: 0,
        }
    }

    fn help(&self) -> &'static str {
        if self.ctx.needs_login() {
            return "help: [Tab field] [Ctrl+T login/register] [Enter submit] [Esc+Esc quit]";
        }
        match self.page {
            Page::Welcome => "help: [F1-F3 page] [Ctrl+L logout] [Esc+Esc quit]",
            Page::Chatbot => concat!(
                "help: [Enter send] [Tab focus] [Ctrl+N new chat] [Ctrl+E history] ",
                "[Ctrl+D clear-all] [F1-F3 page] [Esc+Esc quit]"
            ),
            Page::ImageCaptioning => {
                "help: [Enter load image] [Ctrl+G caption] [Tab focus] [F1-F3 page] [Esc+Esc quit]"
            }
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ]);

        let [tabs_area, main_area, help_area] = vertical.areas(f.size());

        if self.ctx.needs_login() {
            let title = Paragraph::new("Login to Chatbot").block(Block::bordered());
            f.render_widget(title, tabs_area);
            self.login.render(f, main_area);
        } else {
            let mut title = String::from("GenAI Project");
            if let Some(user) = self.ctx.session.current_user() {
                title = format!("{title} - {user}");
            }
            let tabs = Tabs::new(Page::ALL.iter().map(|p| p.label()).collect::<Vec<_>>())
                .select(self.page.index())
                .padding("[", "]")
                .block(Block::bordered().title(title));
            f.render_widget(tabs, tabs_area);

            match self.page {
                Page::Welcome => welcome::render(f, main_area),
                Page::Chatbot => self.chat.render(&self.ctx, f, main_area),
                Page::ImageCaptioning => self.caption.render(&self.ctx, f, main_area),
            }
        }

        f.render_widget(Paragraph::new(self.help()), help_area);
    }

    pub fn handle(&mut self, input: Input) -> Output {
        let is_event = matches!(&input, Input::Event(..));

        match input {
            Input::Outcome(outcome) => match outcome {
                outcome @ Outcome::Reply { .. } => self.chat.on_outcome(&mut self.ctx, outcome),
                outcome => self.caption.on_outcome(outcome),
            },
            Input::Event(Event::Key(key)) if key.kind != KeyEventKind::Press => {}
            Input::Event(Event::Key(key)) if key.code == KeyCode::Esc => {
                self.exit_n += 2;
                if self.exit_n >= 3 {
                    return Output::Exit;
                }
            }
            Input::Event(Event::Key(key)) if ctrl(&key, 'c') => return Output::Exit,
            Input::Event(Event::Key(key)) if self.ctx.needs_login() => {
                self.login.handle_key(&mut self.ctx, key);
                if self.ctx.session.is_authenticated() {
                    self.page = Page::Chatbot;
                    self.chat.clear_status();
                }
            }
            Input::Event(Event::Key(key)) => {
                let page = match key.code {
                    KeyCode::F(n) => Page::from_function_key(n),
                    _ => None,
                };
                if let Some(page) = page {
                    self.page = page;
                } else if ctrl(&key, 'l') && self.ctx.store.is_some() {
                    self.logout();
                } else {
                    match self.page {
                        Page::Welcome => {}
                        Page::Chatbot => self.chat.handle_key(&mut self.ctx, key),
                        Page::ImageCaptioning => self.caption.handle_key(&mut self.ctx, key),
                    }
                }
            }
            Input::Event(Event::Mouse(event)) if self.page == Page::Chatbot => {
                if !self.ctx.needs_login() {
                    self.chat.handle_mouse(event);
                }
            }
            Input::Event(_) => {}
        }

        if is_event {
            self.exit_n = self.exit_n.max(1) - 1;
        }
        Output::Normal
    }

    fn logout(&mut self) {
        if self.ctx.worker.is_pending() {
            self.chat.set_status(Status::info("Wait for the current reply first"));
            return;
        }
        match self.ctx.session.logout(self.ctx.store.as_ref()) {
            Ok(()) => {
                // nothing typed or loaded by the previous user survives
                self.chat = chat::ChatComponent::new(self.ctx.settings.chat.models.clone());
                self.caption =
                    caption::CaptionComponent::new(self.ctx.settings.vision.models.clone());
                self.page = Page::Welcome;
                self.login.set_status(Status::info("Logged out"));
            }
            Err(err) => self.chat.set_status(Status::error(&err)),
        }
    }

    pub fn run_loop(mut self) -> anyhow::Result<()> {
        // setup terminal
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let mut main_loop = || -> anyhow::Result<()> {
            loop {
                terminal.draw(|f| self.render(f))?;

                if let Some(outcome) = self.ctx.worker.try_recv() {
                    self.handle(Input::Outcome(outcome));
                    continue;
                }

                if !event::poll(Duration::from_millis(100))? {
                    continue;
                }
                if self.handle(Input::Event(event::read()?)) == Output::Exit {
                    break;
                }
            }
            Ok(())
        };

        let r = main_loop();

        // restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        r
    }
}
