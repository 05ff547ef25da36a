use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    widgets::{Block, Paragraph, Tabs},
    Frame,
};
use tui_textarea::TextArea;

use super::sidebar::{set_focus, single_line, text_of};
use super::{ctrl, Context, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Login,
    Register,
}

pub struct LoginComponent {
    tab: Tab,
    username: TextArea<'static>,
    password: TextArea<'static>,
    on_password: bool,
    status: Status,
}

impl LoginComponent {
    pub fn new() -> Self {
        Self {
            tab: Tab::Login,
            username: single_line("Username", false),
            password: single_line("Password", true),
            on_password: false,
            status: Status::Empty,
        }
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    fn clear_fields(&mut self) {
        self.username = single_line("Username", false);
        self.password = single_line("Password", true);
        self.on_password = false;
    }

    fn submit(&mut self, ctx: &mut Context) {
        let Some(store) = ctx.store.as_ref() else {
            return;
        };
        let username = text_of(&self.username);
        let password = text_of(&self.password);

        match self.tab {
            Tab::Login => match ctx.session.login(store, &username, &password) {
                Ok(()) => {
                    self.clear_fields();
                    self.status = Status::info("Login successful!");
                }
                Err(err) => self.status = Status::error(&err),
            },
            Tab::Register => match store.register(&username, &password) {
                Ok(()) => {
                    self.clear_fields();
                    self.tab = Tab::Login;
                    self.status = Status::info("User registered successfully! Please login.");
                }
                Err(err) => self.status = Status::error(&err),
            },
        }
    }

    pub fn handle_key(&mut self, ctx: &mut Context, key: KeyEvent) {
        match key.code {
            _ if ctrl(&key, 't') => {
                self.tab = match self.tab {
                    Tab::Login => Tab::Register,
                    Tab::Register => Tab::Login,
                };
                self.status = Status::Empty;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.on_password = !self.on_password;
            }
            KeyCode::Enter => self.submit(ctx),
            _ => {
                if self.on_password {
                    self.password.input(key);
                } else {
                    self.username.input(key);
                }
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [tabs_area, user_area, pass_area, status_area, _] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

        let selected = match self.tab {
            Tab::Login => 0,
            Tab::Register => 1,
        };
        let tabs = Tabs::new(vec!["Login", "Register"])
            .select(selected)
            .padding("[", "]")
            .block(Block::bordered());
        frame.render_widget(tabs, tabs_area);

        set_focus(&mut self.username, !self.on_password);
        set_focus(&mut self.password, self.on_password);
        frame.render_widget(self.username.widget(), user_area);
        frame.render_widget(self.password.widget(), pass_area);
        frame.render_widget(Paragraph::new(self.status.line()), status_area);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::component::tests::{ctrl_key, key, settings, type_text};
    use crate::component::App;
    use crate::llm::testing::ScriptedBackend;
    use crate::sys::store::CredentialStore;

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path().join("user_sessions.json")).unwrap();
        let ctx = Context::new(settings(), Some(store), Arc::new(ScriptedBackend::default()));
        (dir, App::new(ctx))
    }

    fn fill(app: &mut App, username: &str, password: &str) {
        type_text(app, username);
        app.handle(key(KeyCode::Tab));
        type_text(app, password);
        app.handle(key(KeyCode::Enter));
    }

    #[test]
    fn register_then_login() {
        let (_dir, mut app) = app();
        app.handle(ctrl_key('t'));
        assert_eq!(app.login.tab, Tab::Register);

        fill(&mut app, "alice", "pw");
        assert_eq!(app.login.tab, Tab::Login);
        assert!(!app.login.status.is_error());

        fill(&mut app, "alice", "pw");
        assert!(app.ctx.session.is_authenticated());
        assert_eq!(app.ctx.session.current_user(), Some("alice"));
        assert_eq!(app.page, crate::component::Page::Chatbot);
    }

    #[test]
    fn bad_login_is_reported_inline() {
        let (_dir, mut app) = app();
        fill(&mut app, "nobody", "pw");

        assert!(!app.ctx.session.is_authenticated());
        match &app.login.status {
            Status::Error(m) => assert!(m.ends_with("Invalid credentials!")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn duplicate_registration_is_reported_inline() {
        let (_dir, mut app) = app();
        app.ctx.store.as_ref().unwrap().register("alice", "pw").unwrap();
        app.handle(ctrl_key('t'));

        fill(&mut app, "alice", "other");

        assert_eq!(app.login.tab, Tab::Register);
        match &app.login.status {
            Status::Error(m) => assert!(m.ends_with("Username already exists!")),
            other => panic!("unexpected status {other:?}"),
        }
    }
}
