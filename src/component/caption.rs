use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Text},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

use super::sidebar::{self, set_focus, single_line, text_of, Sidebar};
use super::{ctrl, Context, Status};
use crate::llm::resolve_api_key;
use crate::llm::vision::{ImageSource, LoadedImage};
use crate::llm::worker::{Job, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Image,
    ApiKey,
    Model,
}

pub struct CaptionComponent {
    pub sidebar: Sidebar,
    image_field: TextArea<'static>,
    focus: Focus,
    image: Option<LoadedImage>,
    caption: Option<String>,
    status: Status,
}

impl CaptionComponent {
    pub fn new(models: Vec<String>) -> Self {
        let mut image_field = single_line("Image URL or path", false);
        image_field.set_placeholder_text("https://... or ./picture.jpg");
        Self {
            sidebar: Sidebar::new(models),
            image_field,
            focus: Focus::Image,
            image: None,
            caption: None,
            status: Status::Empty,
        }
    }

    fn load_image(&mut self, ctx: &mut Context) {
        let Some(source) = ImageSource::parse(&text_of(&self.image_field)) else {
            return;
        };
        if ctx.worker.submit(Job::LoadImage(source)) {
            self.status = Status::info("Fetching image...");
        } else {
            self.status = Status::info("Wait for the current request first");
        }
    }

    fn generate_caption(&mut self, ctx: &mut Context) {
        let Some(image) = self.image.clone() else {
            self.status = Status::info("Load an image first");
            return;
        };
        let api_key = match resolve_api_key(&self.sidebar.api_key(), ctx.env_api_key.as_deref()) {
            Ok(key) => key,
            Err(err) => {
                self.status = Status::error(&err);
                return;
            }
        };
        let job = Job::Caption {
            model: ctx.backend.open(&api_key, self.sidebar.model()),
            image,
            prompt: ctx.settings.vision.caption_prompt.clone(),
            temperature: ctx.settings.temperature,
        };
        if ctx.worker.submit(job) {
            self.caption = None;
            self.status = Status::info("Generating caption...");
        } else {
            self.status = Status::info("Wait for the current request first");
        }
    }

    pub fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Image(Ok(image)) => {
                self.status = Status::info(format!(
                    "Fetched {} ({} KB)",
                    image.image.mime_type,
                    image.image.bytes.len().div_ceil(1024)
                ));
                self.caption = None;
                self.image = Some(image);
            }
            Outcome::Caption(Ok(caption)) => {
                self.status = Status::Empty;
                self.caption = Some(caption);
            }
            Outcome::Image(Err(err)) | Outcome::Caption(Err(err)) => {
                self.status = Status::error(&err);
            }
            Outcome::Reply { .. } => {}
        }
    }

    pub fn handle_key(&mut self, ctx: &mut Context, key: KeyEvent) {
        match key.code {
            _ if ctrl(&key, 'g') => self.generate_caption(ctx),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Image => Focus::ApiKey,
                    Focus::ApiKey => Focus::Model,
                    Focus::Model => Focus::Image,
                }
            }
            KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Image => Focus::Model,
                    Focus::ApiKey => Focus::Image,
                    Focus::Model => Focus::ApiKey,
                }
            }
            KeyCode::Enter if self.focus == Focus::Image => self.load_image(ctx),
            KeyCode::Enter => self.focus = Focus::Image,
            _ => match self.focus {
                Focus::Image => {
                    self.image_field.input(key);
                }
                Focus::ApiKey => self.sidebar.handle_key(sidebar::Field::ApiKey, key),
                Focus::Model => self.sidebar.handle_key(sidebar::Field::Model, key),
            },
        }
    }

    pub fn render(&mut self, ctx: &Context, frame: &mut Frame, area: Rect) {
        let [side_area, main_area] =
            Layout::horizontal([Constraint::Length(36), Constraint::Min(20)]).areas(area);

        let sidebar_focus = match self.focus {
            Focus::Image => None,
            Focus::ApiKey => Some(sidebar::Field::ApiKey),
            Focus::Model => Some(sidebar::Field::Model),
        };
        let has_key = resolve_api_key(&self.sidebar.api_key(), ctx.env_api_key.as_deref()).is_ok();
        self.sidebar.render(frame, side_area, sidebar_focus, has_key);

        let [about_area, field_area, image_area, caption_area, status_area] = Layout::vertical([
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(main_area);

        let about = Paragraph::new(Text::from(vec![
            Line::raw("Gemini Vision handles both text and image data."),
            Line::raw("- Primary focus: processing and generating text and visual content."),
            Line::raw(
                "- Use cases: image captioning, visual question answering, understanding images.",
            ),
        ]))
        .wrap(Wrap { trim: false })
        .block(Block::bordered().title("Gemini Vision"));
        frame.render_widget(about, about_area);

        set_focus(&mut self.image_field, self.focus == Focus::Image);
        frame.render_widget(self.image_field.widget(), field_area);

        let image_text = match &self.image {
            Some(loaded) => Text::from(vec![
                Line::raw(format!(
                    "{} image, {} bytes",
                    loaded.image.mime_type,
                    loaded.image.bytes.len()
                )),
                Line::raw(format!("{}: {}", loaded.source.label(), loaded.source.describe())),
            ]),
            None => Text::from(Line::styled("No image loaded", Style::new().fg(Color::DarkGray))),
        };
        frame.render_widget(
            Paragraph::new(image_text).block(Block::bordered().title("Image")),
            image_area,
        );

        let caption = Paragraph::new(self.caption.as_deref().unwrap_or_default())
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title("Caption [Generate Caption! ^G]"));
        frame.render_widget(caption, caption_area);

        frame.render_widget(Paragraph::new(self.status.line()), status_area);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::component::tests::{ctrl_key, guest_app, key, screen_text, type_text};
    use crate::component::{App, Input};
    use crate::error::Error;
    use crate::llm::testing::ScriptedBackend;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn caption_app(backend: ScriptedBackend, env_key: Option<&str>) -> App {
        let mut app = guest_app(backend, env_key);
        app.handle(key(KeyCode::F(3)));
        app
    }

    fn finish(app: &mut App) {
        let outcome = app
            .ctx
            .worker
            .recv_timeout(Duration::from_secs(5))
            .expect("worker outcome");
        app.handle(Input::Outcome(outcome));
    }

    fn load_png(app: &mut App) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        std::fs::write(&path, PNG).unwrap();
        type_text(app, path.to_str().unwrap());
        app.handle(key(KeyCode::Enter));
        finish(app);
        dir
    }

    #[test]
    fn caption_needs_an_image() {
        let backend = ScriptedBackend::default();
        let mut app = caption_app(backend.clone(), Some("k"));
        app.handle(ctrl_key('g'));
        assert!(app.caption.caption.is_none());
        assert!(backend.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn loads_image_and_generates_caption() {
        let backend = ScriptedBackend::default();
        backend
            .model
            .replies
            .lock()
            .unwrap()
            .push_back(Ok("A tiny picture.".into()));
        let mut app = caption_app(backend.clone(), Some("k"));

        let _dir = load_png(&mut app);
        assert_eq!(app.caption.image.as_ref().unwrap().image.mime_type, "image/png");
        assert!(screen_text(&mut app).contains("File: "));

        app.handle(ctrl_key('g'));
        finish(&mut app);

        assert_eq!(app.caption.caption.as_deref(), Some("A tiny picture."));
        assert_eq!(backend.opened.lock().unwrap()[0].1, "gemini-1.5-flash");
        let sent = backend.model.prompts.lock().unwrap();
        assert_eq!(sent[0].prompt, "Please describe the image");
    }

    #[test]
    fn caption_without_key_reports_missing_key() {
        let backend = ScriptedBackend::default();
        let mut app = caption_app(backend.clone(), None);
        let _dir = load_png(&mut app);

        app.handle(ctrl_key('g'));

        assert!(backend.opened.lock().unwrap().is_empty());
        match &app.caption.status {
            Status::Error(m) => assert!(m.ends_with(&Error::MissingApiKey.to_string())),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn unsupported_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        let mut app = caption_app(ScriptedBackend::default(), Some("k"));

        type_text(&mut app, path.to_str().unwrap());
        app.handle(key(KeyCode::Enter));
        finish(&mut app);

        assert!(app.caption.status.is_error());
        assert!(app.caption.image.is_none());
    }
}
