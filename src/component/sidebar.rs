use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;
use tui_textarea::TextArea;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Model,
    ApiKey,
}

/// Model selector plus a masked API-key field.
pub struct Sidebar {
    models: Vec<String>,
    selected: usize,
    api_key: TextArea<'static>,
}

pub(crate) fn single_line(title: &'static str, masked: bool) -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_block(Block::bordered().title(title));
    textarea.set_cursor_line_style(Style::default());
    if masked {
        textarea.set_mask_char('\u{2022}');
    }
    textarea
}

pub(crate) fn set_focus(textarea: &mut TextArea<'_>, focused: bool) {
    if focused {
        textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    } else {
        textarea.set_cursor_style(Style::default());
    }
}

pub(crate) fn text_of(textarea: &TextArea<'_>) -> String {
    textarea.lines().join("\n")
}

impl Sidebar {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            selected: 0,
            api_key: single_line("API", true),
        }
    }

    pub fn model(&self) -> &str {
        self.models
            .get(self.selected)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn api_key(&self) -> String {
        text_of(&self.api_key)
    }

    pub fn handle_key(&mut self, field: Field, key: KeyEvent) {
        match field {
            Field::Model => match key.code {
                KeyCode::Right | KeyCode::Down if !self.models.is_empty() => {
                    self.selected = (self.selected + 1) % self.models.len();
                }
                KeyCode::Left | KeyCode::Up if !self.models.is_empty() => {
                    self.selected = (self.selected + self.models.len() - 1) % self.models.len();
                }
                _ => {}
            },
            Field::ApiKey => {
                self.api_key.input(key);
            }
        }
    }

    /// Draws the fields at the top of `area` and returns the space left below.
    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focus: Option<Field>,
        has_key: bool,
    ) -> Rect {
        let [model_area, key_area, rest] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .areas(area);

        let model_style = if focus == Some(Field::Model) {
            Style::new().fg(Color::Yellow)
        } else {
            Style::new()
        };
        let model = Paragraph::new(Line::from(format!("< {} >", self.model())))
            .block(Block::bordered().title("Select Model").style(model_style));
        frame.render_widget(model, model_area);

        set_focus(&mut self.api_key, focus == Some(Field::ApiKey));
        let key_block = if has_key {
            Block::bordered().title("API").gray()
        } else {
            Block::bordered().title("API - Enter API key").red()
        };
        self.api_key.set_block(key_block);
        frame.render_widget(self.api_key.widget(), key_area);

        rest
    }
}
