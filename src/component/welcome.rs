use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Text},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from("Welcome to GenAI Project").bold(),
        Line::raw(""),
        Line::from("Empowering the Future with AI!").italic(),
        Line::raw(""),
        Line::raw(
            "GenAI Project brings a chatbot with conversation memory and Gemini Vision \
             image captioning together in one terminal.",
        ),
        Line::raw(""),
        Line::styled("Chatbot (F2)", Style::new().fg(Color::Cyan)),
        Line::raw("  Ask anything. The assistant remembers people, places and facts you mention."),
        Line::raw("  Past conversations are kept in the sidebar."),
        Line::raw(""),
        Line::styled("Image Captioning (F3)", Style::new().fg(Color::Cyan)),
        Line::raw("  Load a PNG or JPEG from a URL or a local path and let the model describe it."),
        Line::raw(""),
        Line::from("Ready to explore AI? Press F2 to start chatting.").bold(),
    ]);
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::bordered().title("Welcome"));
    frame.render_widget(paragraph, area);
}
