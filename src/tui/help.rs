use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("o", 11, "Open an image by path"),
        key_line("p", 11, "Switch phase (arterial/venous)"),
        key_line("Enter", 7, "Process image"),
        key_line("x", 11, "Cancel processing"),
        key_line("s", 11, "Save processed image"),
        key_line("y", 11, "Copy saved path to clipboard"),
        key_line("h", 11, "Check backend health"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Dropping a file:"),
        Line::from("  Drag a JPG or PNG onto the terminal window. The pasted path is"),
        Line::from("  selected the same way as one typed at the o prompt."),
        Line::from(""),
        Line::from("Alerts:"),
        key_line("Enter/Esc", 3, "Dismiss"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
