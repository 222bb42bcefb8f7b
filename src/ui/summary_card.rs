use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::api::types::SummaryResult;

/// Renders one summary.
///
/// Layout:
///   @username  last 10 posts from ... to ...
///   Heading
///     section text (wrapped) ...
///   Posts (only when raw posts are shown)
///     - post text ...
pub struct SummaryCard<'a> {
    pub result: &'a SummaryResult,
    pub selected: bool,
    pub show_raw: bool,
}

impl<'a> SummaryCard<'a> {
    pub fn new(result: &'a SummaryResult) -> Self {
        Self {
            result,
            selected: false,
            show_raw: false,
        }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn show_raw(mut self, show_raw: bool) -> Self {
        self.show_raw = show_raw;
        self
    }

    /// All lines of the card at the given width.
    fn lines(&self, width: u16) -> Vec<Line<'a>> {
        let width = width as usize;
        let body_width = width.saturating_sub(2);
        let name_style = if self.selected {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let mut lines = Vec::new();
        let mut header = vec![Span::styled(
            self.result.params.username.clone(),
            name_style,
        )];
        let description = self.result.description();
        if !description.is_empty() {
            header.push(Span::styled(
                format!("  {description}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        if self.result.summary.is_empty() {
            lines.push(Line::from(Span::styled(
                "  (empty summary)",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for section in &self.result.summary {
            lines.push(Line::from(Span::styled(
                section.heading.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            for text in wrap_text(&section.text, body_width) {
                lines.push(Line::from(format!("  {text}")));
            }
        }

        if self.show_raw {
            lines.push(Line::from(Span::styled(
                format!("Posts ({})", self.result.tweets.len()),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )));
            for tweet in &self.result.tweets {
                for (i, text) in wrap_text(tweet, body_width.saturating_sub(2))
                    .into_iter()
                    .enumerate()
                {
                    let bullet = if i == 0 { "- " } else { "  " };
                    lines.push(Line::from(Span::styled(
                        format!("  {bullet}{text}"),
                        Style::default().fg(Color::Gray),
                    )));
                }
            }
        } else if self.selected && !self.result.tweets.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {} posts (Ctrl-R to show)", self.result.tweets.len()),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }

    /// Height in lines needed for this card.
    pub fn height(&self, width: u16) -> u16 {
        self.lines(width).len().min(u16::MAX as usize) as u16
    }
}

impl Widget for SummaryCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        for (i, line) in self
            .lines(area.width)
            .iter()
            .take(area.height as usize)
            .enumerate()
        {
            buf.set_line(area.x, area.y + i as u16, line, area.width);
        }
    }
}

/// Greedy word wrap measured in display columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![];
    }
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.width() + 1 + word.width() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
