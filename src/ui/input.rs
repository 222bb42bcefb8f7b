use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthChar;

/// A single-line labelled text field.
///
/// Renders `label` + content. Empty content shows the placeholder dimmed;
/// a focused field gets a cursor block at the end.
pub struct TextInput<'a> {
    pub label: &'a str,
    pub text: &'a str,
    pub placeholder: &'a str,
    pub focused: bool,
}

impl<'a> TextInput<'a> {
    pub fn new(label: &'a str, text: &'a str) -> Self {
        Self {
            label,
            text,
            placeholder: "",
            focused: false,
        }
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let label_style = if self.focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let (label_end, _) = buf.set_stringn(
            area.x,
            area.y,
            self.label,
            area.width as usize,
            label_style,
        );

        let max_width = (area.x + area.width).saturating_sub(label_end) as usize;
        if max_width == 0 {
            return;
        }

        if self.text.is_empty() && !self.placeholder.is_empty() {
            buf.set_stringn(
                label_end,
                area.y,
                self.placeholder,
                max_width,
                Style::default().fg(Color::DarkGray),
            );
            if self.focused {
                buf.set_string(label_end, area.y, "\u{2588}", Style::default().fg(Color::White));
            }
            return;
        }

        let display = if self.focused {
            format!("{}\u{2588}", self.text)
        } else {
            self.text.to_owned()
        };
        // If the content is wider than the field, show the rightmost portion.
        let visible = tail_within(&display, max_width);
        buf.set_string(label_end, area.y, visible, Style::default().fg(Color::White));
    }
}

/// Longest suffix of `s` whose display width fits in `width` columns.
fn tail_within(s: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = s.len();
    for (idx, c) in s.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = idx;
    }
    &s[start..]
}
