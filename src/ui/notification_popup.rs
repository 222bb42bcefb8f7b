use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Widget};
use unicode_width::UnicodeWidthStr;

use crate::state::Notification;
use crate::ui::summary_card::wrap_text;

const MAX_WIDTH: u16 = 70;
const DISMISS_HINT: &str = " Esc/Enter to dismiss ";

/// Centered popup with the full notification text, sized to its content.
pub struct NotificationPopup<'a> {
    notification: &'a Notification,
}

impl<'a> NotificationPopup<'a> {
    pub fn new(notification: &'a Notification) -> Self {
        Self { notification }
    }

    /// Panel width: wide enough for the title, hint, and longest line.
    fn panel_width(&self, area: Rect) -> u16 {
        let title = self.notification.title.width() + 4;
        let body = self
            .notification
            .description
            .lines()
            .map(UnicodeWidthStr::width)
            .max()
            .unwrap_or(0)
            + 4;
        let wanted = title.max(body).max(DISMISS_HINT.width() + 2);
        (wanted.min(MAX_WIDTH as usize) as u16).min(area.width.saturating_sub(4))
    }
}

impl Widget for NotificationPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = self.panel_width(area);
        let body = wrap_text(&self.notification.description, width.saturating_sub(4) as usize);

        // Border plus one blank row above and below the body.
        let height = (body.len() as u16)
            .saturating_add(4)
            .min((area.height * 3 / 5).max(6))
            .min(area.height);

        let panel = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        Clear.render(panel, buf);

        let accent = Style::default().fg(Color::Red);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(accent)
            .title(Line::styled(
                format!(" {} ", self.notification.title),
                accent.add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::styled(
                DISMISS_HINT,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ));
        let inner = block.inner(panel);
        block.render(panel, buf);

        let rows = inner.height.saturating_sub(1) as usize;
        for (i, line) in body.iter().take(rows).enumerate() {
            buf.set_stringn(
                inner.x + 1,
                inner.y + 1 + i as u16,
                line,
                inner.width.saturating_sub(2) as usize,
                Style::default().fg(Color::White),
            );
        }
    }
}
