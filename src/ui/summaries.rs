use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Widget};

use crate::app::App;
use crate::ui::summary_card::SummaryCard;

/// Scrollable list of cached summaries, newest first.
pub struct SummariesView<'a> {
    pub app: &'a App,
}

impl<'a> SummariesView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for SummariesView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let entries = self.app.session.cache.entries();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Summaries ({}) ", entries.len()))
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);

        if entries.is_empty() {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "No summaries yet",
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let content_width = inner.width.saturating_sub(1); // 1 char left margin
        let selected = self.app.selected_index.min(entries.len() - 1);

        let cards: Vec<SummaryCard<'_>> = entries
            .iter()
            .enumerate()
            .map(|(i, result)| {
                SummaryCard::new(result)
                    .selected(i == selected)
                    .show_raw(i == selected && self.app.show_raw_tweets)
            })
            .collect();

        // Card height plus one separator line.
        let heights: Vec<u16> = cards
            .iter()
            .map(|c| c.height(content_width).saturating_add(1))
            .collect();

        let scroll_start = compute_scroll_start(&heights, selected, inner.height);

        let mut y = inner.y;
        for (idx, card) in cards.into_iter().enumerate().skip(scroll_start) {
            if y >= inner.y + inner.height {
                break;
            }
            let remaining = inner.y + inner.height - y;
            let render_h = heights[idx].min(remaining);

            card.render(
                Rect::new(inner.x + 1, y, content_width, render_h.saturating_sub(1)),
                buf,
            );
            y += render_h;

            if y <= inner.y + inner.height && idx + 1 < entries.len() {
                let sep = "\u{2500}".repeat(content_width as usize);
                buf.set_string(
                    inner.x + 1,
                    y.saturating_sub(1),
                    &sep,
                    Style::default().fg(Color::DarkGray),
                );
            }
        }
    }
}

/// Find the smallest scroll start index so that the selected item fits
/// within the available height.
fn compute_scroll_start(heights: &[u16], selected: usize, available: u16) -> usize {
    if heights.is_empty() {
        return 0;
    }

    let selected = selected.min(heights.len() - 1);
    if available == 0 {
        return selected;
    }

    let mut start = selected;
    let mut used = heights[selected];

    while start > 0 {
        let next = used.saturating_add(heights[start - 1]);
        if next > available {
            break;
        }
        start -= 1;
        used = next;
    }

    start
}
