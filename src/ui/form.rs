use chrono::Utc;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Widget};

use crate::app::{App, Focus};
use crate::state::FetchControl;
use crate::ui::input::TextInput;

/// Rows the form needs, including its border.
pub fn form_height(show_advanced: bool) -> u16 {
    if show_advanced { 9 } else { 5 }
}

/// Request form: account field, optional advanced options, fetch control.
pub struct FormView<'a> {
    pub app: &'a App,
}

impl<'a> FormView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for FormView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let app = self.app;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Summarize an account ")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width < 2 || inner.height == 0 {
            return;
        }
        let inner = Rect::new(inner.x + 1, inner.y, inner.width - 1, inner.height);

        let rows = Layout::vertical(vec![Constraint::Length(1); inner.height as usize]).split(inner);
        let mut row = rows.iter();

        if let Some(&line) = row.next() {
            TextInput::new("Account   ", app.form.identifier.as_str())
                .placeholder("@username")
                .focused(app.focus == Focus::Handle)
                .render(line, buf);
        }

        if app.show_advanced {
            let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
            let fields = [
                ("From      ", app.form.from.as_str(), today.as_str(), Focus::From),
                ("To        ", app.form.to.as_str(), today.as_str(), Focus::To),
                ("Limit     ", app.form.limit.as_str(), "5-100", Focus::Limit),
            ];
            for (label, text, placeholder, focus) in fields {
                if let Some(&line) = row.next() {
                    TextInput::new(label, text)
                        .placeholder(placeholder)
                        .focused(app.focus == focus)
                        .render(line, buf);
                }
            }
            if let Some(&line) = row.next() {
                let mark = if app.form.include_retweets { "[x]" } else { "[ ]" };
                let style = focus_style(app.focus == Focus::Retweets);
                buf.set_line(
                    line.x,
                    line.y,
                    &Line::from(vec![
                        Span::styled("Reposts   ", style),
                        Span::styled(format!("{mark} include reposts"), Style::default()),
                    ]),
                    line.width,
                );
            }
        }

        // Spacer, then the fetch control.
        row.next();
        if let Some(&line) = row.next() {
            let control = app.fetch_control();
            buf.set_line(
                line.x,
                line.y,
                &fetch_line(&control, app.focus == Focus::Fetch),
                line.width,
            );
        }
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn fetch_line(control: &FetchControl, focused: bool) -> Line<'static> {
    let mut style = match control {
        FetchControl::Ready => Style::default().fg(Color::Black).bg(Color::Green),
        FetchControl::Loading => Style::default().fg(Color::Yellow),
        FetchControl::Countdown(_) => Style::default().fg(Color::Red),
        FetchControl::NeedsIdentifier => Style::default().fg(Color::DarkGray),
    };
    if focused {
        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }

    let mut spans = vec![Span::styled(format!(" {} ", control.label()), style)];
    if !control.is_enabled() {
        spans.push(Span::styled(
            "  (disabled)",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    spans.push(Span::styled(
        "   Ctrl-O options \u{b7} F1 help",
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn fetch_line_shows_countdown_label() {
        let line = fetch_line(&FetchControl::Countdown("2 min, 5 s".into()), false);
        assert!(line_text(&line).starts_with(" Next request possible in 2 min, 5 s "));
        assert!(line_text(&line).contains("(disabled)"));
    }

    #[test]
    fn fetch_line_ready_is_not_marked_disabled() {
        let line = fetch_line(&FetchControl::Ready, true);
        assert!(line_text(&line).starts_with(" Fetch "));
        assert!(!line_text(&line).contains("(disabled)"));
    }

    #[test]
    fn form_grows_with_advanced_options() {
        assert!(form_height(true) > form_height(false));
    }
}
