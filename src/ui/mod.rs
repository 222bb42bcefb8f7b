pub mod form;
pub mod help;
pub mod input;
pub mod notification_popup;
pub mod status_bar;
pub mod summaries;
pub mod summary_card;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::app::App;

use form::{FormView, form_height};
use help::HelpView;
use notification_popup::NotificationPopup;
use status_bar::StatusBar;
use summaries::SummariesView;

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: form + summaries (optional) + status bar
    let [form_area, list_area, status_area] = Layout::vertical([
        Constraint::Length(form_height(app.show_advanced)),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(FormView::new(app), form_area);
    if app.session.show_summaries {
        frame.render_widget(SummariesView::new(app), list_area);
    }
    frame.render_widget(StatusBar::new(app), status_area);

    if app.show_help {
        frame.render_widget(HelpView::new(), area);
    }

    // Notification detail popup overlay (renders on top of everything)
    if app.show_notification_detail
        && let Some(ref notification) = app.session.notification
    {
        frame.render_widget(NotificationPopup::new(notification), area);
    }
}
