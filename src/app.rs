use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::api::SumxClient;
use crate::config::AppConfig;
use crate::countdown::CountdownSlot;
use crate::event::{AppEvent, Event, EventHandler};
use crate::query::QueryForm;
use crate::state::{FetchControl, FetchOutcome, Notification, SessionState};
use crate::ui;

/// How long a notification stays in the status bar.
const NOTIFICATION_TTL: Duration = Duration::from_secs(6);

/// Longest accepted date input (`YYYY-MM-DD`).
const DATE_INPUT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Form focus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Handle,
    From,
    To,
    Limit,
    Retweets,
    Fetch,
}

impl Focus {
    const BASIC: [Focus; 2] = [Focus::Handle, Focus::Fetch];
    const ADVANCED: [Focus; 6] = [
        Focus::Handle,
        Focus::From,
        Focus::To,
        Focus::Limit,
        Focus::Retweets,
        Focus::Fetch,
    ];

    fn order(show_advanced: bool) -> &'static [Focus] {
        if show_advanced {
            &Self::ADVANCED
        } else {
            &Self::BASIC
        }
    }

    fn step(self, show_advanced: bool, forward: bool) -> Focus {
        let order = Self::order(show_advanced);
        let pos = order.iter().position(|f| *f == self).unwrap_or(0);
        let len = order.len();
        let next = if forward {
            (pos + 1) % len
        } else {
            (pos + len - 1) % len
        };
        order[next]
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub running: bool,
    pub events: EventHandler,
    pub config: AppConfig,

    // Core state
    pub session: SessionState,
    pub form: QueryForm,

    // Presentation state
    pub focus: Focus,
    pub show_advanced: bool,
    pub show_help: bool,
    pub show_notification_detail: bool,
    pub selected_index: usize,
    pub show_raw_tweets: bool,
    notification_since: Option<Instant>,

    api_client: Arc<SumxClient>,
    countdown_timer: CountdownSlot,
}

impl App {
    pub fn new(config: AppConfig, api_client: SumxClient) -> Self {
        let session = SessionState {
            show_summaries: config.show_summaries,
            ..SessionState::default()
        };
        Self {
            running: true,
            events: EventHandler::new(config.tick_rate_fps),
            config,
            session,
            form: QueryForm::default(),
            focus: Focus::Handle,
            show_advanced: false,
            show_help: false,
            show_notification_detail: false,
            selected_index: 0,
            show_raw_tweets: false,
            notification_since: None,
            api_client: Arc::new(api_client),
            countdown_timer: CountdownSlot::default(),
        }
    }

    // -- Main event loop ----------------------------------------------------

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        self.events.send(AppEvent::LoadHistory);

        while self.running {
            terminal.draw(|frame| self.draw(frame))?;
            match self.events.next().await? {
                Event::Tick => self.tick(),
                Event::Crossterm(event) => {
                    if let crossterm::event::Event::Key(key) = event
                        && key.kind == crossterm::event::KeyEventKind::Press
                    {
                        self.handle_key_event(key);
                    }
                }
                Event::App(app_event) => self.handle_app_event(*app_event),
            }
        }

        // Tear down the countdown timer before leaving.
        self.countdown_timer.disarm();
        Ok(())
    }

    fn draw(&self, frame: &mut ratatui::Frame) {
        ui::draw(frame, self);
    }

    fn tick(&mut self) {
        if self.session.notification.is_none() {
            self.notification_since = None;
            return;
        }
        let since = *self.notification_since.get_or_insert_with(Instant::now);
        if !self.show_notification_detail && since.elapsed() >= NOTIFICATION_TTL {
            self.session.dismiss_notification();
            self.notification_since = None;
        }
    }

    /// Current state of the fetch control, evaluated against the wall clock.
    pub fn fetch_control(&self) -> FetchControl {
        self.session.fetch_control(&self.form.identifier, Utc::now())
    }

    // -- Key event routing --------------------------------------------------

    fn handle_key_event(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Ctrl-C always quits.
        if ctrl && matches!(key.code, KeyCode::Char('c' | 'C')) {
            self.events.send(AppEvent::Quit);
            return;
        }

        if self.show_notification_detail {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.show_notification_detail = false;
                self.session.dismiss_notification();
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        if ctrl {
            self.handle_ctrl_key(key);
            return;
        }

        match key.code {
            KeyCode::Esc => self.events.send(AppEvent::Quit),
            KeyCode::F(1) => self.show_help = true,
            KeyCode::Tab => self.focus = self.focus.step(self.show_advanced, true),
            KeyCode::BackTab => self.focus = self.focus.step(self.show_advanced, false),
            KeyCode::Up => self.move_selection_up(),
            KeyCode::Down => self.move_selection_down(),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Char(c) => self.insert_char(c),
            _ => {}
        }
    }

    fn handle_ctrl_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('o') => self.toggle_advanced(),
            KeyCode::Char('s') => self.session.show_summaries = !self.session.show_summaries,
            KeyCode::Char('r') => self.show_raw_tweets = !self.show_raw_tweets,
            KeyCode::Char('y') => self.copy_selected(),
            KeyCode::Char('e') if self.session.notification.is_some() => {
                self.show_notification_detail = true;
            }
            _ => {}
        }
    }

    fn toggle_advanced(&mut self) {
        self.show_advanced = !self.show_advanced;
        if !self.show_advanced && !Focus::BASIC.contains(&self.focus) {
            self.focus = Focus::Handle;
        }
    }

    // -- Form editing -------------------------------------------------------

    fn insert_char(&mut self, c: char) {
        match self.focus {
            Focus::Handle => self.form.identifier.push(c),
            Focus::From => push_date_char(&mut self.form.from, c),
            Focus::To => push_date_char(&mut self.form.to, c),
            Focus::Limit if c.is_ascii_digit() => self.form.limit.push(c),
            Focus::Retweets if c == ' ' => {
                self.form.include_retweets = !self.form.include_retweets;
            }
            _ => {}
        }
    }

    fn delete_char(&mut self) {
        match self.focus {
            Focus::Handle => self.form.identifier.pop(),
            Focus::From => {
                self.form.from.pop();
            }
            Focus::To => {
                self.form.to.pop();
            }
            Focus::Limit => {
                self.form.limit.pop();
            }
            Focus::Retweets | Focus::Fetch => {}
        }
    }

    fn submit(&mut self) {
        if self.focus == Focus::Retweets {
            self.form.include_retweets = !self.form.include_retweets;
            return;
        }
        if let Some(query) = self.session.begin_fetch(&self.form, Utc::now()) {
            self.events.send(AppEvent::FetchSummary(query));
        }
    }

    // -- Selection helpers --------------------------------------------------

    fn move_selection_down(&mut self) {
        if self.selected_index + 1 < self.session.cache.len() {
            self.selected_index += 1;
            self.show_raw_tweets = false;
        }
    }

    fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            self.show_raw_tweets = false;
        }
    }

    /// Put the selected summary's text on the terminal clipboard.
    fn copy_selected(&mut self) {
        let Some(result) = self.session.cache.get(self.selected_index) else {
            return;
        };
        let sequence = osc52_sequence(&result.plain_text());
        let mut stdout = std::io::stdout();
        let written = stdout
            .write_all(sequence.as_bytes())
            .and_then(|()| stdout.flush());
        self.session.notification = Some(match written {
            Ok(()) => Notification::info("Copied", format!("{} summary", result.params.username)),
            Err(e) => {
                tracing::warn!("clipboard write failed: {e}");
                Notification::info("Copy failed", e.to_string())
            }
        });
        self.notification_since = None;
    }

    // -- App event handling -------------------------------------------------

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                self.running = false;
            }

            // API request triggers -> dispatch to async tasks.
            AppEvent::FetchSummary(_) | AppEvent::LoadHistory => {
                self.dispatch_api_request(event);
            }

            // API response events
            AppEvent::SummaryLoaded(result) => {
                let outcome = self.session.finish_fetch(result);
                match outcome {
                    FetchOutcome::Prepended => {
                        self.selected_index = 0;
                        self.show_raw_tweets = false;
                    }
                    FetchOutcome::RateLimited { armed: true } => self.restart_ticker(),
                    _ => {}
                }
                self.notification_since = None;
            }
            AppEvent::HistoryLoaded { ticket, result } => {
                self.session.seed_history(ticket, result);
                self.selected_index = 0;
                self.notification_since = None;
            }

            AppEvent::CountdownTick => {
                apply_countdown_tick(&mut self.session, &mut self.countdown_timer, Utc::now());
            }
        }
    }

    /// Replace the countdown timer; the previous one is cancelled first.
    fn restart_ticker(&mut self) {
        let sender = self.events.sender();
        self.countdown_timer.rearm(self.config.countdown_period(), move || {
            sender
                .send(Event::App(Box::new(AppEvent::CountdownTick)))
                .is_ok()
        });
    }

    // -- API dispatch -------------------------------------------------------

    fn dispatch_api_request(&self, event: AppEvent) {
        let client = Arc::clone(&self.api_client);
        let sender = self.events.sender();

        match event {
            AppEvent::FetchSummary(query) => {
                tokio::spawn(async move {
                    let result = client.summarize(&query).await.map_err(Arc::new);
                    let _ = sender.send(Event::App(Box::new(AppEvent::SummaryLoaded(result))));
                });
            }
            AppEvent::LoadHistory => {
                let ticket = self.session.history_ticket();
                tokio::spawn(async move {
                    let result = client.list_summaries().await.map_err(Arc::new);
                    let _ = sender.send(Event::App(Box::new(AppEvent::HistoryLoaded {
                        ticket,
                        result,
                    })));
                });
            }
            _ => {
                // Not an API request event -- ignore.
            }
        }
    }
}

/// Recompute the countdown. Once it has expired the ticker is dropped and
/// `false` is returned.
fn apply_countdown_tick(
    session: &mut SessionState,
    timer: &mut CountdownSlot,
    now: chrono::DateTime<Utc>,
) -> bool {
    if session.tick(now) {
        return true;
    }
    timer.disarm();
    false
}

/// OSC 52 "set clipboard" escape sequence for `text`.
fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", BASE64.encode(text))
}

/// Accept only characters that can appear in `YYYY-MM-DD`.
fn push_date_char(field: &mut String, c: char) {
    if (c.is_ascii_digit() || c == '-') && field.len() < DATE_INPUT_LEN {
        field.push(c);
    }
}
