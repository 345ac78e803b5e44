// App state and main event loop.
// Manages tabs, modals, keyboard input and the background fetch tasks.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::auth;
use crate::credentials::AuthState;
use crate::feed::{FeedClient, FetchOutcome, VideoSummary};
use crate::state::{ConsoleState, SearchTabState, SubscriptionsTabState, VideoListState};
use crate::ui;

/// Active tab in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Feed,
    Search,
    Subscriptions,
    Console,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Feed, Tab::Search, Tab::Subscriptions, Tab::Console];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Feed => "Feed",
            Tab::Search => "Search",
            Tab::Subscriptions => "Subscriptions",
            Tab::Console => "Console",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Feed => Tab::Search,
            Tab::Search => Tab::Subscriptions,
            Tab::Subscriptions => Tab::Console,
            Tab::Console => Tab::Feed,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Tab::Feed => Tab::Console,
            Tab::Search => Tab::Feed,
            Tab::Subscriptions => Tab::Search,
            Tab::Console => Tab::Subscriptions,
        }
    }

    /// Whether the tab needs a logged-in user.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Tab::Feed | Tab::Search)
    }
}

/// Overlay drawn on top of the active tab.
#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    /// Details and links of one video.
    Video(VideoSummary),
    /// Input for the URL the login flow redirected to.
    Login { input: String },
}

/// Which list a fetch result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Feed,
    Search,
}

/// Results delivered from background tasks to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    Fetched {
        target: FetchTarget,
        /// Results generation the fetch was started in.
        generation: u64,
        outcome: FetchOutcome,
    },
    LoginFinished(std::result::Result<(), String>),
}

/// Main application state.
pub struct App {
    /// Currently active tab.
    pub active_tab: Tab,
    /// Authentication state, re-derived from the credential cache every tick.
    pub auth: AuthState,
    pub feed: VideoListState,
    pub search: SearchTabState,
    pub subscriptions: SubscriptionsTabState,
    pub console: ConsoleState,
    pub modal: Option<Modal>,
    /// One-line message shown on the login screen.
    pub notice: Option<String>,
    pub show_help: bool,
    /// Whether the app should exit.
    pub should_quit: bool,
    /// Bumped whenever results are cleared; older fetches are discarded.
    generation: u64,
    client: FeedClient,
    runtime: Handle,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(client: FeedClient, runtime: Handle) -> Self {
        let columns = client.config().grid_columns;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            active_tab: Tab::default(),
            auth: client.auth_state(),
            feed: VideoListState::new(columns),
            search: SearchTabState::new(columns),
            subscriptions: SubscriptionsTabState::new(columns + 1),
            console: ConsoleState::new(),
            modal: None,
            notice: None,
            show_help: false,
            should_quit: false,
            generation: 0,
            client,
            runtime,
            events_tx,
            events_rx,
        }
    }

    pub fn client(&self) -> &FeedClient {
        &self.client
    }

    /// Kick off the initial load when a credential is already cached.
    pub fn start(&mut self) {
        if self.auth.is_authenticated() {
            self.console.log_info("Found cached access token");
            self.refresh_feed();
        } else {
            self.console.log_info("Not logged in");
        }
    }

    /// Main event loop.
    pub fn run(&mut self, terminal: &mut Terminal<impl Backend>) -> io::Result<()> {
        self.start();
        while !self.should_quit {
            self.refresh_auth();
            self.drain_events();
            terminal.draw(|frame| ui::draw(frame, self))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn refresh_auth(&mut self) {
        self.auth = self.client.auth_state();
    }

    /// Apply every result the background tasks have delivered so far.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
    }

    /// Handle keyboard and other events.
    fn handle_events(&mut self) -> io::Result<()> {
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => self.handle_key(key),
                Event::Paste(text) => self.handle_paste(&text),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.modal.is_some() {
            self.handle_modal_key(key);
            return;
        }
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }
        if self.active_tab == Tab::Search && self.search.editing {
            self.handle_search_input(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => self.switch_tab(self.active_tab.next()),
            KeyCode::BackTab => self.switch_tab(self.active_tab.prev()),
            KeyCode::Char('L') => self.open_login(),
            KeyCode::Char('x') => self.logout(),
            _ if self.active_tab.requires_auth() && !self.auth.is_authenticated() => {
                if key.code == KeyCode::Enter {
                    self.open_login();
                }
            }
            _ => self.handle_tab_key(key),
        }
    }

    /// Pasted text goes to whichever input is active.
    pub fn handle_paste(&mut self, text: &str) {
        let text = text.trim();
        match &mut self.modal {
            Some(Modal::Login { input }) => input.push_str(text),
            Some(Modal::Video(_)) => {}
            None if self.active_tab == Tab::Search && self.search.editing => {
                self.search.input.push_str(text);
            }
            None => {}
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
        if tab == Tab::Console {
            self.console.mark_read();
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };

        match modal {
            Modal::Video(_) => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')
                ) {
                    self.modal = None;
                }
            }
            Modal::Login { input } => match key.code {
                KeyCode::Esc => self.modal = None,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                KeyCode::Enter => {
                    let redirect = input.trim().to_string();
                    self.modal = None;
                    if !redirect.is_empty() {
                        self.submit_login(redirect);
                    }
                }
                _ => {}
            },
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.search.stop_editing(),
            KeyCode::Backspace => self.search.pop_char(),
            KeyCode::Char(c) => self.search.push_char(c),
            KeyCode::Enter => {
                if let Some(query) = self.search.submit() {
                    self.run_search(query);
                }
            }
            _ => {}
        }
    }

    fn handle_tab_key(&mut self, key: KeyEvent) {
        match self.active_tab {
            Tab::Feed => match key.code {
                KeyCode::Char('r') => self.refresh_feed(),
                KeyCode::Enter => self.open_video(FetchTarget::Feed),
                _ => navigate_grid(&mut self.feed, key.code),
            },
            Tab::Search => match key.code {
                KeyCode::Char('/') | KeyCode::Char('i') => self.search.start_editing(),
                KeyCode::Char('r') => {
                    if let Some(query) = self.search.query.clone() {
                        self.run_search(query);
                    }
                }
                KeyCode::Enter => self.open_video(FetchTarget::Search),
                _ => navigate_grid(&mut self.search.results, key.code),
            },
            Tab::Subscriptions => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(subscribed) = self.subscriptions.toggle_selected() {
                        debug!(subscribed, "toggled mock subscription");
                    }
                }
                KeyCode::Char('f') => self.subscriptions.cycle_filter(),
                code => {
                    let grid = &mut self.subscriptions.grid;
                    match code {
                        KeyCode::Left | KeyCode::Char('h') => grid.move_left(),
                        KeyCode::Right | KeyCode::Char('l') => grid.move_right(),
                        KeyCode::Up | KeyCode::Char('k') => grid.move_up(),
                        KeyCode::Down | KeyCode::Char('j') => grid.move_down(),
                        _ => {}
                    }
                }
            },
            Tab::Console => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.console.select_prev(),
                KeyCode::Down | KeyCode::Char('j') => self.console.select_next(),
                _ => {}
            },
        }
    }

    fn open_video(&mut self, target: FetchTarget) {
        let list = match target {
            FetchTarget::Feed => &self.feed,
            FetchTarget::Search => &self.search.results,
        };
        if let Some(video) = list.selected_video() {
            self.modal = Some(Modal::Video(video.clone()));
        }
    }

    fn open_login(&mut self) {
        if self.auth.is_authenticated() {
            return;
        }
        self.modal = Some(Modal::Login {
            input: String::new(),
        });
    }

    /// Reload the subscription feed in the background.
    pub fn refresh_feed(&mut self) {
        if !self.auth.is_authenticated() {
            self.notice = Some("Log in to load your subscriptions".to_string());
            return;
        }

        self.feed.begin_fetch();
        self.console.log_info("Fetching subscription videos");

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let generation = self.generation;
        self.runtime.spawn(async move {
            let outcome = client.subscription_videos().await;
            let _ = tx.send(AppEvent::Fetched {
                target: FetchTarget::Feed,
                generation,
                outcome,
            });
        });
    }

    /// Run a search in the background.
    pub fn run_search(&mut self, query: String) {
        if !self.auth.is_authenticated() {
            self.notice = Some("Log in to search videos".to_string());
            return;
        }

        self.search.results.begin_fetch();
        self.console.log_info(format!("Searching for \"{}\"", query));

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let generation = self.generation;
        self.runtime.spawn(async move {
            let outcome = client.search(&query).await;
            let _ = tx.send(AppEvent::Fetched {
                target: FetchTarget::Search,
                generation,
                outcome,
            });
        });
    }

    fn submit_login(&mut self, redirect: String) {
        self.console.log_info("Completing login");

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = auth::complete_login(&client, &redirect)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::LoginFinished(result));
        });
    }

    /// Forget the credential and every result fetched with it.
    pub fn logout(&mut self) {
        if let Err(e) = auth::logout(self.client.store().as_ref()) {
            warn!(error = %e, "logout failed");
            self.console.log_error(format!("Logout failed: {}", e));
            return;
        }

        self.clear_results();
        self.refresh_auth();
        self.notice = None;
        self.console.log_info("Logged out");
    }

    fn clear_results(&mut self) {
        self.generation += 1;
        self.feed.clear();
        self.search.results.clear();
        if matches!(self.modal, Some(Modal::Video(_))) {
            self.modal = None;
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Fetched {
                target,
                generation,
                outcome,
            } => {
                if generation != self.generation {
                    debug!(?target, "dropping result from a cleared session");
                    return;
                }
                self.apply_outcome(target, outcome);
            }
            AppEvent::LoginFinished(Ok(())) => {
                self.refresh_auth();
                self.notice = None;
                self.console.log_info("Logged in");
                self.refresh_feed();
            }
            AppEvent::LoginFinished(Err(message)) => {
                self.console.log_error(format!("Login failed: {}", message));
                self.notice = Some(message);
            }
        }
    }

    fn apply_outcome(&mut self, target: FetchTarget, outcome: FetchOutcome) {
        let list = match target {
            FetchTarget::Feed => &mut self.feed,
            FetchTarget::Search => &mut self.search.results,
        };
        list.finish_fetch(&outcome);

        match &outcome {
            FetchOutcome::Success(items) => {
                self.console
                    .log_info(format!("Loaded {} videos", items.len()));
            }
            FetchOutcome::EmptyOrAuthError(err) => self.console.log_warn(err.message()),
            FetchOutcome::AuthExpired => {
                self.clear_results();
                self.refresh_auth();
                self.notice = Some("Session expired, please log in again".to_string());
                self.console.log_error("Session expired, credential cache cleared");
            }
            FetchOutcome::TransientFailure(message) => {
                self.console
                    .log_error(format!("Failed to fetch videos: {}", message));
            }
        }
    }
}

fn navigate_grid(list: &mut VideoListState, code: KeyCode) {
    let grid = &mut list.grid;
    match code {
        KeyCode::Left | KeyCode::Char('h') => grid.move_left(),
        KeyCode::Right | KeyCode::Char('l') => grid.move_right(),
        KeyCode::Up | KeyCode::Char('k') => grid.move_up(),
        KeyCode::Down | KeyCode::Char('j') => grid.move_down(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::credentials::{self, Credential, CredentialStore, MemoryStore};
    use crate::feed::AppError;
    use crate::feed::fetcher::tests::{Reply, ScriptedTransport};
    use crate::state::LoadingState;

    const VIDEOS: &str = r#"[
        {"video_id":"v1","title":"First","channel_title":"Chan"},
        {"video_id":"v2","title":"Second","channel_title":"Chan"}
    ]"#;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(logged_in: bool, replies: Vec<Reply>) -> (App, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        if logged_in {
            credentials::save(store.as_ref(), &Credential::new("abc", None, None)).unwrap();
        }
        let client = FeedClient::new(
            Config::default(),
            store.clone(),
            ScriptedTransport::new(replies),
        );
        (App::new(client, Handle::current()), store)
    }

    async fn next_event(app: &mut App) {
        let event = app.events_rx.recv().await.unwrap();
        app.apply_event(event);
    }

    #[test]
    fn test_tab_cycle() {
        let mut tab = Tab::Feed;
        for _ in 0..Tab::ALL.len() {
            assert_eq!(tab.next().prev(), tab);
            tab = tab.next();
        }
        assert_eq!(tab, Tab::Feed);
    }

    #[tokio::test]
    async fn test_feed_loads_and_opens_modal() {
        let (mut app, _store) = app(true, vec![Reply::Status(200, VIDEOS)]);

        app.start();
        assert!(app.feed.is_fetching());
        next_event(&mut app).await;

        assert_eq!(app.feed.grid.len(), 2);
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Enter));

        let Some(Modal::Video(video)) = &app.modal else {
            panic!("expected video modal");
        };
        assert_eq!(video.id, "v2");

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.modal, None);
    }

    #[tokio::test]
    async fn test_auth_expiry_clears_results_and_logs_out() {
        let (mut app, store) = app(
            true,
            vec![Reply::Status(200, VIDEOS), Reply::Status(401, "")],
        );

        app.refresh_feed();
        next_event(&mut app).await;
        assert!(app.feed.status().is_loaded());

        app.refresh_feed();
        next_event(&mut app).await;

        assert_eq!(app.feed.status(), &LoadingState::Idle);
        assert!(!app.auth.is_authenticated());
        assert!(store.is_empty());
        assert!(app.notice.is_some());
        assert_eq!(app.console.unread_errors, 1);
    }

    fn videos(ids: &[&str]) -> FetchOutcome {
        FetchOutcome::Success(
            ids.iter()
                .map(|id| VideoSummary {
                    id: id.to_string(),
                    title: format!("Video {}", id),
                    channel_title: "Chan".to_string(),
                    thumbnail_url: None,
                    published_at: None,
                    url: None,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_fetch_finishing_after_logout_is_dropped() {
        let (mut app, _store) = app(true, vec![]);

        app.refresh_feed();
        let started_in = app.generation;
        app.handle_key(key(KeyCode::Char('x')));
        assert!(!app.feed.is_fetching());

        app.apply_event(AppEvent::Fetched {
            target: FetchTarget::Feed,
            generation: started_in,
            outcome: videos(&["old"]),
        });

        assert_eq!(app.feed.status(), &LoadingState::Idle);
        assert!(app.feed.grid.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_finishing_after_expiry_is_dropped() {
        let (mut app, _store) = app(true, vec![]);

        app.run_search("cats".to_string());
        app.run_search("dogs".to_string());
        let started_in = app.generation;

        app.apply_event(AppEvent::Fetched {
            target: FetchTarget::Search,
            generation: started_in,
            outcome: FetchOutcome::AuthExpired,
        });
        app.apply_event(AppEvent::Fetched {
            target: FetchTarget::Search,
            generation: started_in,
            outcome: videos(&["stale"]),
        });

        assert_eq!(app.search.results.status(), &LoadingState::Idle);
        assert!(!app.search.results.is_fetching());
        assert_eq!(app.notice.as_deref(), Some("Session expired, please log in again"));
    }

    #[tokio::test]
    async fn test_backend_message_shows_as_error() {
        let (mut app, _store) = app(
            true,
            vec![Reply::Status(200, r#"{"message":"quota exceeded"}"#)],
        );

        app.refresh_feed();
        next_event(&mut app).await;

        assert_eq!(
            app.feed.status(),
            &LoadingState::Error(AppError::Backend("quota exceeded".into()).message().to_string())
        );
    }

    #[tokio::test]
    async fn test_anonymous_feed_opens_login() {
        let (mut app, _store) = app(false, vec![]);

        app.refresh_feed();
        assert!(!app.feed.is_fetching());
        assert!(app.notice.is_some());

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            app.modal,
            Some(Modal::Login {
                input: String::new()
            })
        );
    }

    #[tokio::test]
    async fn test_login_modal_saves_credential_and_loads_feed() {
        let (mut app, store) = app(false, vec![Reply::Status(200, VIDEOS)]);

        app.handle_key(key(KeyCode::Char('L')));
        app.handle_paste("http://localhost:3000/?access_token=fresh&expires_in=60");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.modal, None);

        // Login result, then the feed load it triggers
        next_event(&mut app).await;
        assert!(app.auth.is_authenticated());
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("fresh"));

        next_event(&mut app).await;
        assert_eq!(app.feed.grid.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_login_sets_notice() {
        let (mut app, _store) = app(false, vec![]);

        app.handle_key(key(KeyCode::Char('L')));
        app.handle_paste("http://localhost:3000/?error=access_denied");
        app.handle_key(key(KeyCode::Enter));
        next_event(&mut app).await;

        assert!(!app.auth.is_authenticated());
        assert!(app.notice.as_deref().unwrap().contains("access_denied"));
    }

    #[tokio::test]
    async fn test_search_flow() {
        let (mut app, _store) = app(true, vec![Reply::Status(200, VIDEOS)]);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tab, Tab::Search);

        app.handle_key(key(KeyCode::Char('/')));
        for c in "q cats".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        // 'q' was typed into the box rather than quitting
        assert!(!app.should_quit);
        app.handle_key(key(KeyCode::Enter));

        next_event(&mut app).await;
        assert_eq!(app.search.query.as_deref(), Some("q cats"));
        assert_eq!(app.search.results.grid.len(), 2);
    }

    #[tokio::test]
    async fn test_logout_key() {
        let (mut app, store) = app(true, vec![Reply::Status(200, VIDEOS)]);
        app.refresh_feed();
        next_event(&mut app).await;

        app.handle_key(key(KeyCode::Char('x')));

        assert!(store.is_empty());
        assert!(!app.auth.is_authenticated());
        assert!(app.feed.grid.is_empty());
    }

    #[tokio::test]
    async fn test_console_badge_clears_on_view() {
        let (mut app, _store) = app(false, vec![]);
        app.console.log_error("boom");

        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.active_tab, Tab::Console);
        assert_eq!(app.console.unread_errors, 0);
    }
}
