use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tracing::{error, info};

use torn_terminal::api::ApiClient;
use torn_terminal::config::DashboardConfig;
use torn_terminal::credentials::{CredentialName, CredentialStore};
use torn_terminal::http_client::build_client;
use torn_terminal::orchestrator::{Orchestrator, PageNav, not_configured};
use torn_terminal::state::{
    AppState, Delta, InputMode, ProviderCommand, Signal, Tab, apply_delta,
};
use torn_terminal::tabs::TabController;
use torn_terminal::ui::ui;
use torn_terminal::{logging, provider};

struct App {
    state: AppState,
    tabs: TabController,
    credentials: CredentialStore,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    /// Field value to restore when a credential edit is cancelled.
    editing_original: Option<String>,
}

impl App {
    fn new(
        config: &DashboardConfig,
        credentials: CredentialStore,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    ) -> Self {
        let orchestrator = Orchestrator::new(config, credentials.clone());
        Self {
            state: AppState::new(
                config.bounty_page_size,
                config.bounty_max_pages,
                config.target_page_size,
            ),
            tabs: TabController::new(orchestrator),
            credentials,
            should_quit: false,
            cmd_tx,
            editing_original: None,
        }
    }

    fn start(&mut self) {
        if self.credentials.is_configured(CredentialName::Primary) {
            self.state.push_log("[INFO] Resolving API key owner");
            let cmd = self.tabs.orchestrator_mut().resolve_identity(&mut self.state);
            self.send(cmd.into_iter().collect());
        } else {
            self.state.tab = Tab::Settings;
            self.state
                .set_notice(Tab::Player, not_configured(CredentialName::Primary));
            self.state
                .push_log("[WARN] API key not configured. Please enter your API key in the Settings tab.");
        }
    }

    fn send(&mut self, commands: Vec<ProviderCommand>) {
        if commands.is_empty() {
            return;
        }
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Fetch worker unavailable");
            return;
        };
        let mut failed = false;
        for cmd in commands {
            failed |= tx.send(cmd).is_err();
        }
        if failed {
            self.state.push_log("[WARN] Fetch request failed");
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.alert.take().is_some() {
            return;
        }
        if self.state.input_mode != InputMode::Normal {
            self.on_input_key(key);
            return;
        }
        let now = Instant::now();
        let commands = match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('?') => {
                self.state.help_overlay = !self.state.help_overlay;
                Vec::new()
            }
            KeyCode::Esc if self.state.help_overlay => {
                self.state.help_overlay = false;
                Vec::new()
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => match Tab::from_digit(ch) {
                Some(tab) => self.tabs.switch(tab, &mut self.state, now),
                None => Vec::new(),
            },
            KeyCode::Tab => self.tabs.next(&mut self.state, now),
            KeyCode::BackTab => self.tabs.prev(&mut self.state, now),
            KeyCode::Char('r') => {
                self.state.push_log(format!("[INFO] Refreshing {}", self.state.tab.label()));
                self.tabs.orchestrator_mut().refresh(&mut self.state)
            }
            KeyCode::Char('/') if self.state.tab == Tab::Player => {
                self.begin_input(InputMode::Search, self.state.subject_input.clone());
                Vec::new()
            }
            KeyCode::Char('f') if self.state.tab == Tab::FactionMap => {
                let current = self
                    .state
                    .faction_map_id
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                self.begin_input(InputMode::FactionId, current);
                Vec::new()
            }
            KeyCode::Char('n') | KeyCode::Right => self
                .tabs
                .orchestrator_mut()
                .navigate(PageNav::Next, &mut self.state),
            KeyCode::Char('p') | KeyCode::Left => self
                .tabs
                .orchestrator_mut()
                .navigate(PageNav::Prev, &mut self.state),
            KeyCode::Char('g') if matches!(self.state.tab, Tab::Bounties | Tab::Targets) => {
                self.begin_input(InputMode::PageJump, String::new());
                Vec::new()
            }
            KeyCode::Up | KeyCode::Down if self.state.tab == Tab::Settings => {
                self.state.settings.selected = match self.state.settings.selected {
                    CredentialName::Primary => CredentialName::Companion,
                    CredentialName::Companion => CredentialName::Primary,
                };
                Vec::new()
            }
            KeyCode::Enter if self.state.tab == Tab::Settings => {
                let name = self.state.settings.selected;
                let field = self.credentials.field(name);
                self.editing_original = Some(field.clone());
                self.state.settings.message = None;
                self.begin_input(InputMode::Credential(name), field);
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.send(commands);
    }

    fn begin_input(&mut self, mode: InputMode, initial: String) {
        self.state.input_mode = mode;
        self.state.input_buffer = initial;
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let mode = self.state.input_mode;
        match key.code {
            KeyCode::Esc => {
                if let (InputMode::Credential(name), Some(original)) =
                    (mode, self.editing_original.take())
                {
                    self.credentials.set_field(name, &original);
                }
                self.state.input_mode = InputMode::Normal;
                self.state.input_buffer.clear();
            }
            KeyCode::Enter => {
                self.state.input_mode = InputMode::Normal;
                let input = std::mem::take(&mut self.state.input_buffer);
                let commands = self.submit(mode, input);
                self.send(commands);
            }
            KeyCode::Backspace => {
                self.state.input_buffer.pop();
                self.sync_live_field(mode);
            }
            KeyCode::Char(ch) => {
                self.state.input_buffer.push(ch);
                self.sync_live_field(mode);
            }
            _ => {}
        }
    }

    /// The settings field is live: requests use it before it is saved.
    fn sync_live_field(&mut self, mode: InputMode) {
        if let InputMode::Credential(name) = mode {
            self.credentials.set_field(name, &self.state.input_buffer);
        }
    }

    fn submit(&mut self, mode: InputMode, input: String) -> Vec<ProviderCommand> {
        let orchestrator = self.tabs.orchestrator_mut();
        match mode {
            InputMode::Normal => Vec::new(),
            InputMode::Search => {
                self.state.subject_input = input.trim().to_string();
                orchestrator.lookup(&input, &mut self.state)
            }
            InputMode::PageJump => match input.trim().parse::<i64>() {
                Ok(page) => orchestrator.navigate(PageNav::Jump(page), &mut self.state),
                Err(_) => {
                    self.state.alert = Some(format!("Invalid page number: {}", input.trim()));
                    Vec::new()
                }
            },
            InputMode::FactionId => match input.trim().parse::<u64>() {
                Ok(id) if id > 0 => orchestrator.load_faction_map(id, &mut self.state),
                _ => {
                    self.state.alert = Some(format!(
                        "Invalid faction ID: {}. Faction ID must be a number.",
                        input.trim()
                    ));
                    Vec::new()
                }
            },
            InputMode::Credential(name) => {
                self.editing_original = None;
                self.save_credential(name, &input)
            }
        }
    }

    fn save_credential(&mut self, name: CredentialName, value: &str) -> Vec<ProviderCommand> {
        if let Err(err) = self.credentials.set(name, value) {
            error!(error = %err, "saving credential failed");
            self.state.settings.message = Some(format!("Could not save: {err:#}"));
            self.state.push_log(format!("[WARN] Saving {} failed", name.label()));
            return Vec::new();
        }
        let action = if value.trim().is_empty() { "cleared" } else { "saved" };
        self.state.settings.message = Some(format!("{} {action}", name.label()));
        self.state.push_log(format!("[INFO] {} {action}", name.label()));
        info!(credential = name.storage_key(), action, "credential updated");

        if name != CredentialName::Primary || self.state.identity_resolved {
            return Vec::new();
        }
        // A new primary key gets another shot at startup.
        self.state.fatal = None;
        let orchestrator = self.tabs.orchestrator_mut();
        orchestrator.resume();
        orchestrator
            .resolve_identity(&mut self.state)
            .into_iter()
            .collect()
    }

    fn on_delta(&mut self, delta: Delta) {
        let Some(signal) = apply_delta(&mut self.state, delta) else {
            return;
        };
        let now = Instant::now();
        let commands = match signal {
            Signal::IdentityReady => {
                let mut commands = self.tabs.orchestrator_mut().start_background(now);
                if self.state.tab == Tab::Settings {
                    commands.extend(self.tabs.switch(Tab::Player, &mut self.state, now));
                } else {
                    commands.extend(self.tabs.reactivate(&mut self.state, now));
                }
                commands
            }
            Signal::SubjectChanged if self.state.tab == Tab::Stocks => {
                self.tabs.reactivate(&mut self.state, now)
            }
            Signal::SubjectChanged => Vec::new(),
            Signal::Fatal => {
                self.tabs.orchestrator_mut().halt();
                error!(message = ?self.state.fatal, "identity resolution failed; polling halted");
                Vec::new()
            }
        };
        self.send(commands);
    }

    fn maybe_refresh(&mut self) {
        let commands = self
            .tabs
            .orchestrator_mut()
            .tick(&self.state, Instant::now());
        self.send(commands);
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let log_path = logging::init_file_logging();
    let config = DashboardConfig::from_env();
    let credentials = CredentialStore::open_default();
    let http = build_client(config.http_timeout)?;
    let api = ApiClient::new(http, &config, credentials.clone());

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    provider::spawn_provider(api, config.clone(), tx, cmd_rx);

    let mut app = App::new(&config, credentials, Some(cmd_tx));
    match &log_path {
        Ok(path) => app
            .state
            .push_log(format!("[INFO] Diagnostics in {}", path.display())),
        Err(err) => app.state.push_log(format!("[WARN] File logging off: {err:#}")),
    }
    app.start();

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            app.on_delta(delta);
        }

        app.maybe_refresh();

        terminal.draw(|f| ui(f, &app.state, &app.credentials))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
