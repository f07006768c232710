//! Control panel state and actions for the `netrelay-panel` client.
//!
//! The panel mirrors the last relay status fetched from the server. It is not
//! authoritative: a toggle sends the negation of the mirrored state without
//! reading it back first.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use colored::Colorize;
use parking_lot::Mutex;

use crate::api::StatusResponse;
use crate::client::{Command, RelayClient};

const TITLE: &str = "Network Relay Controller";
const LED: &str = "●";

/// Display handle for one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub relay_id: u32,
    pub on: bool,
}

impl Indicator {
    pub fn render(&self) -> String {
        let led = if self.on { LED.green() } else { LED.red() };
        format!("Relay {}: {}  [t {}]", self.relay_id, led.bold(), self.relay_id)
    }
}

#[derive(Debug, Clone)]
pub struct PanelState {
    pub header: String,
    pub connection: String,
    pub status_line: String,
    pub connected: bool,
    pub version: String,
    indicators: BTreeMap<u32, Indicator>,
}

impl PanelState {
    fn new(base: &str, relay_count: u32) -> Self {
        let indicators = (1..=relay_count)
            .map(|relay_id| (relay_id, Indicator { relay_id, on: false }))
            .collect();

        Self {
            header: TITLE.to_string(),
            connection: format!("Connected to: {base}"),
            status_line: "Status: Disconnected".to_string(),
            connected: false,
            version: "Unknown".to_string(),
            indicators,
        }
    }

    pub fn indicator(&self, relay_id: u32) -> Option<&Indicator> {
        self.indicators.get(&relay_id)
    }

    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.values()
    }

    fn apply_status(&mut self, status: &StatusResponse) {
        for relay in &status.relays {
            // relays without an indicator are not shown
            if let Some(indicator) = self.indicators.get_mut(&relay.id) {
                indicator.on = relay.state.is_on();
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.header.bold());
        let _ = writeln!(out, "{}", self.connection);
        let _ = writeln!(out, "{}", "-".repeat(40));
        let _ = writeln!(out, "[on] All ON   [off] All OFF   [s] Get Status   [q] Quit");
        for indicator in self.indicators.values() {
            let _ = writeln!(out, "{}", indicator.render());
        }
        let _ = writeln!(out, "{}", self.status_line);
        out
    }
}

/// A user action on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCommand {
    Toggle(u32),
    AllOn,
    AllOff,
    Refresh,
    Quit,
}

impl FromStr for PanelCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("t" | "toggle"), Some(id)) => id
                .parse()
                .map(PanelCommand::Toggle)
                .map_err(|_| format!("not a relay id: {id}"))?,
            (Some("on"), None) => PanelCommand::AllOn,
            (Some("off"), None) => PanelCommand::AllOff,
            (Some("s" | "status"), None) => PanelCommand::Refresh,
            (Some("q" | "quit"), None) => PanelCommand::Quit,
            _ => return Err(format!("unknown command: {}", s.trim())),
        };
        if words.next().is_some() {
            return Err(format!("unexpected arguments: {}", s.trim()));
        }

        Ok(command)
    }
}

pub type Repaint = Arc<dyn Fn(&PanelState) + Send + Sync>;

#[derive(Clone)]
pub struct ControlPanel {
    client: RelayClient,
    state: Arc<Mutex<PanelState>>,
    repaint: Repaint,
}

impl ControlPanel {
    /// Builds one indicator per relay ID in `1..=relay_count`.
    pub fn new(client: RelayClient, relay_count: u32, repaint: Repaint) -> Self {
        let base = client
            .base_url()
            .trim_start_matches("http://")
            .to_string();
        let state = PanelState::new(&base, relay_count);

        Self {
            client,
            state: Arc::new(Mutex::new(state)),
            repaint,
        }
    }

    pub fn snapshot(&self) -> PanelState {
        self.state.lock().clone()
    }

    fn update(&self, f: impl FnOnce(&mut PanelState)) {
        let mut state = self.state.lock();
        f(&mut *state);
        (self.repaint)(&*state);
    }

    fn set_status(&self, line: impl Into<String>) {
        let line = line.into();
        self.update(|state| state.status_line = line);
    }

    fn handle_error(&self, message: String) {
        self.update(|state| {
            state.status_line = format!("Error: {message}");
            state.connected = false;
        });
    }

    /// Checks the server on a background thread: health, then version, then status.
    pub fn start(&self) -> JoinHandle<()> {
        self.set_status("Status: Connecting...");
        let panel = self.clone();
        thread::spawn(move || panel.connect())
    }

    fn connect(&self) {
        if !self.client.health() {
            self.set_status("Status: Connection Failed");
            return;
        }

        self.fetch_version();
        self.refresh();
        self.update(|state| {
            state.connected = true;
            state.status_line = "Status: Connected ✓".to_string();
        });
    }

    pub fn fetch_version(&self) {
        match self.client.version() {
            Ok(Some(info)) => self.update(|state| {
                state.header = format!("{TITLE} - v{}", info.version);
                state.version = info.version;
            }),
            Ok(None) => {}
            Err(e) => self.handle_error(format!("Version check failed: {e:#}")),
        }
    }

    pub fn refresh(&self) {
        match self.client.status() {
            Ok(Some(status)) => self.update(|state| {
                state.apply_status(&status);
                state.status_line = "Status: Updated successfully".to_string();
            }),
            Ok(None) => self.set_status("Status: Failed to get relay status"),
            Err(e) => self.handle_error(format!("{e:#}")),
        }
    }

    pub fn toggle(&self, relay_id: u32) {
        let cached = self
            .state
            .lock()
            .indicator(relay_id)
            .map(|indicator| indicator.on)
            .unwrap_or(false);
        let command = Command::toggling(cached);

        match self.client.switch(relay_id, command) {
            Ok(true) => self.refresh(),
            Ok(false) => self.set_status(format!("Status: Failed to {command} relay {relay_id}")),
            Err(e) => self.handle_error(format!("{e:#}")),
        }
    }

    pub fn all_on(&self) {
        self.switch_all(Command::On);
    }

    pub fn all_off(&self) {
        self.switch_all(Command::Off);
    }

    fn switch_all(&self, command: Command) {
        match self.client.switch_all(command) {
            Ok(true) => self.refresh(),
            Ok(false) => self.set_status(format!("Status: Failed to turn all relays {command}")),
            Err(e) => self.handle_error(format!("{e:#}")),
        }
    }

    /// Runs a user action; returns false on `Quit`.
    pub fn execute(&self, command: PanelCommand) -> bool {
        match command {
            PanelCommand::Toggle(relay_id) => self.toggle(relay_id),
            PanelCommand::AllOn => self.all_on(),
            PanelCommand::AllOff => self.all_off(),
            PanelCommand::Refresh => self.refresh(),
            PanelCommand::Quit => return false,
        }
        true
    }
}
