//! Application state for the script editor.

use std::{mem, net::SocketAddr};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::stream::StreamEvent;

/// Keep at most this many bytes of host output.
const LOG_LIMIT: usize = 256 * 1024;

/// Work the event loop performs on the connector on behalf of the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
    Execute(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Info(String),
    Error(String),
}

#[derive(Default)]
pub struct App {
    /// Script being edited.
    pub script: String,
    /// Host output received so far.
    pub log: String,
    pub status: Status,
    pub connected: bool,
    pub listen_addr: Option<SocketAddr>,
    pub command_endpoint: Option<SocketAddr>,
    pub should_exit: bool,
    pending: Vec<Action>,
}

impl App {
    pub fn new(command_endpoint: SocketAddr) -> Self {
        Self {
            command_endpoint: Some(command_endpoint),
            ..Self::default()
        }
    }

    /// Take all queued actions.
    pub fn take_actions(&mut self) -> Vec<Action> {
        mem::take(&mut self.pending)
    }

    pub fn handle_event(&mut self, event: &Event) {
        if let Event::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                self.handle_key(*key);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('o') => self.pending.push(Action::Connect),
                KeyCode::Char('d') => self.pending.push(Action::Disconnect),
                KeyCode::Char('e') => self.queue_execute(),
                KeyCode::Char('l') => self.log.clear(),
                KeyCode::Char('u') => self.script.clear(),
                KeyCode::Char('c' | 'q') => self.should_exit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_exit = true,
            KeyCode::Enter => self.script.push('\n'),
            KeyCode::Tab => self.script.push('\t'),
            KeyCode::Backspace => {
                self.script.pop();
            }
            KeyCode::Char(c) => self.script.push(c),
            _ => {}
        }
    }

    fn queue_execute(&mut self) {
        if self.script.trim().is_empty() {
            self.status = Status::Info("Nothing to execute".to_string());
            return;
        }
        self.pending.push(Action::Execute(self.script.clone()));
    }

    /// Apply an event from the stream listener.
    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Listening { endpoint } => {
                self.listen_addr = Some(endpoint);
                self.status = Status::Info(format!("Listening on {endpoint}"));
            }
            StreamEvent::Output(fragment) => self.append_log(&fragment.text()),
            StreamEvent::Closed { error: Some(error) } => {
                self.connected = false;
                self.listen_addr = None;
                self.status = Status::Error(format!("Listener failed: {error}"));
            }
            StreamEvent::Closed { error: None } => {}
        }
    }

    /// Record the outcome of an action performed by the event loop.
    pub fn complete(&mut self, action: &Action, result: Result<(), String>, connected: bool) {
        self.connected = connected;
        if !connected {
            self.listen_addr = None;
        }
        self.status = match (action, result) {
            (_, Err(e)) => Status::Error(e),
            (Action::Connect, Ok(())) => Status::Info("Connected".to_string()),
            (Action::Disconnect, Ok(())) => Status::Info("Disconnected".to_string()),
            (Action::Execute(script), Ok(())) => {
                Status::Info(format!("Sent {} bytes", script.len()))
            }
        };
    }

    fn append_log(&mut self, text: &str) {
        self.log.push_str(text);
        if self.log.len() > LOG_LIMIT {
            let mut cut = self.log.len() - LOG_LIMIT;
            while !self.log.is_char_boundary(cut) {
                cut += 1;
            }
            self.log.drain(..cut);
        }
    }
}
