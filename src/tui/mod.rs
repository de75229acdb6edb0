//! Terminal script editor: edit a script, send it to the host, watch the
//! host's output.

pub mod app;
mod ui;

use std::io::{stdout, Stdout};

use app::{Action, App};
use crossterm::{
    event::EventStream,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::{config::Config, connector::Connector, error::Result, stream::StreamEvent};

pub async fn run(config: &Config) -> Result<()> {
    let (mut connector, stream_rx) = Connector::new(config);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(config.command_endpoint);
    let result = event_loop(&mut terminal, &mut app, &mut connector, stream_rx).await;

    // Always release the stream endpoint, even after a UI error.
    if let Err(e) = connector.cleanup().await {
        tracing::warn!("Cleanup failed: {e}");
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    connector: &mut Connector,
    mut stream_rx: mpsc::Receiver<StreamEvent>,
) -> Result<()> {
    let mut event_stream = EventStream::new();

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Listener output is applied here, on the UI task, never from the
        // listener's own task.
        tokio::select! {
            Some(event) = stream_rx.recv() => {
                app.handle_stream_event(event);
            }
            Some(Ok(event)) = event_stream.next() => {
                app.handle_event(&event);
            }
            else => break,
        }

        for action in app.take_actions() {
            perform(connector, app, action).await;
        }
    }

    Ok(())
}

async fn perform(connector: &mut Connector, app: &mut App, action: Action) {
    let result = match &action {
        Action::Connect => connector.connect().await,
        Action::Disconnect => connector.disconnect().await,
        Action::Execute(script) => connector.execute(script).await,
    };
    if let Err(e) = &result {
        tracing::error!("{action:?} failed: {e}");
    }
    app.complete(
        &action,
        result.map_err(|e| e.to_string()),
        connector.is_connected(),
    );
}
