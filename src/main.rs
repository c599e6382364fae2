// main.rs

mod api;
mod app;
mod config;
mod error;
mod forms;
mod models;
mod paginator;
mod route;
mod search;
mod store;
#[cfg(test)]
mod testing;
mod token;
mod ui;

use crate::api::HttpBackend;
use crate::app::{App, Settings};
use crate::config::Config;
use crate::store::AppStore;
use crate::token::TokenStore;
use crate::ui::run_app;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

// Logs go to a file, the terminal belongs to the UI
fn setup_tracing(log_dir: &Path) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    if fs::create_dir_all(log_dir).is_err() {
        return;
    }
    let log_path = log_dir.join("taskboard.log");
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskboard=info"));

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    setup_tracing(&config.log_dir);
    info!(api_url = %config.api_url, "starting");

    let tokens = TokenStore::new(config.token_path.clone());
    let backend = Arc::new(HttpBackend::new(&config.api_url, tokens.clone()));
    let store = AppStore::new(backend, tokens);
    let settings = Settings {
        search_debounce: config.search_debounce,
        toast_duration: config.toast_duration,
    };

    let mut app = App::new(store, settings);
    app.start().await;

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "ui loop failed");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
