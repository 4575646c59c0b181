//! Watch command - hosts a session monitor in the terminal.
//!
//! Every line read from stdin counts as a key press. Two lines are treated
//! as commands instead: `extend` asks for a session extension and `status`
//! prints the remaining time.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use console::Style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use curbside_session::{
    ActivityEvent, AuthProvider, FileStore, FnListener, MemoryStore, STATE_FILE, SessionConfig,
    SessionMonitor, SharedActivityStore,
};

use super::Context;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Activity state file (default: <config dir>/session-state.json)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Keep the persisted idle time instead of starting a fresh sign-in
    #[arg(long)]
    pub resume: bool,

    /// Override the idle timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Override the warning lead in seconds
    #[arg(long)]
    pub warning_lead_secs: Option<u64>,

    /// Override the check interval in seconds
    #[arg(long)]
    pub check_interval_secs: Option<u64>,
}

/// Auth collaborator for a terminal session: signing out only flips a flag.
#[derive(Debug)]
struct TerminalAuth {
    signed_in: AtomicBool,
}

#[async_trait]
impl AuthProvider for TerminalAuth {
    async fn sign_out(&self) -> curbside_session::Result<()> {
        self.signed_in.store(false, Ordering::SeqCst);
        info!("Signed out");
        Ok(())
    }

    async fn refresh_credential(&self) -> curbside_session::Result<()> {
        if self.signed_in.load(Ordering::SeqCst) {
            info!("Credential refreshed");
            Ok(())
        } else {
            Err(curbside_session::Error::Auth("not signed in".to_string()))
        }
    }
}

/// Monitor callbacks forwarded to the command loop.
enum WatchEvent {
    Warning(Duration),
    TimedOut,
    Redirect(String),
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let mut section = ctx.load_config()?.config.session();
    if let Some(secs) = args.timeout_secs {
        section.timeout_secs = secs;
    }
    if let Some(secs) = args.warning_lead_secs {
        section.warning_lead_secs = secs;
    }
    if let Some(secs) = args.check_interval_secs {
        section.check_interval_secs = secs;
    }
    let config = SessionConfig::from_provider(&section);

    let store: SharedActivityStore = match args
        .state_file
        .clone()
        .or_else(|| ctx.config_dir.as_ref().map(|d| d.join(STATE_FILE)))
    {
        Some(path) => Arc::new(FileStore::with_path(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let auth = Arc::new(TerminalAuth {
        signed_in: AtomicBool::new(true),
    });

    let monitor = SessionMonitor::new(config.clone(), store, auth)?;
    if !args.resume {
        monitor.record_activity();
    }

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (warn_tx, timeout_tx, redirect_tx) = (event_tx.clone(), event_tx.clone(), event_tx);
    let listener = FnListener::new()
        .on_warning(move |remaining| {
            let _ = warn_tx.send(WatchEvent::Warning(remaining));
        })
        .on_timeout(move || {
            let _ = timeout_tx.send(WatchEvent::TimedOut);
        })
        .on_redirect(move |target| {
            let _ = redirect_tx.send(WatchEvent::Redirect(target.to_url()));
        });
    monitor.init(Arc::new(listener))?;

    let (activity_tx, activity_rx) = futures::channel::mpsc::unbounded();
    monitor.attach_source(activity_rx)?;

    let out = Output {
        json: ctx.json_output,
    };
    if !ctx.json_output {
        println!(
            "Watching session: timeout {}s, warning {}s before.",
            config.timeout.as_secs(),
            config.warning_lead.as_secs()
        );
        println!("Type to stay active, 'extend' to extend, 'status' for remaining time.");
    }
    out.status(&monitor);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match line.trim() {
                    "extend" => {
                        let extended = monitor.extend_session().await;
                        out.extended(extended);
                    }
                    "status" => out.status(&monitor),
                    _ => {
                        let _ = activity_tx.unbounded_send(ActivityEvent::KeyDown);
                    }
                },
                None => stdin_open = false,
            },
            Some(event) = events.recv() => match event {
                WatchEvent::Warning(remaining) => out.warning(remaining),
                WatchEvent::TimedOut => out.timed_out(),
                WatchEvent::Redirect(url) => {
                    out.redirect(&url);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.cleanup();
    Ok(())
}

/// Terminal or JSON-lines rendering of watch events.
struct Output {
    json: bool,
}

impl Output {
    fn emit(&self, value: serde_json::Value) {
        println!("{}", value);
    }

    fn status(&self, monitor: &SessionMonitor) {
        let state = monitor.state();
        let remaining = monitor.remaining_time().as_secs();
        if self.json {
            self.emit(serde_json::json!({
                "event": "status",
                "state": state.to_string(),
                "remaining_secs": remaining,
            }));
        } else {
            let dim = Style::new().dim();
            println!("  {} {} ({}s left)", dim.apply_to("Session:"), state, remaining);
        }
    }

    fn extended(&self, extended: bool) {
        if self.json {
            self.emit(serde_json::json!({ "event": "extend", "ok": extended }));
        } else if extended {
            println!("{}", Style::new().green().apply_to("Session extended"));
        } else {
            println!("{}", Style::new().red().apply_to("Could not extend session"));
        }
    }

    fn warning(&self, remaining: Duration) {
        if self.json {
            self.emit(serde_json::json!({
                "event": "warning",
                "remaining_secs": remaining.as_secs(),
            }));
        } else {
            println!(
                "{}",
                Style::new().yellow().apply_to(format!(
                    "Session expires in {}s. Type 'extend' to stay signed in.",
                    remaining.as_secs()
                ))
            );
        }
    }

    fn timed_out(&self) {
        if self.json {
            self.emit(serde_json::json!({ "event": "timeout" }));
        } else {
            println!("{}", Style::new().red().apply_to("Session timed out"));
        }
    }

    fn redirect(&self, url: &str) {
        if self.json {
            self.emit(serde_json::json!({ "event": "redirect", "url": url }));
        } else {
            println!("Redirecting to {}", url);
        }
    }
}
