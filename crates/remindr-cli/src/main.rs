mod commands;
mod config;
mod session;

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::info;

use remindr_core::delivery::{Deliverer, Notification, Notifier, run_delivery_loop};
use remindr_core::platform::{ConfiguredCapabilities, TimerScheduler};
use remindr_core::scheduler::{ReminderOutcome, ReminderScheduler};
use remindr_core::service::{EditEventRequest, NewEventRequest, SavedEvent};
use remindr_core::{AccountService, Clock, EventService, SystemClock};
use remindr_db::Database;
use remindr_types::ReminderKey;
use remindr_types::format::format_instant;

use crate::commands::Command;
use crate::config::Config;
use crate::session::Session;

/// Prints reminders to the terminal.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, _key: ReminderKey, notification: Notification) {
        println!("[{}] {}", notification.title, notification.body);
    }
}

struct App {
    config: Config,
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    capabilities: Arc<ConfiguredCapabilities>,
    timer: Arc<TimerScheduler>,
}

impl App {
    fn events(&self) -> EventService {
        let reminders = ReminderScheduler::new(self.timer.clone(), self.capabilities.clone());
        EventService::new(self.db.clone(), self.clock.clone(), reminders)
    }

    fn session(&self) -> Result<Session> {
        match session::load(&self.config.session_file)? {
            Some(s) => Ok(s),
            None => bail!("Not logged in. Run `remindr login <username> <password>` first."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remindr_cli=info,remindr_core=info,remindr_db=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = Config::from_env()?;
    let db = Arc::new(Database::open(&config.db_path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let capabilities = Arc::new(ConfiguredCapabilities::new(
        config.notifications,
        config.exact_reminders,
    ));
    let timer = Arc::new(TimerScheduler::new(clock.clone(), capabilities.clone()));

    let app = App {
        config,
        db,
        clock,
        capabilities,
        timer,
    };

    run(&app, command).await
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Register { username, password } => {
            let user = AccountService::new(app.db.clone()).register(&username, &password)?;
            println!("Account created for {}. You can now log in.", user.username);
        }
        Command::Login { username, password } => {
            let user = AccountService::new(app.db.clone()).login(&username, &password)?;
            println!("Welcome, {}!", user.username);
            session::save(&app.config.session_file, &Session::from(user))?;
        }
        Command::Logout => {
            if session::clear(&app.config.session_file)? {
                println!("Logged out.");
            } else {
                println!("No one is logged in.");
            }
        }
        Command::Add {
            name,
            date,
            time,
            remind,
        } => {
            let session = app.session()?;
            let saved = app.events().create(&NewEventRequest {
                user_id: session.user_id,
                name,
                date,
                time,
                reminder: remind,
            })?;
            println!("Event saved (#{}).", saved.event.id);
            report_reminder(&saved);
        }
        Command::List => {
            let session = app.session()?;
            let events = app.events().list(session.user_id)?;
            if events.is_empty() {
                println!("No events yet.");
            }
            for e in events {
                let bell = if e.reminder_requested { " (reminder)" } else { "" };
                println!("#{:<4} {}  {}{}", e.id, format_instant(e.occurs_at), e.name, bell);
            }
        }
        Command::Edit {
            id,
            name,
            date,
            time,
            remind,
        } => {
            let session = app.session()?;
            let saved = app.events().edit(&EditEventRequest {
                event_id: id,
                user_id: session.user_id,
                name,
                date,
                time,
                reminder: remind,
            })?;
            println!("Event #{} updated.", saved.event.id);
            report_reminder(&saved);
        }
        Command::Delete { id } => {
            let session = app.session()?;
            app.events().delete(id, session.user_id)?;
            println!("Event #{} deleted.", id);
        }
        Command::Watch => {
            let session = app.session()?;
            let events = Arc::new(app.events());
            events.sync_reminders(session.user_id)?;
            println!(
                "Watching {} reminder(s) for {}. Press Ctrl-C to stop.",
                app.timer.pending_count(),
                session.username
            );

            let deliverer = Arc::new(Deliverer::new(
                Arc::new(TerminalNotifier),
                app.capabilities.clone(),
            ));
            let task = tokio::spawn(run_delivery_loop(
                events,
                session.user_id,
                app.timer.clone(),
                app.clock.clone(),
                deliverer,
                app.config.poll_secs,
            ));

            tokio::signal::ctrl_c().await?;
            task.abort();
            info!("Watch stopped");
        }
    }

    Ok(())
}

fn report_reminder(saved: &SavedEvent) {
    match &saved.reminder {
        Some(ReminderOutcome::Scheduled(_)) => println!(
            "Reminder set for {} at {}.",
            saved.event.date_text(),
            saved.event.time_text()
        ),
        Some(ReminderOutcome::PermissionDenied(kind)) => println!(
            "Permission to {} was denied; the event was saved without a reminder.",
            kind
        ),
        Some(ReminderOutcome::Failed(e)) => {
            println!("{}. The event was saved without a reminder.", e)
        }
        None => {}
    }
}
