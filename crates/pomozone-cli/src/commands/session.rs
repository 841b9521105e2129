use clap::Subcommand;
use pomozone_core::session::{BreakKind, FocusCycleState, FocusSessionEngine};
use pomozone_core::storage::Database;
use pomozone_core::{Config, Event};

const ENGINE_KEY: &str = "focus_cycle";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a work interval
    StartWork {
        /// Work length in minutes (clamped to 1-120); defaults to the configured length
        #[arg(long, allow_hyphen_values = true)]
        minutes: Option<i64>,
        /// Task to attach the session to
        #[arg(long)]
        task: Option<String>,
    },
    /// Start a break
    StartBreak {
        /// short (5 min) or long (15 min); defaults to the selected kind
        #[arg(long)]
        kind: Option<BreakKind>,
        /// Task to attach the session to
        #[arg(long)]
        task: Option<String>,
    },
    /// Complete the running session (a finished work interval starts a break)
    Complete,
    /// Print the engine state as JSON
    Status,
    /// Clear the "break finished" flag
    ResetFlag,
    /// Set the default work length (clamped to 1-120)
    SetMinutes {
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },
    /// Select the break kind used after a work interval
    SetBreakKind { kind: BreakKind },
    /// List recent sessions
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

/// Restore the cycle state, taking preferences from the config file.
///
/// A snapshot that no longer parses is replaced by the default state; a
/// failed read is an error so the running session is never overwritten.
fn load_state(
    db: &Database,
    config: &Config,
) -> Result<FocusCycleState, Box<dyn std::error::Error>> {
    let mut state = match db.kv_get(ENGINE_KEY)? {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable engine state");
            FocusCycleState::default()
        }),
        None => FocusCycleState::default(),
    };
    state.configured_work_minutes = config.session.work_minutes;
    state.selected_break_kind = config.session.break_kind;
    Ok(state)
}

fn save_state(db: &Database, state: &FocusCycleState) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(state)?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

fn print_events(events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(events)?);
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut config = Config::load()?;
    let mut engine = FocusSessionEngine::with_state(&db, load_state(&db, &config)?);

    // Persist whatever state the command leaves behind, even on failure.
    let result = dispatch(action, &db, &mut engine, &mut config);
    save_state(&db, &engine.into_state())?;
    result
}

fn dispatch(
    action: SessionAction,
    db: &Database,
    engine: &mut FocusSessionEngine<&Database>,
    config: &mut Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::StartWork { minutes, task } => {
            let event = engine.start_work(minutes, task)?;
            print_events(&[event])?;
        }
        SessionAction::StartBreak { kind, task } => {
            let kind = kind.unwrap_or(engine.selected_break_kind());
            let event = engine.start_break(kind, task)?;
            print_events(&[event])?;
        }
        SessionAction::Complete => {
            let events = engine.complete()?;
            print_events(&events)?;
        }
        SessionAction::Status => {
            println!("{}", serde_json::to_string_pretty(&engine.status())?);
        }
        SessionAction::ResetFlag => {
            engine.reset_completion_flag();
            println!("{}", serde_json::to_string_pretty(engine.state())?);
        }
        SessionAction::SetMinutes { minutes } => {
            let stored = engine.update_configured_work_minutes(minutes);
            config.session.work_minutes = stored;
            config.save()?;
            println!("{stored}");
        }
        SessionAction::SetBreakKind { kind } => {
            engine.select_break_kind(kind);
            config.session.break_kind = kind;
            config.save()?;
            println!("{}", serde_json::to_string_pretty(engine.state())?);
        }
        SessionAction::History { limit } => {
            let sessions = db.list_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
