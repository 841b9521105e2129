use clap::Subcommand;
use pomozone_core::storage::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Completed sessions that ended today (UTC)
    Today,
    /// Completed sessions of all time
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = match action {
        StatsAction::Today => db.stats_today()?,
        StatsAction::All => db.stats_all()?,
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
