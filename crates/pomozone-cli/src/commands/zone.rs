use clap::Subcommand;
use pomozone_core::storage::Database;
use pomozone_core::zone::{
    FocusZone, FocusZoneMonitor, MonitoredRegion, MonitoredRegionSet, RegionTransition,
    SimulatedLocationService, ZoneRegistry,
};
use pomozone_core::{zone_event_channel, Config, Event, NotificationDispatcher, NotificationSink};
use std::sync::Arc;

/// Regions registered with the simulated location service, kept between runs.
const REGIONS_KEY: &str = "monitored_regions";

#[derive(Subcommand)]
pub enum ZoneAction {
    /// Add a focus zone and start monitoring it
    Add {
        /// Zone name
        name: String,
        /// Street address
        #[arg(long)]
        address: String,
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Radius in meters (defaults to zones.default_radius_meters)
        #[arg(long)]
        radius: Option<f64>,
        /// Message shown on entry (defaults to zones.default_message)
        #[arg(long)]
        message: Option<String>,
        /// Save the zone without monitoring it
        #[arg(long)]
        disabled: bool,
    },
    /// List zones
    List,
    /// Print the monitored region set
    Monitored,
    /// Enable monitoring for a zone
    Enable { id: String },
    /// Disable monitoring for a zone
    Disable { id: String },
    /// Delete a zone
    Remove { id: String },
    /// Rebuild the monitored set from the zone list
    Reconcile {
        /// Simulate a missing location permission
        #[arg(long)]
        permission_denied: bool,
    },
    /// Feed a platform transition (enter, exit, dwell) for a zone
    Event {
        id: String,
        transition: RegionTransition,
    },
}

/// Prints each notification as a JSON line.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn notify(&self, title: &str, message: &str) {
        let line = serde_json::json!({
            "type": "notification",
            "title": title,
            "message": message,
        });
        println!("{line}");
    }
}

fn load_regions(db: &Database) -> Result<Vec<MonitoredRegion>, Box<dyn std::error::Error>> {
    let regions = match db.kv_get(REGIONS_KEY)? {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable region set");
            Vec::new()
        }),
        None => Vec::new(),
    };
    Ok(regions)
}

fn save_regions(
    db: &Database,
    location: &SimulatedLocationService,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(&location.registered())?;
    db.kv_set(REGIONS_KEY, &json)?;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: ZoneAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;

    let registered = load_regions(&db)?;
    let location = Arc::new(SimulatedLocationService::with_regions(
        config.zones.region_limit,
        registered.clone(),
    ));
    let (tx, rx) = zone_event_channel();
    let monitor = FocusZoneMonitor::new(Arc::clone(&location))
        .with_regions(MonitoredRegionSet::from_regions(registered))
        .with_policy(config.zones.policy())
        .with_events(tx);
    let registry = ZoneRegistry::new(&db, Arc::new(monitor));
    let mut dispatcher =
        NotificationDispatcher::new(rx, StdoutSink).enabled(config.notifications.enabled);

    let result = dispatch(action, &registry, &location, &config);

    // The platform side is only saved here, so a failed reconcile still
    // records what actually got registered.
    save_regions(&db, &location)?;
    dispatcher.drain();
    result
}

fn dispatch(
    action: ZoneAction,
    registry: &ZoneRegistry<&Database, Arc<SimulatedLocationService>>,
    location: &SimulatedLocationService,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ZoneAction::Add {
            name,
            address,
            lat,
            lon,
            radius,
            message,
            disabled,
        } => {
            let mut zone = FocusZone::new(name, address, lat, lon)
                .with_radius(radius.unwrap_or(config.zones.default_radius_meters))
                .with_message(message.unwrap_or_else(|| config.zones.default_message.clone()));
            if disabled {
                zone = zone.disabled();
            }
            let (saved, event) = registry.add_zone(zone)?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
            print_event(&event)?;
        }
        ZoneAction::List => {
            println!("{}", serde_json::to_string_pretty(&registry.zones()?)?);
        }
        ZoneAction::Monitored => {
            println!("{}", serde_json::to_string_pretty(&registry.monitor().monitored())?);
        }
        ZoneAction::Enable { id } => {
            let (_, event) = registry.set_enabled(&id, true)?;
            print_event(&event)?;
        }
        ZoneAction::Disable { id } => {
            let (_, event) = registry.set_enabled(&id, false)?;
            print_event(&event)?;
        }
        ZoneAction::Remove { id } => {
            print_event(&registry.delete_zone(&id)?)?;
        }
        ZoneAction::Reconcile { permission_denied } => {
            if permission_denied {
                location.set_permission(false);
            }
            print_event(&registry.refresh()?)?;
        }
        ZoneAction::Event { id, transition } => {
            print_event(&registry.monitor().on_region_event(&id, transition))?;
        }
    }
    Ok(())
}
