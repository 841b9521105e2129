mod location;
mod model;
mod monitor;
mod registry;
mod store;

pub use location::{
    LocationService, MonitoredRegion, PlatformError, SimulatedLocationService,
    DEFAULT_REGION_LIMIT,
};
pub use model::{FocusZone, RegionTransition, DEFAULT_NOTIFICATION_MESSAGE, DEFAULT_RADIUS_METERS};
pub use monitor::{FocusZoneMonitor, MonitoredRegionSet, NotificationPolicy};
pub use registry::ZoneRegistry;
pub use store::ZoneStore;
