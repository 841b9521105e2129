use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_RADIUS_METERS: f64 = 100.0;
pub const DEFAULT_NOTIFICATION_MESSAGE: &str = "Vamos pôr as mãos ao trabalho!";

fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}

fn default_true() -> bool {
    true
}

fn default_message() -> String {
    DEFAULT_NOTIFICATION_MESSAGE.to_string()
}

/// A named circular region the user wants to focus in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusZone {
    /// Absent until the zone store has created the record.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_message")]
    pub notification_message: String,
}

impl FocusZone {
    /// New, unsaved zone with default radius, message and `enabled = true`.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            address: address.into(),
            latitude,
            longitude,
            radius_meters: DEFAULT_RADIUS_METERS,
            enabled: true,
            notification_message: DEFAULT_NOTIFICATION_MESSAGE.to_string(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.notification_message = message.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check every field constraint. Runs before any store or platform call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if self.address.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "address" });
        }
        check_range("latitude", self.latitude, -90.0, 90.0)?;
        check_range("longitude", self.longitude, -180.0, 180.0)?;
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err(ValidationError::NonPositive {
                field: "radius_meters",
                value: self.radius_meters,
            });
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails the contains check too.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Platform transition reported for a monitored region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionTransition {
    Enter,
    Exit,
    Dwell,
}

impl std::str::FromStr for RegionTransition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enter" => Ok(RegionTransition::Enter),
            "exit" => Ok(RegionTransition::Exit),
            "dwell" => Ok(RegionTransition::Dwell),
            other => Err(format!("unknown transition '{other}' (expected enter|exit|dwell)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> FocusZone {
        FocusZone::new("Library", "Rua da Biblioteca 1", 38.7, -9.1)
    }

    #[test]
    fn defaults() {
        let z = library();
        assert_eq!(z.radius_meters, 100.0);
        assert!(z.enabled);
        assert_eq!(z.notification_message, "Vamos pôr as mãos ao trabalho!");
        assert!(z.validate().is_ok());
    }

    #[test]
    fn rejects_blank_name_and_address() {
        let mut z = library();
        z.name = "  ".into();
        assert_eq!(z.validate(), Err(ValidationError::EmptyField { field: "name" }));

        let mut z = library();
        z.address.clear();
        assert_eq!(z.validate(), Err(ValidationError::EmptyField { field: "address" }));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut z = library();
        z.latitude = 91.0;
        assert!(matches!(
            z.validate(),
            Err(ValidationError::OutOfRange { field: "latitude", .. })
        ));

        let mut z = library();
        z.longitude = f64::NAN;
        assert!(matches!(
            z.validate(),
            Err(ValidationError::OutOfRange { field: "longitude", .. })
        ));
    }

    #[test]
    fn rejects_non_positive_radius() {
        assert!(matches!(
            library().with_radius(0.0).validate(),
            Err(ValidationError::NonPositive { field: "radius_meters", .. })
        ));
        assert!(library().with_radius(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn deserialize_fills_defaults() {
        let z: FocusZone = serde_json::from_str(
            r#"{"name":"Cafe","address":"Main St","latitude":1.0,"longitude":2.0}"#,
        )
        .unwrap();
        assert_eq!(z.id, None);
        assert_eq!(z.radius_meters, DEFAULT_RADIUS_METERS);
        assert!(z.enabled);
    }

    #[test]
    fn parses_transitions() {
        assert_eq!("Enter".parse::<RegionTransition>(), Ok(RegionTransition::Enter));
        assert!("teleport".parse::<RegionTransition>().is_err());
    }
}
