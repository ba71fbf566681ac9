use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// A point on Earth. Construction validates the ranges, so every `Coordinate`
/// in the program is in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("coordinate ({latitude}, {longitude}) is out of range: latitude must be within [-90, 90] and longitude within [-180, 180]")]
pub struct InvalidCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = InvalidCoordinate;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        // NaN fails both range checks.
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Ok(Self { latitude, longitude })
        } else {
            Err(InvalidCoordinate { latitude, longitude })
        }
    }

    /// For compile-time constants known to be in range.
    pub(crate) const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Kelvin => "K",
        }
    }
}

/// A temperature reading in the unit the provider reported it in.
/// Conversions are computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    value: f64,
    unit: TemperatureUnit,
}

impl Temperature {
    pub fn new(value: f64, unit: TemperatureUnit) -> Self {
        Self { value, unit }
    }

    /// The value as reported, in [`Temperature::unit`].
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn celsius(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Celsius => self.value,
            TemperatureUnit::Fahrenheit => (self.value - 32.0) * 5.0 / 9.0,
            TemperatureUnit::Kelvin => self.value - 273.15,
        }
    }

    pub fn fahrenheit(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Fahrenheit => self.value,
            _ => self.celsius() * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn kelvin(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Kelvin => self.value,
            _ => self.celsius() + 273.15,
        }
    }

    pub fn in_unit(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.celsius(),
            TemperatureUnit::Fahrenheit => self.fahrenheit(),
            TemperatureUnit::Kelvin => self.kelvin(),
        }
    }
}

/// Unix seconds exactly as the weather service sent them.
///
/// The number is kept verbatim, so values chrono cannot represent (or
/// fractions finer than a nanosecond) are preserved. [`Epoch::to_datetime`]
/// is the checked conversion for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(Number);

impl Epoch {
    /// `None` for NaN and infinities, which JSON cannot carry anyway.
    pub fn from_f64(seconds: f64) -> Option<Self> {
        Number::from_f64(seconds).map(Self)
    }

    pub fn as_number(&self) -> &Number {
        &self.0
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }

    /// The instant this epoch names, rounded to the nanosecond. `None` when it
    /// lies outside chrono's range (roughly ±262,000 years).
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self.0.as_i64() {
            Some(secs) => DateTime::from_timestamp(secs, 0),
            None => self.0.as_f64().and_then(from_fractional_seconds),
        }
    }
}

impl From<i64> for Epoch {
    fn from(seconds: i64) -> Self {
        Self(Number::from(seconds))
    }
}

impl From<Number> for Epoch {
    fn from(number: Number) -> Self {
        Self(number)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn from_fractional_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let mut secs = whole as i64;
    let mut nanos = ((seconds - whole) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        secs = secs.checked_add(1)?;
        nanos = 0;
    }
    DateTime::from_timestamp(secs, nanos)
}

/// Current conditions at a location, as decoded from the weather service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    latitude: f64,
    longitude: f64,
    observed_at: Epoch,
    wind_speed: f64,
    temperature: Temperature,
    icon: String,
    summary: String,
}

impl WeatherObservation {
    pub fn new(
        latitude: f64,
        longitude: f64,
        observed_at: Epoch,
        wind_speed: f64,
        temperature: Temperature,
        icon: String,
        summary: String,
    ) -> Self {
        Self { latitude, longitude, observed_at, wind_speed, temperature, icon, summary }
    }

    /// Latitude echoed back by the service.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude echoed back by the service.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Observation time as the service reported it.
    pub fn observed_epoch(&self) -> &Epoch {
        &self.observed_at
    }

    /// Observation time as an instant, if chrono can represent it.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at.to_datetime()
    }

    pub fn wind_speed(&self) -> f64 {
        self.wind_speed
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    /// Provider condition code, e.g. `clear-day`.
    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Whether the service echoed back exactly the queried location.
    pub fn is_at(&self, coordinate: Coordinate) -> bool {
        self.latitude == coordinate.latitude() && self.longitude == coordinate.longitude()
    }

    /// One-line description, e.g. `21.3 °C, Wind: 4.2, Clear`.
    pub fn headline(&self, unit: TemperatureUnit) -> String {
        format!(
            "{:.1} {}, Wind: {}, {}",
            self.temperature.in_unit(unit),
            unit.symbol(),
            self.wind_speed,
            self.summary
        )
    }
}

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Device,
    Fallback,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Device => "device",
            LocationSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one location resolution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationResolution {
    pub coordinate: Coordinate,
    pub source: LocationSource,
}

impl LocationResolution {
    pub fn device(coordinate: Coordinate) -> Self {
        Self { coordinate, source: LocationSource::Device }
    }

    pub fn fallback(coordinate: Coordinate) -> Self {
        Self { coordinate, source: LocationSource::Fallback }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == LocationSource::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(temperature: Temperature) -> WeatherObservation {
        WeatherObservation::new(
            23.0,
            72.0,
            Epoch::from(1_598_000_000),
            4.2,
            temperature,
            "clear-day".into(),
            "Clear".into(),
        )
    }

    #[test]
    fn coordinate_accepts_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_nan() {
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.01).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn coordinate_deserialization_validates() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude": 12.5, "longitude": -3.25}"#).unwrap();
        assert_eq!(ok.latitude(), 12.5);
        assert_eq!(ok.longitude(), -3.25);

        let err = serde_json::from_str::<Coordinate>(r#"{"latitude": 123.0, "longitude": 0.0}"#);
        assert!(err.unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn temperature_conversions() {
        let freezing = Temperature::new(32.0, TemperatureUnit::Fahrenheit);
        assert!((freezing.celsius() - 0.0).abs() < 1e-9);
        assert!((freezing.kelvin() - 273.15).abs() < 1e-9);

        let boiling = Temperature::new(373.15, TemperatureUnit::Kelvin);
        assert!((boiling.celsius() - 100.0).abs() < 1e-9);
        assert!((boiling.fahrenheit() - 212.0).abs() < 1e-9);

        let mild = Temperature::new(20.0, TemperatureUnit::Celsius);
        assert_eq!(mild.in_unit(TemperatureUnit::Celsius), 20.0);
        assert!((mild.in_unit(TemperatureUnit::Fahrenheit) - 68.0).abs() < 1e-9);
    }

    #[test]
    fn headline_formats_in_requested_unit() {
        let obs = observation(Temperature::new(70.34, TemperatureUnit::Fahrenheit));
        assert_eq!(obs.headline(TemperatureUnit::Celsius), "21.3 °C, Wind: 4.2, Clear");
        assert_eq!(obs.headline(TemperatureUnit::Fahrenheit), "70.3 °F, Wind: 4.2, Clear");
    }

    #[test]
    fn epoch_converts_integral_fractional_and_negative_seconds() {
        assert_eq!(Epoch::from(1_598_083_200).to_datetime().unwrap().timestamp(), 1_598_083_200);
        assert_eq!(Epoch::from(-86_400).to_datetime().unwrap().timestamp(), -86_400);

        let half = Epoch::from_f64(1_598_083_200.5).unwrap().to_datetime().unwrap();
        assert_eq!(half.timestamp(), 1_598_083_200);
        assert_eq!(half.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn epoch_outside_chrono_range_has_no_datetime_but_keeps_its_value() {
        for seconds in [9e12, -9e12, 1e300] {
            let epoch = Epoch::from_f64(seconds).unwrap();
            assert_eq!(epoch.to_datetime(), None);
            assert_eq!(epoch.as_f64(), Some(seconds));
        }
        assert!(Epoch::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn epoch_serializes_as_the_bare_number() {
        let epoch = Epoch::from_f64(1e-10).unwrap();
        let json = serde_json::to_string(&epoch).unwrap();
        let back: Epoch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, epoch);
        assert_eq!(back.as_f64(), Some(1e-10));

        assert_eq!(serde_json::to_string(&Epoch::from(42)).unwrap(), "42");
    }

    #[test]
    fn is_at_compares_exactly() {
        let obs = observation(Temperature::new(70.0, TemperatureUnit::Fahrenheit));
        assert!(obs.is_at(Coordinate::new(23.0, 72.0).unwrap()));
        assert!(!obs.is_at(Coordinate::new(23.0, 72.000001).unwrap()));
    }
}
