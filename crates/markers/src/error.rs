/// Construction and configuration failures of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidConfig(String),
    Config(String),
    UnknownClusteringStrategy(String),
    UnknownVisibilityStrategy(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidConfig(msg) => write!(f, "invalid engine config: {msg}"),
            EngineError::Config(msg) => write!(f, "failed to decode engine config: {msg}"),
            EngineError::UnknownClusteringStrategy(name) => {
                write!(f, "unknown clustering strategy: {name}")
            }
            EngineError::UnknownVisibilityStrategy(name) => {
                write!(f, "unknown visibility strategy: {name}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Why an entity could not be turned into a marker.
///
/// Reported through the observer bus; never returned to the host.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CreateFailure {
    MissingPosition,
    InvalidPosition { lat: f64, lng: f64 },
}

impl std::fmt::Display for CreateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateFailure::MissingPosition => write!(f, "entity has no position"),
            CreateFailure::InvalidPosition { lat, lng } => {
                write!(f, "entity position out of range: lat={lat} lng={lng}")
            }
        }
    }
}

impl std::error::Error for CreateFailure {}

/// Why `update()` did nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// `dispose()` already ran.
    Disposed,
    /// The host map has not produced bounds or a usable zoom yet.
    ViewportUnavailable,
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotReadyReason::Disposed => write!(f, "engine disposed"),
            NotReadyReason::ViewportUnavailable => write!(f, "map viewport not available yet"),
        }
    }
}
