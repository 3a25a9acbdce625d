use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParkingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),
}
