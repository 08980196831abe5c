use fallwatch_traits::SensorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c error: {0}")]
    Bus(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("identity mismatch: got 0x{got:02X}, expected 0x{expected:02X}")]
    IdentityMismatch { got: u8, expected: u8 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

/// Bus-level failures are retried by the loop; a part that answers with the
/// wrong identity is not the part we were configured for.
impl From<HwError> for SensorError {
    fn from(e: HwError) -> Self {
        match e {
            HwError::IdentityMismatch { .. } => SensorError::Fatal(e.to_string()),
            other => SensorError::Transient(other.to_string()),
        }
    }
}
