//! IMU sources for the fall detector.
//!
//! - `SimulatedImu`: scripted scenarios, no hardware needed
//! - `ReplaySource`: recorded CSV traces for offline tuning
//! - `Paced`: polling-mode wrapper sleeping one tick before each read
//! - `I2cImu` / `DataReadyLine` (feature `hardware`): Raspberry Pi I2C + GPIO
pub mod acquisition;
pub mod error;
#[cfg(feature = "hardware")]
pub mod i2c;
pub mod paced;
pub mod replay;
pub mod sim;
pub mod util;

pub use acquisition::{Acquisition, open_data_ready, pace_if_polling};
pub use paced::Paced;
pub use replay::ReplaySource;
pub use sim::{Scenario, SimulatedImu};

#[cfg(feature = "hardware")]
pub use i2c::{DataReadyLine, I2cImu};

/// Where the accel+gyro data and identity live on the part, and how to scale
/// raw counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterLayout {
    pub data_register: u8,
    pub who_am_i_register: u8,
    pub who_am_i_expected: u8,
    pub accel_lsb_per_g: f32,
    pub gyro_lsb_per_dps: f32,
}

impl From<&fallwatch_config::SensorCfg> for RegisterLayout {
    fn from(c: &fallwatch_config::SensorCfg) -> Self {
        Self {
            data_register: c.data_register,
            who_am_i_register: c.who_am_i_register,
            who_am_i_expected: c.who_am_i_expected,
            accel_lsb_per_g: c.accel_lsb_per_g,
            gyro_lsb_per_dps: c.gyro_lsb_per_dps,
        }
    }
}

/// Whether this build can talk to real hardware.
pub const fn hardware_enabled() -> bool {
    cfg!(feature = "hardware")
}
