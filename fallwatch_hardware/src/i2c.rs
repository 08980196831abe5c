//! Linux I2C burst reader and data-ready line (Raspberry Pi, via rppal).
//!
//! Only the data path lives here: identity probe, 12-byte accel+gyro burst,
//! and the wait on the interrupt line. Part-specific register programming
//! (ranges, output data rate, interrupt routing) is expected to be done
//! before the engine starts.

use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, Trigger};
use rppal::i2c::I2c;

use fallwatch_config::SensorCfg;
use fallwatch_traits::clock::Clock;
use fallwatch_traits::{ImuSource, Sample, SensorError};

use crate::RegisterLayout;
use crate::acquisition::{Acquisition, open_data_ready};
use crate::error::{HwError, Result};
use crate::util::decode_burst;

fn bus_err(e: rppal::i2c::Error) -> HwError {
    HwError::Bus(e.to_string())
}

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Interrupt output of the IMU, active-low and pulsed once per sample.
/// Falling edges are captured by the kernel, so a pulse shorter than the
/// processing time of the previous sample is not lost.
pub struct DataReadyLine {
    pin: InputPin,
}

impl DataReadyLine {
    pub fn open(bcm_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut pin = gpio.get(bcm_pin).map_err(gpio_err)?.into_input_pullup();
        pin.set_interrupt(Trigger::FallingEdge).map_err(gpio_err)?;
        tracing::info!(pin = bcm_pin, "data-ready line ready");
        Ok(Self { pin })
    }

    /// `Ok(false)` when no falling edge arrived within `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool> {
        // Pending edges are kept: one may have fired while the last sample was processed.
        let edge = self
            .pin
            .poll_interrupt(false, Some(timeout))
            .map_err(gpio_err)?;
        Ok(edge.is_some())
    }
}

pub struct I2cImu<C: Clock> {
    i2c: I2c,
    bus: u8,
    address: u16,
    layout: RegisterLayout,
    drdy: Option<DataReadyLine>,
    acquisition: Acquisition,
    clock: C,
}

impl<C: Clock> I2cImu<C> {
    /// Open the bus, check the part's identity and, in interrupt mode, the
    /// data-ready line. Without a usable line the reader runs unpaced; see
    /// [`I2cImu::acquisition`].
    pub fn open(cfg: &SensorCfg, clock: C) -> Result<Self> {
        let i2c = Self::open_bus(cfg.i2c_bus, cfg.i2c_address)?;
        let (acquisition, drdy) = open_data_ready(cfg.mode, || DataReadyLine::open(cfg.drdy_pin));
        let mut imu = Self {
            i2c,
            bus: cfg.i2c_bus,
            address: cfg.i2c_address,
            layout: RegisterLayout::from(cfg),
            drdy,
            acquisition,
            clock,
        };
        imu.verify_identity()?;
        tracing::info!(
            bus = cfg.i2c_bus,
            address = cfg.i2c_address,
            who_am_i = imu.layout.who_am_i_expected,
            mode = acquisition.as_str(),
            "IMU detected"
        );
        Ok(imu)
    }

    /// `Polling` means reads return immediately and must be paced by the caller.
    pub fn acquisition(&self) -> Acquisition {
        self.acquisition
    }

    fn open_bus(bus: u8, address: u16) -> Result<I2c> {
        let mut i2c = I2c::with_bus(bus).map_err(bus_err)?;
        i2c.set_slave_address(address).map_err(bus_err)?;
        Ok(i2c)
    }

    fn verify_identity(&mut self) -> Result<()> {
        let got = self
            .i2c
            .smbus_read_byte(self.layout.who_am_i_register)
            .map_err(bus_err)?;
        if got != self.layout.who_am_i_expected {
            return Err(HwError::IdentityMismatch {
                got,
                expected: self.layout.who_am_i_expected,
            });
        }
        Ok(())
    }

    fn read_burst(&mut self) -> Result<([f32; 3], [f32; 3])> {
        let mut raw = [0u8; 12];
        self.i2c
            .block_read(self.layout.data_register, &mut raw)
            .map_err(bus_err)?;
        Ok(decode_burst(
            &raw,
            self.layout.accel_lsb_per_g,
            self.layout.gyro_lsb_per_dps,
        ))
    }
}

impl<C: Clock> ImuSource for I2cImu<C> {
    fn read(&mut self, timeout: Duration) -> std::result::Result<Option<Sample>, SensorError> {
        if let Some(line) = self.drdy.as_mut()
            && !line.wait(timeout)?
        {
            return Ok(None);
        }
        let t = self.clock.now();
        let (accel, gyro) = self.read_burst()?;
        Ok(Some(Sample::new(accel, gyro, t)))
    }

    fn is_healthy(&mut self) -> bool {
        match self.verify_identity() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "IMU identity probe failed");
                false
            }
        }
    }

    fn reinit(&mut self) -> std::result::Result<(), SensorError> {
        self.i2c = Self::open_bus(self.bus, self.address)?;
        self.verify_identity()?;
        tracing::info!(bus = self.bus, address = self.address, "IMU bus reopened");
        Ok(())
    }
}
