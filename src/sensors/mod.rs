//! Platen temperature sensing.

pub mod thermocouple;

use serde::{Deserialize, Serialize};

use crate::error::Device;
use crate::pins;

/// One of the two heated platens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platen {
    Top,
    Bottom,
}

impl Platen {
    pub const fn sensor_addr(self) -> u8 {
        match self {
            Self::Top => pins::TOP_SENSOR_ADDR,
            Self::Bottom => pins::BOTTOM_SENSOR_ADDR,
        }
    }

    pub const fn heater_relay(self) -> u8 {
        match self {
            Self::Top => pins::RELAY_TOP_HEATER,
            Self::Bottom => pins::RELAY_BOTTOM_HEATER,
        }
    }

    pub const fn device(self) -> Device {
        match self {
            Self::Top => Device::TopSensor,
            Self::Bottom => Device::BottomSensor,
        }
    }
}
