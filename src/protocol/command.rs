//! Command definitions
//!
//! Represents commands from clients. The discriminant of each variant is its
//! ASCII wire byte.

use std::fmt;

use crate::error::DecodeError;

/// Commands accepted by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Get ambient temperature
    GetTemperature = b't',

    /// Get ambient air relative humidity
    GetHumidity = b'h',

    /// Get light level
    GetLight = b'l',

    /// Get reservoir water level
    GetWater = b'w',

    /// Get soil moisture content (%)
    GetMoisture = b'm',

    /// Get liquid fertilizer level
    GetFertilizer = b'f',

    /// Dispense `qty` mL of water
    DispenseWater = b'W',

    /// Close the connection with the client
    Quit = b'Q',
}

impl Command {
    /// Every command, in wire-table order
    pub const ALL: [Command; 8] = [
        Command::GetTemperature,
        Command::GetHumidity,
        Command::GetLight,
        Command::GetWater,
        Command::GetMoisture,
        Command::GetFertilizer,
        Command::DispenseWater,
        Command::Quit,
    ];

    /// The byte sent on the wire for this command
    pub fn wire_byte(self) -> u8 {
        self as u8
    }

    /// Whether the response to this command carries a float
    pub fn has_data(self) -> bool {
        !matches!(self, Command::DispenseWater | Command::Quit)
    }

    /// Whether the request must carry a quantity byte
    pub fn requires_qty(self) -> bool {
        matches!(self, Command::DispenseWater)
    }

    /// Human-readable name, used in logs and the CLI
    pub fn name(self) -> &'static str {
        match self {
            Command::GetTemperature => "GET_TEMPERATURE",
            Command::GetHumidity => "GET_HUMIDITY",
            Command::GetLight => "GET_LIGHT",
            Command::GetWater => "GET_WATER",
            Command::GetMoisture => "GET_MOISTURE",
            Command::GetFertilizer => "GET_FERTILIZER",
            Command::DispenseWater => "DISPENSE_WATER",
            Command::Quit => "QUIT",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b't' => Ok(Command::GetTemperature),
            b'h' => Ok(Command::GetHumidity),
            b'l' => Ok(Command::GetLight),
            b'w' => Ok(Command::GetWater),
            b'm' => Ok(Command::GetMoisture),
            b'f' => Ok(Command::GetFertilizer),
            b'W' => Ok(Command::DispenseWater),
            b'Q' => Ok(Command::Quit),
            other => Err(DecodeError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ('{}')", self.name(), self.wire_byte() as char)
    }
}

/// A decoded request: the command plus its quantity operand
///
/// `qty` is zero when the frame carried no second byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub qty: u8,
}
