//! SBDuino GPIO serial protocol.
//!
//! The firmware speaks ASCII lines terminated by `\n`. The host sends one
//! command per line, fields separated by single spaces:
//!
//! | Command           | Meaning                                        |
//! |-------------------|------------------------------------------------|
//! | `W <pin> <Z\|P\|H\|L>` | input, input with pull-up, output high, output low |
//! | `R <pin>`         | read a digital input                           |
//! | `A`               | read every analogue input                      |
//! | `S <servo> <lvl>` | drive a servo, level 0 unpowers it             |
//! | `T <trig> <echo>` | ultrasound echo time, microseconds             |
//! | `U <trig> <echo>` | ultrasound distance, metres                    |
//!
//! Every line the board sends starts with a type character and a space:
//! `>` carries data, `+` ends a successful command, `-` ends a failed one,
//! and `#` is a comment. A command's response is every `>` payload up to
//! its `+` line.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use super::pins::FIRST_ANALOGUE_PIN;
use crate::error::{Error, Result};
use crate::hw_trait::{Distance, Echo, ServoPosition};

/// Oldest firmware this backend will drive.
pub const MINIMUM_FIRMWARE: FirmwareVersion = FirmwareVersion {
    year: 2019,
    minor: 6,
    patch: 0,
};

/// Comment line printed once the firmware has finished booting.
pub const BOOTED_LINE: &str = "# Booted";

/// Prefix of the banner line carrying the firmware version.
pub const BANNER_PREFIX: &str = "# SBDuino GPIO v";

/// Full scale of the analogue-to-digital converter.
pub const ADC_MAX: f64 = 1024.0;

/// ADC reference voltage.
pub const ADC_REFERENCE_VOLTS: f64 = 5.0;

/// Servo level at position -1.0.
pub const SERVO_LEVEL_MIN: u16 = 150;

/// Servo level at position 1.0.
pub const SERVO_LEVEL_MAX: u16 = 550;

/// How a digital pin is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDrive {
    Input,
    InputPullup,
    High,
    Low,
}

impl PinDrive {
    fn code(self) -> char {
        match self {
            PinDrive::Input => 'Z',
            PinDrive::InputPullup => 'P',
            PinDrive::High => 'H',
            PinDrive::Low => 'L',
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "Z" => Some(PinDrive::Input),
            "P" => Some(PinDrive::InputPullup),
            "H" => Some(PinDrive::High),
            "L" => Some(PinDrive::Low),
            _ => None,
        }
    }
}

/// A command sent from the host to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    WritePin { pin: u8, drive: PinDrive },
    ReadPin { pin: u8 },
    ReadAnalogue,
    SetServo { servo: u8, level: u16 },
    UltrasoundPulse { trigger: u8, echo: u8 },
    UltrasoundDistance { trigger: u8, echo: u8 },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::WritePin { pin, drive } => write!(f, "W {} {}", pin, drive.code()),
            Command::ReadPin { pin } => write!(f, "R {}", pin),
            Command::ReadAnalogue => write!(f, "A"),
            Command::SetServo { servo, level } => write!(f, "S {} {}", servo, level),
            Command::UltrasoundPulse { trigger, echo } => write!(f, "T {} {}", trigger, echo),
            Command::UltrasoundDistance { trigger, echo } => {
                write!(f, "U {} {}", trigger, echo)
            }
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let malformed = || Error::Communication(format!("malformed command {line:?}"));
        let fields: Vec<&str> = line.split_whitespace().collect();
        let number = |index: usize| -> Result<u8> {
            fields
                .get(index)
                .and_then(|field| field.parse().ok())
                .ok_or_else(malformed)
        };

        let command = match fields.first().copied() {
            Some("W") if fields.len() == 3 => Command::WritePin {
                pin: number(1)?,
                drive: PinDrive::from_code(fields[2]).ok_or_else(malformed)?,
            },
            Some("R") if fields.len() == 2 => Command::ReadPin { pin: number(1)? },
            Some("A") if fields.len() == 1 => Command::ReadAnalogue,
            Some("S") if fields.len() == 3 => Command::SetServo {
                servo: number(1)?,
                level: fields[2].parse().map_err(|_| malformed())?,
            },
            Some("T") if fields.len() == 3 => Command::UltrasoundPulse {
                trigger: number(1)?,
                echo: number(2)?,
            },
            Some("U") if fields.len() == 3 => Command::UltrasoundDistance {
                trigger: number(1)?,
                echo: number(2)?,
            },
            _ => return Err(malformed()),
        };
        Ok(command)
    }
}

/// One line received from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLine {
    Data(String),
    Ok(String),
    Error(String),
    Comment(String),
}

impl ResponseLine {
    /// Classify a received line by its type character.
    pub fn parse(line: &str) -> Result<Self> {
        let mut chars = line.chars();
        let code = chars.next();
        let rest = chars.as_str();
        let param = rest.strip_prefix(' ').unwrap_or(rest).to_string();

        match code {
            Some('>') => Ok(ResponseLine::Data(param)),
            Some('+') => Ok(ResponseLine::Ok(param)),
            Some('-') => Ok(ResponseLine::Error(param)),
            Some('#') => Ok(ResponseLine::Comment(param)),
            _ => Err(Error::Communication(format!(
                "unexpected response line {line:?}"
            ))),
        }
    }
}

/// Firmware version, `<year>.<minor>.<patch>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion {
    pub year: u16,
    pub minor: u16,
    pub patch: u16,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.minor, self.patch)
    }
}

impl FromStr for FirmwareVersion {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        static VERSION: OnceLock<Regex> = OnceLock::new();
        let re = VERSION.get_or_init(|| {
            Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("version pattern is valid")
        });

        let invalid = || Error::Communication(format!("invalid firmware version {text:?}"));
        let caps = re.captures(text.trim()).ok_or_else(invalid)?;
        let field = |i: usize| caps[i].parse::<u16>().map_err(|_| invalid());
        Ok(Self {
            year: field(1)?,
            minor: field(2)?,
            patch: field(3)?,
        })
    }
}

/// Extract the version string from a boot banner.
///
/// Returns `None` if the line is not an SBDuino banner at all.
pub fn banner_version(line: &str) -> Option<&str> {
    line.strip_prefix(BANNER_PREFIX).map(str::trim)
}

/// Decode the payload of a digital read.
pub fn parse_digital(payload: &str) -> Result<bool> {
    match payload.trim() {
        "H" => Ok(true),
        "L" => Ok(false),
        other => Err(Error::Communication(format!(
            "invalid digital reading {other:?}"
        ))),
    }
}

/// Find the reading for analogue pin `pin` in the payloads of an `A`
/// command and convert it to volts.
pub fn parse_analogue(payloads: &[String], pin: u8) -> Result<f64> {
    let channel = format!("a{}", pin.saturating_sub(FIRST_ANALOGUE_PIN));

    for payload in payloads {
        let mut fields = payload.split_whitespace();
        if fields.next() != Some(channel.as_str()) {
            continue;
        }
        let reading: u16 = fields
            .next()
            .and_then(|reading| reading.parse().ok())
            .ok_or_else(|| Error::Communication(format!("invalid analogue reading {payload:?}")))?;
        return Ok(f64::from(reading) / ADC_MAX * ADC_REFERENCE_VOLTS);
    }

    Err(Error::Communication(format!(
        "no reading for {channel} in {payloads:?}"
    )))
}

/// Servo level for a position. Positions outside -1.0..=1.0 are rejected.
pub fn servo_level(position: ServoPosition) -> Result<u16> {
    match position {
        ServoPosition::Unpowered => Ok(0),
        ServoPosition::Position(p) if (-1.0..=1.0).contains(&p) => {
            let span = f32::from(SERVO_LEVEL_MAX - SERVO_LEVEL_MIN);
            Ok(SERVO_LEVEL_MIN + (span * (p + 1.0) / 2.0) as u16)
        }
        ServoPosition::Position(p) => Err(Error::OutOfRange(format!(
            "servo position {p} is outside -1.0 to 1.0"
        ))),
    }
}

/// Decode the payload of a `T` command. Zero means the echo timed out.
pub fn parse_echo(payload: &str) -> Result<Echo> {
    let micros: u64 = payload
        .trim()
        .parse()
        .map_err(|_| Error::Communication(format!("invalid echo time {payload:?}")))?;
    if micros == 0 {
        Ok(Echo::Timeout)
    } else {
        Ok(Echo::Received(Duration::from_micros(micros)))
    }
}

/// Decode the payload of a `U` command into metres. Zero means the echo
/// timed out.
pub fn parse_distance(payload: &str) -> Result<Distance> {
    let metres: f64 = payload
        .trim()
        .parse()
        .map_err(|_| Error::Communication(format!("invalid distance {payload:?}")))?;
    if !metres.is_finite() || metres < 0.0 {
        return Err(Error::Communication(format!("invalid distance {payload:?}")));
    }
    if metres == 0.0 {
        Ok(Distance::Timeout)
    } else {
        Ok(Distance::Measured(metres))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Command::WritePin { pin: 13, drive: PinDrive::High }, "W 13 H")]
    #[test_case(Command::WritePin { pin: 2, drive: PinDrive::Input }, "W 2 Z")]
    #[test_case(Command::WritePin { pin: 7, drive: PinDrive::InputPullup }, "W 7 P")]
    #[test_case(Command::ReadPin { pin: 4 }, "R 4")]
    #[test_case(Command::ReadAnalogue, "A")]
    #[test_case(Command::SetServo { servo: 3, level: 350 }, "S 3 350")]
    #[test_case(Command::UltrasoundPulse { trigger: 3, echo: 4 }, "T 3 4")]
    #[test_case(Command::UltrasoundDistance { trigger: 5, echo: 5 }, "U 5 5")]
    fn test_command_encoding(command: Command, line: &str) {
        assert_eq!(command.to_string(), line);
        assert_eq!(line.parse::<Command>().unwrap(), command);
    }

    #[test_case("" ; "empty")]
    #[test_case("W 3 X" ; "bad drive")]
    #[test_case("W 3" ; "missing field")]
    #[test_case("R three" ; "non numeric pin")]
    #[test_case("Q" ; "unknown command")]
    fn test_malformed_commands(line: &str) {
        assert!(matches!(line.parse::<Command>(), Err(Error::Communication(_))));
    }

    #[test]
    fn test_response_lines() {
        assert_eq!(
            ResponseLine::parse("> a0 512").unwrap(),
            ResponseLine::Data("a0 512".into())
        );
        assert_eq!(ResponseLine::parse("+ OK").unwrap(), ResponseLine::Ok("OK".into()));
        assert_eq!(ResponseLine::parse("+").unwrap(), ResponseLine::Ok("".into()));
        assert_eq!(
            ResponseLine::parse("- bad pin").unwrap(),
            ResponseLine::Error("bad pin".into())
        );
        assert_eq!(
            ResponseLine::parse("# Booted").unwrap(),
            ResponseLine::Comment("Booted".into())
        );
        assert!(ResponseLine::parse("garbage").is_err());
        assert!(ResponseLine::parse("").is_err());
    }

    #[test]
    fn test_firmware_version_ordering() {
        let found: FirmwareVersion = "2019.6.0".parse().unwrap();
        assert_eq!(found, MINIMUM_FIRMWARE);
        assert!("2019.5.9".parse::<FirmwareVersion>().unwrap() < MINIMUM_FIRMWARE);
        assert!("2019.10.0".parse::<FirmwareVersion>().unwrap() > MINIMUM_FIRMWARE);
        assert!("2020.1.0".parse::<FirmwareVersion>().unwrap() > MINIMUM_FIRMWARE);
        assert!("2019.6".parse::<FirmwareVersion>().is_err());
        assert_eq!(MINIMUM_FIRMWARE.to_string(), "2019.6.0");
    }

    #[test]
    fn test_banner_version() {
        assert_eq!(banner_version("# SBDuino GPIO v2019.6.0"), Some("2019.6.0"));
        assert_eq!(banner_version("# Some other sketch"), None);
    }

    #[test]
    fn test_analogue_conversion() {
        let payloads: Vec<String> = ["a0 0", "a1 512", "a2 1023"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_analogue(&payloads, 14).unwrap(), 0.0);
        assert!((parse_analogue(&payloads, 15).unwrap() - 2.5).abs() < 1e-9);
        assert!((parse_analogue(&payloads, 16).unwrap() - 4.995).abs() < 1e-3);
        assert!(parse_analogue(&payloads, 19).is_err());
    }

    #[test_case(ServoPosition::Unpowered, 0)]
    #[test_case(ServoPosition::Position(-1.0), 150)]
    #[test_case(ServoPosition::Position(0.0), 350)]
    #[test_case(ServoPosition::Position(1.0), 550)]
    fn test_servo_level(position: ServoPosition, level: u16) {
        assert_eq!(servo_level(position).unwrap(), level);
    }

    #[test]
    fn test_servo_level_out_of_range() {
        assert!(matches!(
            servo_level(ServoPosition::Position(1.5)),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn test_echo_and_distance() {
        assert_eq!(
            parse_echo("2345").unwrap(),
            Echo::Received(Duration::from_micros(2345))
        );
        assert_eq!(parse_echo("0").unwrap(), Echo::Timeout);
        assert!(parse_echo("soon").is_err());

        let metres = parse_distance("1.23").unwrap().metres().unwrap();
        assert!((metres - 1.23).abs() < 1e-9);
        // Already metres, not millimetres.
        assert_eq!(parse_distance("1230").unwrap(), Distance::Measured(1230.0));
        assert_eq!(parse_distance("0").unwrap(), Distance::Timeout);
        assert!(parse_distance("-4").is_err());
    }
}
