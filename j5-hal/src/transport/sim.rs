//! In-process simulated SBDuino board.
//!
//! [`SimulatedArduino`] is a [`LineTransport`] that answers commands the way
//! the real firmware does, so a backend driven through it goes through the
//! full boot, version check and command/response cycle. A [`SimHandle`]
//! shares the simulated board's state: it sets the values the board will
//! report and records every command received.
//!
//! The simulator never blocks. A read with nothing queued returns `None`
//! straight away, which the backend treats exactly like a timeout.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::LineTransport;
use crate::arduino::protocol::{Command, PinDrive, BOOTED_LINE, MINIMUM_FIRMWARE};
use crate::error::Result;

/// Number of analogue channels the simulated board reports.
const ANALOGUE_CHANNELS: u8 = 6;

#[derive(Debug, Default)]
struct SimState {
    outbox: VecDeque<String>,
    scripted: VecDeque<Vec<String>>,
    silent: bool,
    commands: Vec<String>,
    drives: BTreeMap<u8, PinDrive>,
    inputs: BTreeMap<u8, bool>,
    analogue: BTreeMap<u8, u16>,
    servos: BTreeMap<u8, u16>,
    echo_micros: u64,
    distance_metres: f64,
}

impl SimState {
    fn respond(&mut self, line: &str) {
        self.commands.push(line.to_string());

        if self.silent {
            return;
        }
        if let Some(lines) = self.scripted.pop_front() {
            self.outbox.extend(lines);
            return;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                self.outbox.push_back("- Unknown command".to_string());
                return;
            }
        };

        match command {
            Command::WritePin { pin, drive } => {
                self.drives.insert(pin, drive);
            }
            Command::ReadPin { pin } => {
                let level = if self.inputs.get(&pin).copied().unwrap_or(false) {
                    "H"
                } else {
                    "L"
                };
                self.outbox.push_back(format!("> {level}"));
            }
            Command::ReadAnalogue => {
                for channel in 0..ANALOGUE_CHANNELS {
                    let reading = self.analogue.get(&channel).copied().unwrap_or(0);
                    self.outbox.push_back(format!("> a{channel} {reading}"));
                }
            }
            Command::SetServo { servo, level } => {
                self.servos.insert(servo, level);
            }
            Command::UltrasoundPulse { trigger, echo } => {
                self.drives.insert(trigger, PinDrive::Low);
                self.drives.insert(echo, PinDrive::Input);
                self.outbox.push_back(format!("> {}", self.echo_micros));
            }
            Command::UltrasoundDistance { trigger, echo } => {
                self.drives.insert(trigger, PinDrive::Low);
                self.drives.insert(echo, PinDrive::Input);
                self.outbox.push_back(format!("> {}", self.distance_metres));
            }
        }
        self.outbox.push_back("+ OK".to_string());
    }
}

/// A simulated board speaking the SBDuino protocol.
pub struct SimulatedArduino {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedArduino {
    /// A board that boots with a banner for the minimum supported firmware.
    pub fn new() -> (Self, SimHandle) {
        Self::with_banner([
            BOOTED_LINE.to_string(),
            format!("# SBDuino GPIO v{}", MINIMUM_FIRMWARE),
        ])
    }

    /// A board that prints `banner` before accepting commands.
    pub fn with_banner<I>(banner: I) -> (Self, SimHandle)
    where
        I: IntoIterator<Item = String>,
    {
        let state = Arc::new(Mutex::new(SimState {
            outbox: banner.into_iter().collect(),
            ..SimState::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            SimHandle { state },
        )
    }
}

impl LineTransport for SimulatedArduino {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.state.lock().respond(line);
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>> {
        Ok(self.state.lock().outbox.pop_front())
    }

    fn discard_input(&mut self) -> Result<()> {
        self.state.lock().outbox.clear();
        Ok(())
    }
}

/// Shared control over a [`SimulatedArduino`].
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Level reported by `R` for a digital pin.
    pub fn set_digital_input(&self, pin: u8, high: bool) {
        self.state.lock().inputs.insert(pin, high);
    }

    /// Raw ADC reading (0 to 1023) reported for analogue channel `channel`.
    pub fn set_analogue_reading(&self, channel: u8, reading: u16) {
        self.state.lock().analogue.insert(channel, reading);
    }

    /// Echo time reported by `T`. Zero simulates a timeout.
    pub fn set_echo_micros(&self, micros: u64) {
        self.state.lock().echo_micros = micros;
    }

    /// Distance reported by `U`. Zero simulates a timeout.
    pub fn set_distance_metres(&self, metres: f64) {
        self.state.lock().distance_metres = metres;
    }

    /// Answer the next command with exactly these lines.
    pub fn script_response<I>(&self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let lines = lines.into_iter().map(Into::into).collect();
        self.state.lock().scripted.push_back(lines);
    }

    /// Stop answering commands, as if the board hung.
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    /// Every command line received so far.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    /// Forget the commands received so far.
    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// How the firmware is currently driving a pin, if it was ever set.
    pub fn drive(&self, pin: u8) -> Option<PinDrive> {
        self.state.lock().drives.get(&pin).copied()
    }

    /// Level last sent to a servo.
    pub fn servo_level(&self, servo: u8) -> Option<u16> {
        self.state.lock().servos.get(&servo).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_WAIT: Duration = Duration::ZERO;

    #[test]
    fn test_boot_banner() {
        let (mut sim, _handle) = SimulatedArduino::new();
        assert_eq!(sim.read_line(NO_WAIT).unwrap().as_deref(), Some("# Booted"));
        assert_eq!(
            sim.read_line(NO_WAIT).unwrap().as_deref(),
            Some("# SBDuino GPIO v2019.6.0")
        );
        assert_eq!(sim.read_line(NO_WAIT).unwrap(), None);
    }

    #[test]
    fn test_answers_commands() {
        let (mut sim, handle) = SimulatedArduino::with_banner([]);
        handle.set_digital_input(5, true);
        handle.set_analogue_reading(1, 512);

        sim.write_line("R 5").unwrap();
        assert_eq!(sim.read_line(NO_WAIT).unwrap().as_deref(), Some("> H"));
        assert_eq!(sim.read_line(NO_WAIT).unwrap().as_deref(), Some("+ OK"));

        sim.write_line("A").unwrap();
        let mut lines = Vec::new();
        while let Some(line) = sim.read_line(NO_WAIT).unwrap() {
            lines.push(line);
        }
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1], "> a1 512");
        assert_eq!(lines[6], "+ OK");

        sim.write_line("W 9 H").unwrap();
        assert_eq!(handle.drive(9), Some(PinDrive::High));
        assert_eq!(sim.read_line(NO_WAIT).unwrap().as_deref(), Some("+ OK"));

        sim.write_line("bogus").unwrap();
        assert_eq!(
            sim.read_line(NO_WAIT).unwrap().as_deref(),
            Some("- Unknown command")
        );

        assert_eq!(handle.commands(), vec!["R 5", "A", "W 9 H", "bogus"]);
    }

    #[test]
    fn test_scripted_and_silent() {
        let (mut sim, handle) = SimulatedArduino::with_banner([]);
        handle.script_response(["> 42", "+ OK"]);
        sim.write_line("T 3 4").unwrap();
        assert_eq!(sim.read_line(NO_WAIT).unwrap().as_deref(), Some("> 42"));
        sim.discard_input().unwrap();
        assert_eq!(sim.read_line(NO_WAIT).unwrap(), None);

        handle.set_silent(true);
        sim.write_line("R 2").unwrap();
        assert_eq!(sim.read_line(NO_WAIT).unwrap(), None);
    }
}
