//! Instrument model
//!
//! This module provides the `Instrument` value object pairing a name with a
//! bus address, addressed write/query helpers that delegate to a controller
//! handle, and the HP 5334 universal counter command set as a worked
//! example.

use crate::address::BusAddress;
use crate::controller::Prologix;
use crate::error::{PrologixError, Result};

/// An instrument attached to the GPIB bus
///
/// Pairs a human-readable name with the bus address the controller must
/// select before talking to it. The helpers here address the controller,
/// then delegate; exchanges stay strictly serialized because each call
/// borrows the controller mutably for its whole duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    name: String,
    address: BusAddress,
}

impl Instrument {
    /// Create an instrument record
    pub fn new(name: impl Into<String>, address: BusAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    /// Instrument name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus address
    pub fn address(&self) -> BusAddress {
        self.address
    }

    /// Address this instrument, then send it a command payload
    pub fn write(&self, ctrl: &mut Prologix, command: &str) -> Result<()> {
        ctrl.set_address(&self.address)?;
        ctrl.send_data(command.as_bytes())
    }

    /// Address this instrument, then run one command/response exchange
    ///
    /// Assumes the controller is in read-after-write mode (`++auto 1`).
    pub fn query(&self, ctrl: &mut Prologix, command: &str) -> Result<Vec<u8>> {
        ctrl.set_address(&self.address)?;
        ctrl.query_data(command.as_bytes())
    }
}

/// HP 5334 universal counter command mnemonics
pub mod hp5334 {
    // Input conditioning
    pub const INPUT_A_COUPLING_DC: &str = "AA0";
    pub const INPUT_A_COUPLING_AC: &str = "AA1";
    pub const INPUT_A_SLOPE_POS: &str = "AS0";
    pub const INPUT_A_SLOPE_NEG: &str = "AS1";
    pub const CHANNEL_A_TRIG_LEVEL: &str = "AT";
    pub const AUTO_TRIG_OFF: &str = "AU0";
    pub const AUTO_TRIG_ON: &str = "AU1";
    pub const INPUT_A_ATTN_X1: &str = "AX0";
    pub const INPUT_A_ATTN_X10: &str = "AX1";
    pub const INPUT_A_IMPEDANCE_1M: &str = "AZ0";
    pub const INPUT_A_IMPEDANCE_50: &str = "AZ1";
    pub const INPUT_B_COUPLING_DC: &str = "BA0";
    pub const INPUT_B_COUPLING_AC: &str = "BA1";
    pub const INPUT_B_SLOPE_POS: &str = "BS0";
    pub const INPUT_B_SLOPE_NEG: &str = "BS1";
    pub const CHANNEL_B_TRIG_LEVEL: &str = "BT";
    pub const INPUT_B_ATTN_X1: &str = "BX0";
    pub const INPUT_B_ATTN_X10: &str = "BX1";
    pub const INPUT_B_IMPEDANCE_1M: &str = "BZ0";
    pub const INPUT_B_IMPEDANCE_50: &str = "BZ1";
    pub const COM_INPUTS_OFF: &str = "CO0";
    pub const COM_INPUTS_ON: &str = "CC1";
    pub const INPUT_FILTER_OFF: &str = "FI0";
    pub const INPUT_FILTER_ON: &str = "FI1";
    pub const SENS_MODE_OFF: &str = "SE0";
    pub const SENS_MODE_ON: &str = "SE1";
    pub const REMOTE_TRIG_LEVELS_OFF: &str = "TR0";
    pub const REMOTE_TRIG_LEVELS_ON: &str = "TR1";

    // External arming
    pub const EXT_START_ARM_SLOPE_POS: &str = "XA1";
    pub const EXT_START_ARM_OFF: &str = "XA2";
    pub const EXT_START_ARM_SLOPE_NEG: &str = "XA3";
    pub const EXT_STOP_ARM_SLOPE_POS: &str = "XO1";
    pub const EXT_STOP_ARM_OFF: &str = "XO2";
    pub const EXT_STOP_ARM_SLOPE_NEG: &str = "XO3";

    // Measurement functions
    pub const FREQ_A: &str = "FN1";
    pub const FREQ_B: &str = "FN2";
    pub const FREQ_C: &str = "FN3";
    pub const PERIOD_A: &str = "FN4";
    pub const TIME_INTERVAL_A_TO_B: &str = "FN5";
    pub const TIME_INTERVAL_A_TO_B_DELAY: &str = "FN6";
    pub const RATIO_A_B: &str = "FN7";
    pub const TOT_STOP_A: &str = "FN8";
    pub const TOT_START_A: &str = "FN9";
    pub const PULSE_WIDTH_A: &str = "FN10";
    pub const RISE_FALL_TIME_A: &str = "FN11";
    pub const VOLT_MODE: &str = "FN12";
    pub const READ_TRIG_LEVELS: &str = "FN13";
    pub const READ_PEAKS_A: &str = "FN14";
    pub const READ_PEAKS_B: &str = "FN15";

    // Math and setup
    pub const MATH_DISABLE_OFF: &str = "MD0";
    pub const MATH_DISABLE_ON: &str = "MD1";
    pub const NORM: &str = "MN";
    pub const OFFSET: &str = "MO";
    pub const RECALL_SETUP: &str = "MR";
    pub const STORE_SETUP: &str = "MS";
    pub const HIGH_SPEED_OFF: &str = "HS0";
    pub const HIGH_SPEED_ON: &str = "HS1";

    // Housekeeping
    pub const INSTRUMENT_ID: &str = "ID";
    pub const POWER_ON: &str = "IN";
    pub const RESET: &str = "RE";
    pub const SRQ_MASK: &str = "SM";
    pub const TRANSMIT_CAL_DATA: &str = "TC";
    pub const TRANSMIT_ERROR: &str = "TE";
    pub const WAIT_ADDRESSED_OFF: &str = "WA0";
    pub const WAIT_ADDRESSED_ON: &str = "WA1";
}

/// Valid trigger level range for the HP 5334, in volts
const HP5334_TRIG_LEVEL_RANGE: std::ops::RangeInclusive<f64> = -5.1..=5.1;

/// HP 5334 universal counter
///
/// Wraps [`Instrument`] with a few typed operations built from the mnemonic
/// table, demonstrating the addressed exchange pattern.
#[derive(Debug, Clone)]
pub struct Hp5334 {
    instrument: Instrument,
}

impl Hp5334 {
    /// Create a counter record at the given address
    pub fn new(address: BusAddress) -> Self {
        Self {
            instrument: Instrument::new("HP 5334", address),
        }
    }

    /// The underlying instrument record
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// `ID` - instrument identification string
    pub fn instrument_id(&self, ctrl: &mut Prologix) -> Result<String> {
        let frame = self.instrument.query(ctrl, hp5334::INSTRUMENT_ID)?;
        String::from_utf8(frame)
            .map(|s| s.trim().to_string())
            .map_err(|e| {
                PrologixError::InvalidResponse(format!("non-UTF-8 response: {:02X?}", e.as_bytes()))
            })
    }

    /// `RE` - reset the counter
    pub fn device_reset(&self, ctrl: &mut Prologix) -> Result<()> {
        self.instrument.write(ctrl, hp5334::RESET)
    }

    /// `AU0`/`AU1` - automatic trigger level selection
    pub fn set_auto_trigger(&self, ctrl: &mut Prologix, enabled: bool) -> Result<()> {
        let command = if enabled {
            hp5334::AUTO_TRIG_ON
        } else {
            hp5334::AUTO_TRIG_OFF
        };
        self.instrument.write(ctrl, command)
    }

    /// `AT`/`BT` - channel A or B trigger level in volts
    pub fn set_trigger_level(&self, ctrl: &mut Prologix, channel_a: bool, volts: f64) -> Result<()> {
        if !HP5334_TRIG_LEVEL_RANGE.contains(&volts) {
            return Err(PrologixError::InvalidCommand {
                reason: format!("trigger level {} V out of range ±5.1 V", volts),
            });
        }
        let mnemonic = if channel_a {
            hp5334::CHANNEL_A_TRIG_LEVEL
        } else {
            hp5334::CHANNEL_B_TRIG_LEVEL
        };
        self.instrument.write(ctrl, &format!("{}{}", mnemonic, volts))
    }

    /// `FN1` - measure frequency on channel A
    pub fn measure_frequency_a(&self, ctrl: &mut Prologix) -> Result<f64> {
        self.measure(ctrl, hp5334::FREQ_A)
    }

    /// `FN4` - measure period on channel A
    pub fn measure_period_a(&self, ctrl: &mut Prologix) -> Result<f64> {
        self.measure(ctrl, hp5334::PERIOD_A)
    }

    /// `FN5` - measure the time interval from channel A to channel B
    pub fn measure_time_interval(&self, ctrl: &mut Prologix) -> Result<f64> {
        self.measure(ctrl, hp5334::TIME_INTERVAL_A_TO_B)
    }

    /// Run a measurement function and parse its numeric result
    ///
    /// The counter reports readings in exponent notation, e.g.
    /// `F  1.0000000E+6`; the leading qualifier letters are skipped.
    fn measure(&self, ctrl: &mut Prologix, function: &str) -> Result<f64> {
        let frame = self.instrument.query(ctrl, function)?;
        let text = String::from_utf8_lossy(&frame);
        let number = text
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == ' ');
        number
            .parse()
            .map_err(|_| PrologixError::InvalidResponse(text.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::FakeChannel;
    use std::time::Duration;

    fn open_fake() -> (Prologix, FakeChannel) {
        let fake = FakeChannel::new();
        let ctrl = Prologix::from_channel(Box::new(fake.clone())).unwrap();
        (ctrl, fake)
    }

    fn respond_after(fake: &FakeChannel, delay: Duration, bytes: &[u8]) -> std::thread::JoinHandle<()> {
        let fake = fake.clone();
        let bytes = bytes.to_vec();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            fake.push_incoming(&bytes);
        })
    }

    #[test]
    fn test_write_addresses_then_sends() {
        let (mut ctrl, fake) = open_fake();
        let counter = Instrument::new("counter", BusAddress::new(3).unwrap());

        counter.write(&mut ctrl, "FN1").unwrap();
        assert_eq!(fake.written(), b"++addr 3\nFN1\n");
    }

    #[test]
    fn test_query_round_trip() {
        let (mut ctrl, fake) = open_fake();
        let counter = Instrument::new("counter", BusAddress::new(3).unwrap());

        let responder = respond_after(&fake, Duration::from_millis(20), b"HP5334A\r\n");
        let response = counter.query(&mut ctrl, "ID").unwrap();
        assert_eq!(response, b"HP5334A");
        assert_eq!(fake.written(), b"++addr 3\nID\n");
        responder.join().unwrap();
    }

    #[test]
    fn test_hp5334_instrument_id() {
        let (mut ctrl, fake) = open_fake();
        let counter = Hp5334::new(BusAddress::new(3).unwrap());

        let responder = respond_after(&fake, Duration::from_millis(20), b"HP5334A\r\n");
        assert_eq!(counter.instrument_id(&mut ctrl).unwrap(), "HP5334A");
        responder.join().unwrap();
    }

    #[test]
    fn test_hp5334_measure_frequency() {
        let (mut ctrl, fake) = open_fake();
        let counter = Hp5334::new(BusAddress::new(3).unwrap());

        let responder = respond_after(&fake, Duration::from_millis(20), b"F  1.0000000E+6\r\n");
        let hz = counter.measure_frequency_a(&mut ctrl).unwrap();
        assert!((hz - 1.0e6).abs() < 1.0);
        responder.join().unwrap();
    }

    #[test]
    fn test_hp5334_measure_rejects_garbage() {
        let (mut ctrl, fake) = open_fake();
        let counter = Hp5334::new(BusAddress::new(3).unwrap());

        let responder = respond_after(&fake, Duration::from_millis(20), b"?!\r\n");
        assert!(matches!(
            counter.measure_frequency_a(&mut ctrl),
            Err(PrologixError::InvalidResponse(_))
        ));
        responder.join().unwrap();
    }

    #[test]
    fn test_hp5334_trigger_level_range() {
        let (mut ctrl, fake) = open_fake();
        let counter = Hp5334::new(BusAddress::new(3).unwrap());

        assert!(matches!(
            counter.set_trigger_level(&mut ctrl, true, 6.0),
            Err(PrologixError::InvalidCommand { .. })
        ));
        assert!(fake.written().is_empty());

        counter.set_trigger_level(&mut ctrl, true, 1.5).unwrap();
        assert_eq!(fake.written(), b"++addr 3\nAT1.5\n");
    }

    #[test]
    fn test_mnemonic_table_spot_checks() {
        assert_eq!(hp5334::FREQ_A, "FN1");
        assert_eq!(hp5334::READ_PEAKS_B, "FN15");
        assert_eq!(hp5334::INSTRUMENT_ID, "ID");
        assert_eq!(hp5334::INPUT_B_IMPEDANCE_50, "BZ1");
    }
}
