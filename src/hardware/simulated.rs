// src/hardware/simulated.rs - In-memory board used by the host binary and tests
use std::collections::{BTreeMap, BTreeSet};

use super::{
    HardwareError, HardwareHandler, HardwareReply, HardwareRequest, PinDirection, PinPull,
    SenseQuantity,
};
use crate::config::BoardConfig;

/// Simulated current sensor: fixed shunt resistance, bus voltage follows the
/// DAC channel with the same index.
const SHUNT_OHMS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PinState {
    high: bool,
    direction: PinDirection,
    pull: PinPull,
}

impl Default for PinState {
    fn default() -> Self {
        Self { high: false, direction: PinDirection::Input, pull: PinPull::None }
    }
}

/// A connection set plus the copy that survives a slot reload.
#[derive(Debug, Clone, Default)]
struct Netlist {
    live: BTreeSet<(u16, u16)>,
    saved: BTreeSet<(u16, u16)>,
}

#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    limits: BoardConfig,
    pins: Vec<PinState>,
    nets: Netlist,
    dac: Vec<f64>,
    dac_saved: Vec<f64>,
    adc_override: BTreeMap<u8, f64>,
    sense_milliamps: Vec<f64>,
    config: BTreeMap<(String, String), String>,
    uart_connected: bool,
    uart_baud: u32,
    probe_node: Option<u16>,
    wheel: i64,
    oled_connected: bool,
    oled_text: String,
    display_mode: String,
    slots: Vec<Option<BTreeSet<(u16, u16)>>>,
    current_slot: u8,
    brightness: u8,
    target_resets: u32,
    target_flashes: u32,
}

impl SimulatedBoard {
    pub fn new(limits: BoardConfig) -> Self {
        let dac = vec![0.0; limits.dac_channels as usize];
        Self {
            pins: vec![PinState::default(); limits.gpio_pins as usize],
            nets: Netlist::default(),
            dac_saved: dac.clone(),
            dac,
            adc_override: BTreeMap::new(),
            sense_milliamps: vec![0.0; limits.current_sensors as usize],
            config: default_config_table(),
            uart_connected: false,
            uart_baud: limits.uart_baud,
            probe_node: None,
            wheel: 0,
            oled_connected: false,
            oled_text: String::new(),
            display_mode: "nets".to_string(),
            slots: vec![None; limits.slots as usize],
            current_slot: 0,
            brightness: 32,
            target_resets: 0,
            target_flashes: 0,
            limits,
        }
    }

    /// Pin an ADC channel to a fixed reading instead of the DAC loopback.
    pub fn with_adc_reading(mut self, channel: u8, volts: f64) -> Self {
        self.adc_override.insert(channel, volts);
        self
    }

    pub fn with_sense_current(mut self, sensor: u8, milliamps: f64) -> Self {
        if let Some(slot) = self.sense_milliamps.get_mut(sensor as usize) {
            *slot = milliamps;
        }
        self
    }

    pub fn is_connected(&self, a: u16, b: u16) -> bool {
        self.nets.live.contains(&ordered(a, b))
    }

    pub fn saved_connections(&self) -> usize {
        self.nets.saved.len()
    }

    pub fn pin_high(&self, pin: u8) -> Option<bool> {
        self.pins.get(pin as usize).map(|p| p.high)
    }

    pub fn dac_volts(&self, channel: u8) -> Option<f64> {
        self.dac.get(channel as usize).copied()
    }

    pub fn oled_text(&self) -> &str {
        &self.oled_text
    }

    pub fn target_resets(&self) -> u32 {
        self.target_resets
    }

    fn pin_mut(&mut self, pin: u8) -> Result<&mut PinState, HardwareError> {
        let limit = self.pins.len();
        self.pins
            .get_mut(pin as usize)
            .ok_or(HardwareError::OutOfRange { what: "gpio pin", index: pin as i64, limit: limit as i64 })
    }

    fn check_node(&self, node: u16) -> Result<(), HardwareError> {
        if node == 0 || node > self.limits.node_count {
            return Err(HardwareError::OutOfRange {
                what: "node",
                index: node as i64,
                limit: self.limits.node_count as i64 + 1,
            });
        }
        Ok(())
    }

    fn check_channel(&self, what: &'static str, channel: u8, limit: u8) -> Result<(), HardwareError> {
        if channel >= limit {
            return Err(HardwareError::OutOfRange { what, index: channel as i64, limit: limit as i64 });
        }
        Ok(())
    }

    fn check_slot(&self, slot: u8) -> Result<usize, HardwareError> {
        self.check_channel("slot", slot, self.limits.slots)?;
        Ok(slot as usize)
    }

    fn adc_read(&self, channel: u8) -> Result<f64, HardwareError> {
        self.check_channel("adc channel", channel, self.limits.adc_channels)?;
        if let Some(volts) = self.adc_override.get(&channel) {
            return Ok(*volts);
        }
        Ok(self.dac.get(channel as usize).copied().unwrap_or(0.0))
    }

    fn sense(&self, sensor: u8, quantity: SenseQuantity) -> Result<HardwareReply, HardwareError> {
        self.check_channel("current sensor", sensor, self.limits.current_sensors)?;
        let milliamps = self.sense_milliamps[sensor as usize];
        let bus = self.dac.get(sensor as usize).copied().unwrap_or(0.0);
        Ok(match quantity {
            SenseQuantity::Current => HardwareReply::Milliamps(milliamps),
            SenseQuantity::ShuntVoltage => HardwareReply::Volts(milliamps / 1000.0 * SHUNT_OHMS),
            SenseQuantity::BusVoltage => HardwareReply::Volts(bus),
            SenseQuantity::Power => HardwareReply::Milliwatts(milliamps * bus),
        })
    }

    fn netlist_text(&self) -> String {
        if self.nets.live.is_empty() {
            return "no connections".to_string();
        }
        self.nets
            .live
            .iter()
            .map(|(a, b)| format!("{}-{}", a, b))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl HardwareHandler for SimulatedBoard {
    fn handle(&mut self, request: HardwareRequest) -> Result<HardwareReply, HardwareError> {
        tracing::debug!("sim <- {:?}", request);
        let reply = match request {
            HardwareRequest::GpioSet { pin, high } => {
                let state = self.pin_mut(pin)?;
                state.direction = PinDirection::Output;
                state.high = high;
                HardwareReply::Done
            }
            HardwareRequest::GpioGet { pin } => {
                let state = self.pin_mut(pin)?;
                let high = match (state.direction, state.pull) {
                    (PinDirection::Output, _) => state.high,
                    (PinDirection::Input, PinPull::Up) => true,
                    (PinDirection::Input, _) => false,
                };
                HardwareReply::Level(high)
            }
            HardwareRequest::GpioDirection { pin, direction } => {
                self.pin_mut(pin)?.direction = direction;
                HardwareReply::Done
            }
            HardwareRequest::GpioPulls { pin, pull } => {
                self.pin_mut(pin)?.pull = pull;
                HardwareReply::Done
            }
            HardwareRequest::ConnectNodes { a, b, persist } => {
                self.check_node(a)?;
                self.check_node(b)?;
                if a == b {
                    return Err(HardwareError::Failed(format!("cannot connect node {} to itself", a)));
                }
                self.nets.live.insert(ordered(a, b));
                if persist {
                    self.nets.saved.insert(ordered(a, b));
                }
                HardwareReply::Done
            }
            HardwareRequest::DisconnectNodes { a, b, persist } => {
                self.check_node(a)?;
                self.check_node(b)?;
                self.nets.live.remove(&ordered(a, b));
                if persist {
                    self.nets.saved.remove(&ordered(a, b));
                }
                HardwareReply::Done
            }
            HardwareRequest::ClearNodes { persist } => {
                self.nets.live.clear();
                if persist {
                    self.nets.saved.clear();
                }
                HardwareReply::Done
            }
            HardwareRequest::NodesConnected { a, b } => {
                self.check_node(a)?;
                self.check_node(b)?;
                HardwareReply::Flag(self.is_connected(a, b))
            }
            HardwareRequest::DacSet { channel, volts, persist } => {
                self.check_channel("dac channel", channel, self.limits.dac_channels)?;
                let (min, max) = (self.limits.dac_min_volts, self.limits.dac_max_volts);
                if !(min..=max).contains(&volts) {
                    return Err(HardwareError::VoltageOutOfRange { value: volts, min, max });
                }
                self.dac[channel as usize] = volts;
                if persist {
                    self.dac_saved[channel as usize] = volts;
                }
                HardwareReply::Done
            }
            HardwareRequest::DacGet { channel } => {
                self.check_channel("dac channel", channel, self.limits.dac_channels)?;
                HardwareReply::Volts(self.dac[channel as usize])
            }
            HardwareRequest::AdcGet { channel } => HardwareReply::Volts(self.adc_read(channel)?),
            HardwareRequest::CurrentSense { sensor, quantity } => self.sense(sensor, quantity)?,
            HardwareRequest::ConfigGet { section, key } => {
                match self.config.get(&(section.clone(), key.clone())) {
                    Some(value) => HardwareReply::Text(value.clone()),
                    None => return Err(HardwareError::UnknownConfigKey { section, key }),
                }
            }
            HardwareRequest::ConfigSet { section, key, value } => {
                match self.config.get_mut(&(section.clone(), key.clone())) {
                    Some(slot) => *slot = value,
                    None => return Err(HardwareError::UnknownConfigKey { section, key }),
                }
                HardwareReply::Done
            }
            HardwareRequest::ConfigReset => {
                self.config = default_config_table();
                HardwareReply::Done
            }
            HardwareRequest::ResetTarget => {
                self.target_resets += 1;
                HardwareReply::Done
            }
            HardwareRequest::FlashTarget => {
                if !self.uart_connected {
                    return Err(HardwareError::NotConnected("uart bridge"));
                }
                self.target_flashes += 1;
                HardwareReply::Done
            }
            HardwareRequest::UartConnect => {
                self.uart_connected = true;
                HardwareReply::Done
            }
            HardwareRequest::UartDisconnect => {
                self.uart_connected = false;
                HardwareReply::Done
            }
            HardwareRequest::UartSetBaud { baud } => {
                if baud == 0 {
                    return Err(HardwareError::Failed("baud rate must be > 0".to_string()));
                }
                self.uart_baud = baud;
                HardwareReply::Done
            }
            HardwareRequest::UartGetBaud => HardwareReply::Int(self.uart_baud as i64),
            HardwareRequest::ProbeRead => HardwareReply::Int(self.probe_node.map_or(-1, |n| n as i64)),
            HardwareRequest::ProbeSimulate { node } => {
                self.check_node(node)?;
                self.probe_node = Some(node);
                HardwareReply::Done
            }
            HardwareRequest::WheelGet => HardwareReply::Int(self.wheel),
            HardwareRequest::WheelSimulate { delta } => {
                self.wheel = self.wheel.saturating_add(delta);
                HardwareReply::Done
            }
            HardwareRequest::OledPrint { text } => {
                if !self.oled_connected {
                    return Err(HardwareError::NotConnected("oled"));
                }
                self.oled_text = text;
                HardwareReply::Done
            }
            HardwareRequest::OledClear => {
                self.oled_text.clear();
                HardwareReply::Done
            }
            HardwareRequest::OledConnect => {
                self.oled_connected = true;
                HardwareReply::Done
            }
            HardwareRequest::OledDisconnect => {
                self.oled_connected = false;
                HardwareReply::Done
            }
            HardwareRequest::DisplayPrint => HardwareReply::Text(self.netlist_text()),
            HardwareRequest::DisplaySetMode { mode } => {
                if !["nets", "rails", "off"].contains(&mode.as_str()) {
                    return Err(HardwareError::Failed(format!("unknown display mode '{}'", mode)));
                }
                self.display_mode = mode;
                HardwareReply::Done
            }
            HardwareRequest::DisplayGetMode => HardwareReply::Text(self.display_mode.clone()),
            HardwareRequest::SlotLoad { slot } => {
                let index = self.check_slot(slot)?;
                self.nets.live = self.slots[index].clone().unwrap_or_default();
                self.nets.saved = self.nets.live.clone();
                self.current_slot = slot;
                HardwareReply::Done
            }
            HardwareRequest::SlotSave { slot } => {
                let index = self.check_slot(slot)?;
                self.slots[index] = Some(self.nets.live.clone());
                self.current_slot = slot;
                HardwareReply::Done
            }
            HardwareRequest::SlotClear { slot } => {
                let index = self.check_slot(slot)?;
                self.slots[index] = None;
                HardwareReply::Done
            }
            HardwareRequest::SlotGet => HardwareReply::Int(self.current_slot as i64),
            HardwareRequest::PanelSetBrightness { level } => {
                self.brightness = level;
                HardwareReply::Done
            }
            HardwareRequest::PanelGetBrightness => HardwareReply::Int(self.brightness as i64),
        };
        Ok(reply)
    }
}

fn ordered(a: u16, b: u16) -> (u16, u16) {
    if a <= b { (a, b) } else { (b, a) }
}

fn default_config_table() -> BTreeMap<(String, String), String> {
    [
        ("display", "brightness", "32"),
        ("display", "rotation", "0"),
        ("routing", "stack_paths", "2"),
        ("dacs", "limit_max", "8.0"),
        ("dacs", "limit_min", "-8.0"),
        ("serial", "baud", "115200"),
    ]
    .into_iter()
    .map(|(section, key, value)| ((section.to_string(), key.to_string()), value.to_string()))
    .collect()
}
