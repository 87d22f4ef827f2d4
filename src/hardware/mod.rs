// src/hardware/mod.rs - Hardware handler contract consumed by the executor
//!
//! The crossbar resolver, DAC/ADC drivers, current sensors and displays live
//! outside this crate. The executor only talks to them through
//! [`HardwareHandler`], one typed request at a time.
//!
//! A handler is synchronous and non-reentrant: it runs to completion on the
//! caller's stack and must never call back into the command engine.

pub mod simulated;

pub use simulated::SimulatedBoard;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum HardwareError {
    #[error("{what} {index} out of range (0..{limit})")]
    OutOfRange { what: &'static str, index: i64, limit: i64 },
    #[error("{value:.3} V outside range {min:.1}..{max:.1} V")]
    VoltageOutOfRange { value: f64, min: f64, max: f64 },
    #[error("{0} is not connected")]
    NotConnected(&'static str),
    #[error("unknown config key {section}.{key}")]
    UnknownConfigKey { section: String, key: String },
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPull {
    None,
    Up,
    Down,
}

/// Quantity read from an INA-style current sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseQuantity {
    Current,
    ShuntVoltage,
    BusVoltage,
    Power,
}

/// One validated, typed hardware operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareRequest {
    GpioSet { pin: u8, high: bool },
    GpioGet { pin: u8 },
    GpioDirection { pin: u8, direction: PinDirection },
    GpioPulls { pin: u8, pull: PinPull },
    ConnectNodes { a: u16, b: u16, persist: bool },
    DisconnectNodes { a: u16, b: u16, persist: bool },
    ClearNodes { persist: bool },
    NodesConnected { a: u16, b: u16 },
    DacSet { channel: u8, volts: f64, persist: bool },
    DacGet { channel: u8 },
    AdcGet { channel: u8 },
    CurrentSense { sensor: u8, quantity: SenseQuantity },
    ConfigGet { section: String, key: String },
    ConfigSet { section: String, key: String, value: String },
    ConfigReset,
    ResetTarget,
    FlashTarget,
    UartConnect,
    UartDisconnect,
    UartSetBaud { baud: u32 },
    UartGetBaud,
    ProbeRead,
    ProbeSimulate { node: u16 },
    WheelGet,
    WheelSimulate { delta: i64 },
    OledPrint { text: String },
    OledClear,
    OledConnect,
    OledDisconnect,
    DisplayPrint,
    DisplaySetMode { mode: String },
    DisplayGetMode,
    SlotLoad { slot: u8 },
    SlotSave { slot: u8 },
    SlotClear { slot: u8 },
    SlotGet,
    PanelSetBrightness { level: u8 },
    PanelGetBrightness,
}

/// Value produced by a hardware operation; the executor picks the unit.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareReply {
    Done,
    /// Logic level, rendered `HIGH`/`LOW`.
    Level(bool),
    /// Predicate, rendered `true`/`false`.
    Flag(bool),
    Int(i64),
    Volts(f64),
    Milliamps(f64),
    Milliwatts(f64),
    Text(String),
}

pub trait HardwareHandler {
    fn handle(&mut self, request: HardwareRequest) -> Result<HardwareReply, HardwareError>;
}

impl<H: HardwareHandler + ?Sized> HardwareHandler for Box<H> {
    fn handle(&mut self, request: HardwareRequest) -> Result<HardwareReply, HardwareError> {
        (**self).handle(request)
    }
}
