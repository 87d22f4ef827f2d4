// src/command/executor.rs - Validates parsed commands and drives the hardware handler
//!
//! Every (category, sub-action) pair declares a parameter shape. Arguments
//! are bound and type-checked against it before the hardware handler is
//! touched, so a malformed command never has a partial side effect.

use super::argument::ArgValue;
use super::dispatch::{ActionCategory, SubAction};
use super::parser::{parse_command, ParsedCommand};
use super::response::Response;
use crate::error::{CommandError, ErrorKind};
use crate::hardware::{
    HardwareHandler, HardwareReply, HardwareRequest, PinDirection, PinPull, SenseQuantity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Int,
    /// Int or Float.
    Number,
    /// Any literal, used as text.
    Text,
    /// Bool, or Int 0/1.
    Flag,
    /// Bool, Int 0/1, or `HIGH`/`LOW`.
    Level,
}

impl ParamKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Number => "a number",
            Self::Text => "a value",
            Self::Flag => "true/false",
            Self::Level => "HIGH/LOW",
        }
    }

    fn accepts(&self, value: &ArgValue) -> bool {
        match (self, value) {
            (_, ArgValue::None) => false,
            (Self::Int, ArgValue::Int(_)) => true,
            (Self::Number, ArgValue::Int(_) | ArgValue::Float(_)) => true,
            (Self::Text, _) => true,
            (Self::Flag | Self::Level, ArgValue::Bool(_)) => true,
            (Self::Flag | Self::Level, ArgValue::Int(v)) => *v == 0 || *v == 1,
            (Self::Level, ArgValue::String(s)) => level_word(s).is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Param {
    name: &'static str,
    kind: ParamKind,
    required: bool,
}

impl Param {
    const fn req(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, required: true }
    }

    const fn opt(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, required: false }
    }
}

const NONE: &[Param] = &[];
const PIN_ONLY: &[Param] = &[Param::req("pin", ParamKind::Int)];
const GPIO_SET: &[Param] = &[Param::req("pin", ParamKind::Int), Param::req("value", ParamKind::Level)];
const GPIO_DIRECTION: &[Param] = &[Param::req("pin", ParamKind::Int), Param::req("direction", ParamKind::Text)];
const GPIO_PULLS: &[Param] = &[Param::req("pin", ParamKind::Int), Param::req("pull", ParamKind::Text)];
const NODE_PAIR_SAVE: &[Param] = &[
    Param::req("a", ParamKind::Int),
    Param::req("b", ParamKind::Int),
    Param::opt("save", ParamKind::Flag),
];
const NODE_PAIR: &[Param] = &[Param::req("a", ParamKind::Int), Param::req("b", ParamKind::Int)];
const SAVE_ONLY: &[Param] = &[Param::opt("save", ParamKind::Flag)];
const DAC_SET: &[Param] = &[
    Param::req("channel", ParamKind::Int),
    Param::req("voltage", ParamKind::Number),
    Param::opt("save", ParamKind::Flag),
];
const CHANNEL_ONLY: &[Param] = &[Param::req("channel", ParamKind::Int)];
const SENSOR_ONLY: &[Param] = &[Param::opt("sensor", ParamKind::Int)];
const CONFIG_GET: &[Param] = &[Param::req("section", ParamKind::Text), Param::req("key", ParamKind::Text)];
const CONFIG_SET: &[Param] = &[
    Param::req("section", ParamKind::Text),
    Param::req("key", ParamKind::Text),
    Param::req("value", ParamKind::Text),
];
const BAUD_ONLY: &[Param] = &[Param::req("baud", ParamKind::Int)];
const NODE_ONLY: &[Param] = &[Param::req("node", ParamKind::Int)];
const DELTA_ONLY: &[Param] = &[Param::req("delta", ParamKind::Int)];
const TEXT_ONLY: &[Param] = &[Param::req("text", ParamKind::Text)];
const MODE_ONLY: &[Param] = &[Param::req("mode", ParamKind::Text)];
const SLOT_ONLY: &[Param] = &[Param::req("slot", ParamKind::Int)];
const BRIGHTNESS_ONLY: &[Param] = &[Param::req("brightness", ParamKind::Int)];

fn shape(category: ActionCategory, action: SubAction) -> Option<&'static [Param]> {
    use ActionCategory as C;
    use SubAction as S;
    let params = match (category, action) {
        (C::Gpio, S::Set) => GPIO_SET,
        (C::Gpio, S::Get) => PIN_ONLY,
        (C::Gpio, S::Direction) => GPIO_DIRECTION,
        (C::Gpio, S::Pulls) => GPIO_PULLS,
        (C::Nodes, S::Connect | S::Disconnect) => NODE_PAIR_SAVE,
        (C::Nodes, S::Clear) => SAVE_ONLY,
        (C::Nodes, S::Check) => NODE_PAIR,
        (C::Dac, S::Set) => DAC_SET,
        (C::Dac, S::Get) | (C::Adc, S::Get) => CHANNEL_ONLY,
        (C::CurrentSense, S::Current | S::ShuntVoltage | S::BusVoltage | S::Power) => SENSOR_ONLY,
        (C::Config, S::Get) => CONFIG_GET,
        (C::Config, S::Set) => CONFIG_SET,
        (C::Config, S::Reset) => NONE,
        (C::ResetTarget, S::Reset | S::Flash) => NONE,
        (C::UartBridge, S::Connect | S::Disconnect | S::Get) => NONE,
        (C::UartBridge, S::Set) => BAUD_ONLY,
        (C::Probe, S::Get) => NONE,
        (C::Probe, S::Simulate) => NODE_ONLY,
        (C::ScrollInput, S::Get) => NONE,
        (C::ScrollInput, S::Simulate) => DELTA_ONLY,
        (C::SmallDisplay, S::Print) => TEXT_ONLY,
        (C::SmallDisplay, S::Clear | S::Connect | S::Disconnect) => NONE,
        (C::Display, S::Print | S::Get) => NONE,
        (C::Display, S::Set) => MODE_ONLY,
        (C::Slot, S::Load | S::Save | S::Clear) => SLOT_ONLY,
        (C::Slot, S::Get) => NONE,
        (C::Panel, S::Set) => BRIGHTNESS_ONLY,
        (C::Panel, S::Get) => NONE,
        _ => return None,
    };
    Some(params)
}

/// Arguments matched to a shape, in parameter order.
struct BoundArgs<'a> {
    params: &'static [Param],
    values: Vec<Option<&'a ArgValue>>,
    echo: String,
}

impl<'a> BoundArgs<'a> {
    fn bind(cmd: &'a ParsedCommand, params: &'static [Param]) -> Result<Self, CommandError> {
        let head = format!("{}({})", cmd.category, cmd.sub_action);
        let mut values: Vec<Option<&ArgValue>> = vec![None; params.len()];

        let mut next = 0;
        for arg in cmd.args.iter().filter(|a| a.name.is_none()) {
            if next >= params.len() {
                return Err(CommandError::InvalidParameterType(format!(
                    "{} takes {} argument(s), got more",
                    head,
                    params.len()
                )));
            }
            values[next] = Some(&arg.value);
            next += 1;
        }
        for arg in cmd.args.iter().filter(|a| a.name.is_some()) {
            let name = arg.name.as_deref().unwrap_or_default();
            let index = params
                .iter()
                .position(|p| p.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| CommandError::InvalidParameterType(format!("{} has no parameter '{}'", head, name)))?;
            if values[index].is_some() {
                return Err(CommandError::InvalidParameterType(format!(
                    "{} given '{}' twice",
                    head, params[index].name
                )));
            }
            values[index] = Some(&arg.value);
        }

        for (param, value) in params.iter().zip(&values) {
            match value {
                Some(value) if !param.kind.accepts(value) => {
                    return Err(CommandError::InvalidParameterType(format!(
                        "{} expects {} for '{}', got {} {}",
                        head,
                        param.kind.describe(),
                        param.name,
                        value.type_name(),
                        value
                    )));
                }
                None if param.required => {
                    return Err(CommandError::MissingParameter { command: head, parameter: param.name.to_string() });
                }
                _ => {}
            }
        }

        let echo = render_echo(cmd, params, &values);
        Ok(Self { params, values, echo })
    }

    fn value(&self, name: &str) -> Option<&'a ArgValue> {
        self.params.iter().position(|p| p.name == name).and_then(|i| self.values[i])
    }

    fn int<T: TryFrom<i64>>(&self, name: &str) -> Result<T, CommandError> {
        match self.value(name) {
            Some(ArgValue::Int(v)) => T::try_from(*v)
                .map_err(|_| CommandError::InvalidParameterType(format!("{} value {} out of range", name, v))),
            _ => Err(self.missing(name)),
        }
    }

    fn int_or<T: TryFrom<i64>>(&self, name: &str, default: T) -> Result<T, CommandError> {
        match self.value(name) {
            Some(_) => self.int(name),
            None => Ok(default),
        }
    }

    fn number(&self, name: &str) -> Result<f64, CommandError> {
        self.value(name).and_then(ArgValue::as_number).ok_or_else(|| self.missing(name))
    }

    fn text(&self, name: &str) -> Result<String, CommandError> {
        match self.value(name) {
            Some(ArgValue::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(self.missing(name)),
        }
    }

    fn flag_or(&self, name: &str, default: bool) -> bool {
        match self.value(name) {
            Some(ArgValue::Bool(b)) => *b,
            Some(ArgValue::Int(v)) => *v != 0,
            _ => default,
        }
    }

    fn level(&self, name: &str) -> Result<bool, CommandError> {
        match self.value(name) {
            Some(ArgValue::Bool(b)) => Ok(*b),
            Some(ArgValue::Int(v)) => Ok(*v != 0),
            Some(ArgValue::String(s)) => level_word(s).ok_or_else(|| self.missing(name)),
            _ => Err(self.missing(name)),
        }
    }

    fn missing(&self, name: &str) -> CommandError {
        CommandError::MissingParameter { command: self.echo.clone(), parameter: name.to_string() }
    }
}

fn level_word(word: &str) -> Option<bool> {
    if word.eq_ignore_ascii_case("high") {
        Some(true)
    } else if word.eq_ignore_ascii_case("low") {
        Some(false)
    } else {
        None
    }
}

/// `category(sub, name=value, ...)` for the arguments actually supplied.
fn render_echo(cmd: &ParsedCommand, params: &[Param], values: &[Option<&ArgValue>]) -> String {
    let mut echo = format!("{}({}", cmd.category, cmd.sub_action);
    for (param, value) in params.iter().zip(values) {
        let Some(value) = value else { continue };
        let rendered = match (param.kind, value) {
            (ParamKind::Level, ArgValue::Bool(b)) => level_text(*b).to_string(),
            (ParamKind::Level, ArgValue::Int(v)) => level_text(*v != 0).to_string(),
            (ParamKind::Level, ArgValue::String(s)) => s.to_ascii_uppercase(),
            _ => value.to_string(),
        };
        echo.push_str(&format!(", {}={}", param.name, rendered));
    }
    echo.push(')');
    echo
}

fn level_text(high: bool) -> &'static str {
    if high { "HIGH" } else { "LOW" }
}

fn build_request(cmd: &ParsedCommand, args: &BoundArgs<'_>) -> Result<HardwareRequest, CommandError> {
    use ActionCategory as C;
    use SubAction as S;
    let request = match (cmd.category, cmd.sub_action) {
        (C::Gpio, S::Set) => HardwareRequest::GpioSet { pin: args.int("pin")?, high: args.level("value")? },
        (C::Gpio, S::Get) => HardwareRequest::GpioGet { pin: args.int("pin")? },
        (C::Gpio, S::Direction) => {
            let direction = match args.text("direction")?.to_ascii_lowercase().as_str() {
                "input" | "in" => PinDirection::Input,
                "output" | "out" => PinDirection::Output,
                other => return Err(CommandError::InvalidParameterType(format!("unknown direction '{}'", other))),
            };
            HardwareRequest::GpioDirection { pin: args.int("pin")?, direction }
        }
        (C::Gpio, S::Pulls) => {
            let pull = match args.text("pull")?.to_ascii_lowercase().as_str() {
                "none" | "off" => PinPull::None,
                "up" => PinPull::Up,
                "down" => PinPull::Down,
                other => return Err(CommandError::InvalidParameterType(format!("unknown pull '{}'", other))),
            };
            HardwareRequest::GpioPulls { pin: args.int("pin")?, pull }
        }
        (C::Nodes, S::Connect) => HardwareRequest::ConnectNodes {
            a: args.int("a")?,
            b: args.int("b")?,
            persist: args.flag_or("save", true),
        },
        (C::Nodes, S::Disconnect) => HardwareRequest::DisconnectNodes {
            a: args.int("a")?,
            b: args.int("b")?,
            persist: args.flag_or("save", true),
        },
        (C::Nodes, S::Clear) => HardwareRequest::ClearNodes { persist: args.flag_or("save", true) },
        (C::Nodes, S::Check) => HardwareRequest::NodesConnected { a: args.int("a")?, b: args.int("b")? },
        (C::Dac, S::Set) => HardwareRequest::DacSet {
            channel: args.int("channel")?,
            volts: args.number("voltage")?,
            persist: args.flag_or("save", true),
        },
        (C::Dac, S::Get) => HardwareRequest::DacGet { channel: args.int("channel")? },
        (C::Adc, S::Get) => HardwareRequest::AdcGet { channel: args.int("channel")? },
        (C::CurrentSense, action) => {
            let quantity = match action {
                S::ShuntVoltage => SenseQuantity::ShuntVoltage,
                S::BusVoltage => SenseQuantity::BusVoltage,
                S::Power => SenseQuantity::Power,
                _ => SenseQuantity::Current,
            };
            HardwareRequest::CurrentSense { sensor: args.int_or("sensor", 0)?, quantity }
        }
        (C::Config, S::Get) => HardwareRequest::ConfigGet { section: args.text("section")?, key: args.text("key")? },
        (C::Config, S::Set) => HardwareRequest::ConfigSet {
            section: args.text("section")?,
            key: args.text("key")?,
            value: args.text("value")?,
        },
        (C::Config, S::Reset) => HardwareRequest::ConfigReset,
        (C::ResetTarget, S::Flash) => HardwareRequest::FlashTarget,
        (C::ResetTarget, _) => HardwareRequest::ResetTarget,
        (C::UartBridge, S::Connect) => HardwareRequest::UartConnect,
        (C::UartBridge, S::Disconnect) => HardwareRequest::UartDisconnect,
        (C::UartBridge, S::Set) => HardwareRequest::UartSetBaud { baud: args.int("baud")? },
        (C::UartBridge, S::Get) => HardwareRequest::UartGetBaud,
        (C::Probe, S::Simulate) => HardwareRequest::ProbeSimulate { node: args.int("node")? },
        (C::Probe, _) => HardwareRequest::ProbeRead,
        (C::ScrollInput, S::Simulate) => HardwareRequest::WheelSimulate { delta: args.int("delta")? },
        (C::ScrollInput, _) => HardwareRequest::WheelGet,
        (C::SmallDisplay, S::Print) => HardwareRequest::OledPrint { text: args.text("text")? },
        (C::SmallDisplay, S::Clear) => HardwareRequest::OledClear,
        (C::SmallDisplay, S::Connect) => HardwareRequest::OledConnect,
        (C::SmallDisplay, S::Disconnect) => HardwareRequest::OledDisconnect,
        (C::Display, S::Print) => HardwareRequest::DisplayPrint,
        (C::Display, S::Set) => HardwareRequest::DisplaySetMode { mode: args.text("mode")?.to_ascii_lowercase() },
        (C::Display, _) => HardwareRequest::DisplayGetMode,
        (C::Slot, S::Load) => HardwareRequest::SlotLoad { slot: args.int("slot")? },
        (C::Slot, S::Save) => HardwareRequest::SlotSave { slot: args.int("slot")? },
        (C::Slot, S::Clear) => HardwareRequest::SlotClear { slot: args.int("slot")? },
        (C::Slot, _) => HardwareRequest::SlotGet,
        (C::Panel, S::Set) => HardwareRequest::PanelSetBrightness { level: args.int("brightness")? },
        (C::Panel, _) => HardwareRequest::PanelGetBrightness,
        (category, action) => {
            return Err(CommandError::InvalidSubaction {
                function: category.name().to_string(),
                sub_action: action.name().to_string(),
            });
        }
    };
    Ok(request)
}

fn format_reply(echo: String, reply: HardwareReply) -> Response {
    match reply {
        HardwareReply::Done => Response::success(echo),
        HardwareReply::Level(high) => Response::value(echo, level_text(high)),
        HardwareReply::Flag(flag) => Response::value(echo, flag.to_string()),
        HardwareReply::Int(v) => Response::value(echo, v.to_string()),
        HardwareReply::Volts(v) => Response::value(echo, format!("{:.3} V", v)),
        HardwareReply::Milliamps(v) => Response::value(echo, format!("{:.3} mA", v)),
        HardwareReply::Milliwatts(v) => Response::value(echo, format!("{:.3} mW", v)),
        HardwareReply::Text(text) => Response::value(echo, text),
    }
}

/// Statistics for command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub total_commands: u64,
    pub successful_commands: u64,
    pub failed_commands: u64,
    pub hardware_calls: u64,
}

pub struct Executor<H> {
    hardware: H,
    stats: CommandStats,
}

impl<H: HardwareHandler> Executor<H> {
    pub fn new(hardware: H) -> Self {
        Self { hardware, stats: CommandStats::default() }
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn stats(&self) -> &CommandStats {
        &self.stats
    }

    /// Parse then execute; parse failures become error responses.
    pub fn run(&mut self, text: &str) -> Response {
        match parse_command(text) {
            Ok(cmd) => self.execute(&cmd),
            Err(err) => self.reject(&err),
        }
    }

    pub fn execute(&mut self, cmd: &ParsedCommand) -> Response {
        let Some(params) = shape(cmd.category, cmd.sub_action) else {
            return self.reject(&CommandError::InvalidSubaction {
                function: cmd.function_name.clone(),
                sub_action: cmd.sub_action_text.clone(),
            });
        };
        let prepared = BoundArgs::bind(cmd, params)
            .and_then(|args| build_request(cmd, &args).map(|request| (args.echo.clone(), request)));
        let (echo, request) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return self.reject(&err),
        };

        self.stats.total_commands += 1;
        self.stats.hardware_calls += 1;
        match self.hardware.handle(request) {
            Ok(reply) => {
                self.stats.successful_commands += 1;
                let response = format_reply(echo, reply);
                tracing::info!("{}", response);
                response
            }
            Err(err) => {
                self.stats.failed_commands += 1;
                tracing::warn!("{} failed: {}", echo, err);
                Response::Error { kind: ErrorKind::HardwareError, message: format!("{}: {}", echo, err) }
            }
        }
    }

    /// Count and log a command that failed before reaching the hardware.
    pub fn reject(&mut self, err: &CommandError) -> Response {
        self.stats.total_commands += 1;
        self.stats.failed_commands += 1;
        tracing::warn!("rejected command: {}", err);
        Response::from(err)
    }
}
