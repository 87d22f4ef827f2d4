// src/lib.rs - Protoboard command protocol engine
//!
//! Scripts running on the board talk to the firmware in a flat call syntax,
//! `dac(set, 0, 2.5)` or the legacy `setDac(0, 2.5)`. This crate parses those
//! calls, validates them against per-command parameter shapes, runs them
//! against a [`hardware::HardwareHandler`] and formats `SUCCESS:`/`ERROR:`
//! response lines. The [`bridge`] module carries commands between the
//! scripting runtime and the engine through sentinel console lines.

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod hardware;

pub use bridge::{Engine, HookOutcome, HostRuntime, ScriptRuntime, ScriptValue};
pub use command::{parse_command, translate_response, ParsedCommand, Response, TypedResult};
pub use config::{load_config, EngineConfig};
pub use error::{CommandError, ErrorKind};
pub use hardware::{HardwareHandler, SimulatedBoard};
