// src/command/mod.rs
pub mod argument;
pub mod dispatch;
pub mod executor;
pub mod parser;
pub mod response;

pub use argument::{parse_argument, ArgValue, CommandArgument};
pub use dispatch::{ActionCategory, SubAction, SubActionSource};
pub use executor::{CommandStats, Executor};
pub use parser::{parse_command, ParsedCommand};
pub use response::{translate_response, Response, TypeTag, TypedResult};
