// src/bridge/mod.rs - Console hook, synchronous bridge and deferred queue
//!
//! The [`Engine`] is the one context object the top-level loop owns. Script
//! code reaches it by printing sentinel lines: the console-output hook
//! ([`Engine::on_console_line`]) recognises them, runs the command and
//! publishes the result back into the runtime. Everything else passes
//! through to the console unchanged apart from line endings.
//!
//! Two paths exist:
//!
//! - sync: executed inline inside the hook, typed result published as
//!   `_sync_*` globals and polled for by [`Engine::call_sync`];
//! - queued: appended to a bounded [`CommandQueue`] and executed later by
//!   [`Engine::drain_queue`] from the top-level loop.

pub mod cache;
pub mod queue;
pub mod runtime;

pub use cache::ParseCache;
pub use queue::{CommandQueue, QueueEntry};
pub use runtime::{HostRuntime, ScriptError, ScriptRuntime, ScriptValue};

use std::collections::VecDeque;

use crate::command::executor::{CommandStats, Executor};
use crate::command::response::{translate_response, Response, TypeTag, TypedResult};
use crate::config::ProtocolConfig;
use crate::error::CommandError;
use crate::hardware::HardwareHandler;

pub const SYNC_READY_GLOBAL: &str = "_sync_result_ready";
pub const SYNC_VALUE_GLOBAL: &str = "_sync_value";
pub const SYNC_TYPE_GLOBAL: &str = "_sync_type";
pub const SYNC_NUMERIC_GLOBAL: &str = "_sync_numeric";
pub const QUEUED_COMMAND_GLOBAL: &str = "_queued_command";
pub const QUEUED_RESULT_GLOBAL: &str = "_queued_result";

/// Echoed response lines kept until the host takes them; oldest drop first.
pub const CONSOLE_BACKLOG: usize = 64;

/// Result slot shared by the hook and the polling wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub result_ready: bool,
    pub value_text: String,
    pub type_tag: TypeTag,
    pub numeric_result: f64,
}

impl Default for SyncState {
    fn default() -> Self {
        Self { result_ready: false, value_text: String::new(), type_tag: TypeTag::String, numeric_result: 0.0 }
    }
}

impl SyncState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn populate(&mut self, result: &TypedResult) {
        self.value_text = result.value_text.clone();
        self.type_tag = result.type_tag;
        self.numeric_result = result.numeric;
        self.result_ready = true;
    }

    pub fn result(&self) -> Option<TypedResult> {
        self.result_ready.then(|| TypedResult {
            value_text: self.value_text.clone(),
            type_tag: self.type_tag,
            numeric: self.numeric_result,
        })
    }
}

/// What the console hook did with one line.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Sync sentinel executed inline.
    Executed(Response),
    /// Appended to the queue; `pending` entries now waiting.
    Queued { pending: usize },
    /// Could not be queued.
    Rejected(CommandError),
    /// Ordinary output, `\r\n` line endings.
    Passthrough(String),
}

pub struct Engine<H> {
    executor: Executor<H>,
    cache: ParseCache,
    queue: CommandQueue,
    sync: SyncState,
    protocol: ProtocolConfig,
    console: VecDeque<String>,
}

impl<H: HardwareHandler> Engine<H> {
    pub fn new(hardware: H, protocol: ProtocolConfig) -> Self {
        Self {
            executor: Executor::new(hardware),
            cache: ParseCache::new(protocol.parse_cache_capacity),
            queue: CommandQueue::new(protocol.queue_capacity),
            sync: SyncState::default(),
            protocol,
            console: VecDeque::with_capacity(CONSOLE_BACKLOG),
        }
    }

    pub fn hardware(&self) -> &H {
        self.executor.hardware()
    }

    pub fn stats(&self) -> &CommandStats {
        self.executor.stats()
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Response lines echoed since the last call, at most [`CONSOLE_BACKLOG`].
    pub fn take_console(&mut self) -> Vec<String> {
        self.console.drain(..).collect()
    }

    /// Parse through the cache, then execute.
    pub fn execute_text(&mut self, text: &str) -> Response {
        match self.cache.get_or_parse(text.trim()) {
            Ok(cmd) => self.executor.execute(&cmd),
            Err(err) => self.executor.reject(&err),
        }
    }

    /// Console-output hook. Called with every line the runtime prints.
    pub fn on_console_line<R: ScriptRuntime + ?Sized>(&mut self, runtime: &mut R, line: &str) -> HookOutcome {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if let Some(command) = trimmed.strip_prefix(self.protocol.sync_prefix.as_str()) {
            if !runtime.reentry_safe() {
                tracing::debug!("runtime not re-entry safe, deferring '{}'", command);
                return self.defer(command);
            }
            return HookOutcome::Executed(self.run_inline(runtime, command));
        }
        if let Some(command) = trimmed.strip_prefix(self.protocol.queue_prefix.as_str()) {
            return self.defer(command);
        }
        HookOutcome::Passthrough(normalize_line_endings(line))
    }

    /// Run a command through the sync sentinel and wait for its typed result.
    ///
    /// `ERROR:` responses surface as [`CommandError::Rejected`]. A runtime
    /// that is not re-entry safe gets the command queued instead and this
    /// returns [`CommandError::Deferred`].
    pub async fn call_sync<R: ScriptRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        command: &str,
    ) -> Result<TypedResult, CommandError> {
        self.sync.reset();
        if let Err(err) = runtime.set_global(SYNC_READY_GLOBAL, ScriptValue::Bool(false)) {
            tracing::warn!("could not clear {}: {}", SYNC_READY_GLOBAL, err);
        }
        let line = format!("{}{}", self.protocol.sync_prefix, command);
        match self.on_console_line(runtime, &line) {
            HookOutcome::Queued { pending } => return Err(CommandError::Deferred { pending }),
            HookOutcome::Rejected(err) => return Err(err),
            HookOutcome::Executed(_) | HookOutcome::Passthrough(_) => {}
        }
        let result = self.wait_for_result().await?;
        if result.is_error() {
            return Err(CommandError::Rejected(result.value_text));
        }
        Ok(result)
    }

    /// Queue a command through the queue sentinel. Returns the pending count.
    pub fn call_queued<R: ScriptRuntime + ?Sized>(&mut self, runtime: &mut R, command: &str) -> Result<usize, CommandError> {
        let line = format!("{}{}", self.protocol.queue_prefix, command);
        match self.on_console_line(runtime, &line) {
            HookOutcome::Queued { pending } => Ok(pending),
            HookOutcome::Rejected(err) => Err(err),
            other => Err(CommandError::InvalidCommand(format!("unexpected hook outcome {:?}", other))),
        }
    }

    /// Poll the ready flag for at most `poll_attempts` intervals.
    pub async fn wait_for_result(&self) -> Result<TypedResult, CommandError> {
        let attempts = self.protocol.poll_attempts;
        for _ in 0..attempts {
            if let Some(result) = self.sync.result() {
                return Ok(result);
            }
            tokio::time::sleep(self.protocol.poll_interval()).await;
        }
        tracing::warn!("no sync result after {} polls", attempts);
        Err(CommandError::SyncTimeout { attempts })
    }

    /// Execute every pending queue entry in FIFO order. Only call this from
    /// the top-level loop, never from inside the hook.
    pub fn drain_queue<R: ScriptRuntime + ?Sized>(&mut self, runtime: &mut R) -> Vec<QueueEntry> {
        let mut drained = Vec::with_capacity(self.queue.len());
        while let Some(mut entry) = self.queue.pop() {
            let response = self.execute_text(&entry.command_text);
            entry.response_text = response.to_string();
            self.echo(&entry.response_text);

            let code = assignments(&[
                (QUEUED_COMMAND_GLOBAL, ScriptValue::Str(entry.command_text.clone())),
                (QUEUED_RESULT_GLOBAL, ScriptValue::Str(entry.response_text.clone())),
            ]);
            if let Err(err) = runtime.exec_string(&code) {
                tracing::warn!("could not publish queued result: {}", err);
            }
            drained.push(entry);
        }
        if !drained.is_empty() {
            tracing::debug!("drained {} queued commands", drained.len());
        }
        drained
    }

    fn defer(&mut self, command: &str) -> HookOutcome {
        match self.queue.enqueue(command.trim()) {
            Ok(pending) => {
                tracing::debug!("queued '{}' ({} pending)", command.trim(), pending);
                HookOutcome::Queued { pending }
            }
            Err(err) => {
                tracing::warn!("could not queue '{}': {}", command.trim(), err);
                HookOutcome::Rejected(err)
            }
        }
    }

    fn run_inline<R: ScriptRuntime + ?Sized>(&mut self, runtime: &mut R, command: &str) -> Response {
        let response = self.execute_text(command);
        let line = response.to_string();
        self.echo(&line);

        let result = translate_response(&line);
        self.sync.populate(&result);
        // Ready flag goes last so a partially applied block never reads as done.
        let code = assignments(&[
            (SYNC_VALUE_GLOBAL, ScriptValue::Str(result.value_text.clone())),
            (SYNC_TYPE_GLOBAL, ScriptValue::Str(result.type_tag.as_str().to_string())),
            (SYNC_NUMERIC_GLOBAL, ScriptValue::Float(result.numeric)),
            (SYNC_READY_GLOBAL, ScriptValue::Bool(true)),
        ]);
        if let Err(err) = runtime.exec_string(&code) {
            tracing::warn!("could not publish sync result: {}", err);
        }
        response
    }

    fn echo(&mut self, line: &str) {
        if self.console.len() >= CONSOLE_BACKLOG {
            self.console.pop_front();
            tracing::debug!("console backlog full, dropped oldest line");
        }
        self.console.push_back(line.to_string());
    }
}

/// One code block assigning every pair, so publishing is a single re-entry.
fn assignments(pairs: &[(&str, ScriptValue)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value.literal()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite `\n`, `\r` and `\r\n` as `\r\n`, ending with exactly one.
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            c => out.push(c),
        }
    }
    if !out.ends_with("\r\n") {
        out.push_str("\r\n");
    }
    out
}
