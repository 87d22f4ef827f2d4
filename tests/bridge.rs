// Console hook, synchronous bridge and command queue

use protoboard::bridge::{
    Engine, HookOutcome, HostRuntime, ScriptError, ScriptRuntime, ScriptValue, QUEUED_RESULT_GLOBAL,
    SYNC_NUMERIC_GLOBAL, SYNC_READY_GLOBAL, SYNC_VALUE_GLOBAL,
};
use protoboard::command::TypeTag;
use protoboard::config::{BoardConfig, ProtocolConfig};
use protoboard::error::CommandError;
use protoboard::hardware::SimulatedBoard;

fn engine_with(protocol: ProtocolConfig) -> Engine<SimulatedBoard> {
    let board = SimulatedBoard::new(BoardConfig::default()).with_adc_reading(0, 1.65);
    Engine::new(board, protocol)
}

fn engine() -> Engine<SimulatedBoard> {
    engine_with(ProtocolConfig::default())
}

#[tokio::test]
async fn sync_call_returns_typed_value_and_publishes_globals() {
    let mut engine = engine();
    let mut runtime = HostRuntime::new();

    let result = engine.call_sync(&mut runtime, "adc(get, 0)").await.unwrap();
    assert_eq!(result.type_tag, TypeTag::Float);
    assert_eq!(result.value_text, "1.650");

    assert_eq!(runtime.global(SYNC_READY_GLOBAL), Some(&ScriptValue::Bool(true)));
    assert_eq!(runtime.global(SYNC_VALUE_GLOBAL), Some(&ScriptValue::Str("1.650".to_string())));
    assert_eq!(runtime.global(SYNC_NUMERIC_GLOBAL), Some(&ScriptValue::Float(1.65)));
    assert_eq!(engine.take_console(), vec!["SUCCESS: adc(get, channel=0) = 1.650 V".to_string()]);
}

#[tokio::test]
async fn error_response_surfaces_as_rejected() {
    let mut engine = engine();
    let mut runtime = HostRuntime::new();
    let err = engine.call_sync(&mut runtime, "dac(set)").await.unwrap_err();
    match err {
        CommandError::Rejected(message) => assert!(message.contains("missing parameter 'channel'"), "{}", message),
        other => panic!("expected Rejected, got {:?}", other),
    }
    assert!(engine.sync_state().result_ready);
    assert_eq!(engine.sync_state().type_tag, TypeTag::Error);
}

#[tokio::test]
async fn wait_times_out_without_a_result() {
    let protocol = ProtocolConfig { poll_attempts: 3, poll_interval_us: 10, ..ProtocolConfig::default() };
    let engine = engine_with(protocol);
    assert_eq!(engine.wait_for_result().await, Err(CommandError::SyncTimeout { attempts: 3 }));
}

#[tokio::test]
async fn non_reentrant_runtime_defers_to_queue() {
    let mut engine = engine();
    let mut runtime = HostRuntime::non_reentrant();

    let err = engine.call_sync(&mut runtime, "gpio(set, 2, HIGH)").await.unwrap_err();
    assert_eq!(err, CommandError::Deferred { pending: 1 });
    assert_eq!(engine.hardware().pin_high(2), Some(false));
    // only the ready-flag reset reached the runtime
    assert_eq!(runtime.exec_calls(), 1);

    let drained = engine.drain_queue(&mut runtime);
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].response_text, "SUCCESS: gpio(set, pin=2, value=HIGH)");
    assert_eq!(engine.hardware().pin_high(2), Some(true));
}

#[tokio::test]
async fn deferred_call_clears_stale_ready_flag() {
    let mut engine = engine();
    let mut runtime = HostRuntime::non_reentrant();
    runtime.set_global(SYNC_READY_GLOBAL, ScriptValue::Bool(true)).unwrap();

    let err = engine.call_sync(&mut runtime, "adc(get, 0)").await.unwrap_err();
    assert_eq!(err, CommandError::Deferred { pending: 1 });
    assert_eq!(runtime.global(SYNC_READY_GLOBAL), Some(&ScriptValue::Bool(false)));
}

#[test]
fn plain_output_passes_through_with_crlf() {
    let mut engine = engine();
    let mut runtime = HostRuntime::new();
    let outcome = engine.on_console_line(&mut runtime, "hello\nworld\n");
    assert_eq!(outcome, HookOutcome::Passthrough("hello\r\nworld\r\n".to_string()));
    assert_eq!(engine.stats().total_commands, 0);
}

#[test]
fn queue_rejects_sixth_and_drains_in_order() {
    let mut engine = engine();
    let mut runtime = HostRuntime::new();
    let commands = [
        "nodes(connect, 1, 2)",
        "nodes(connect, 3, 4)",
        "dac(set, 0, 1.5)",
        "gpio(set, 1, HIGH)",
        "wheel(simulate, 3)",
        "slot(save, 1)",
    ];
    for (i, command) in commands.iter().take(5).enumerate() {
        assert_eq!(engine.call_queued(&mut runtime, command), Ok(i + 1));
    }
    assert_eq!(engine.call_queued(&mut runtime, commands[5]), Err(CommandError::QueueFull { capacity: 5 }));

    let drained = engine.drain_queue(&mut runtime);
    let order: Vec<&str> = drained.iter().map(|e| e.command_text.as_str()).collect();
    assert_eq!(order, &commands[..5]);
    assert!(drained.iter().all(|e| e.response_text.starts_with("SUCCESS:")));
    assert!(engine.queue().is_empty());
    assert_eq!(
        runtime.global(QUEUED_RESULT_GLOBAL),
        Some(&ScriptValue::Str("SUCCESS: wheel(simulate, delta=3)".to_string()))
    );
}

#[test]
fn queued_errors_are_reported_once() {
    let mut engine = engine();
    let mut runtime = HostRuntime::new();
    engine.on_console_line(&mut runtime, "::QUEUE::nodes(connect, 0, 2)\r\n");
    let drained = engine.drain_queue(&mut runtime);
    assert_eq!(drained.len(), 1);
    assert!(drained[0].response_text.starts_with("ERROR:"));
    assert!(engine.drain_queue(&mut runtime).is_empty());
}

/// Runtime whose `exec_string` always fails; publishing must not break execution.
struct BrokenRuntime;

impl ScriptRuntime for BrokenRuntime {
    fn exec_string(&mut self, _code: &str) -> Result<(), ScriptError> {
        Err(ScriptError::Runtime("interpreter busy".to_string()))
    }
}

#[tokio::test]
async fn publish_failure_does_not_lose_the_result() {
    let mut engine = engine();
    let mut runtime = BrokenRuntime;
    let result = engine.call_sync(&mut runtime, "slot(get)").await.unwrap();
    assert_eq!((result.type_tag, result.numeric), (TypeTag::Int, 0.0));
}

#[tokio::test]
async fn custom_sentinels() {
    let protocol = ProtocolConfig {
        sync_prefix: "@@S@@".to_string(),
        queue_prefix: "@@Q@@".to_string(),
        ..ProtocolConfig::default()
    };
    let mut engine = engine_with(protocol);
    let mut runtime = HostRuntime::new();
    assert!(matches!(
        engine.on_console_line(&mut runtime, "::SYNC::slot(get)"),
        HookOutcome::Passthrough(_)
    ));
    assert!(engine.call_sync(&mut runtime, "slot(get)").await.is_ok());
}
