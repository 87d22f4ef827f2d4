// Executor scenarios against recording and simulated hardware

use protoboard::command::{translate_response, Executor, Response, TypeTag};
use protoboard::config::BoardConfig;
use protoboard::error::ErrorKind;
use protoboard::hardware::{HardwareError, HardwareHandler, HardwareReply, HardwareRequest, SimulatedBoard};

/// Records every request and answers ADC reads with a fixed voltage.
#[derive(Default)]
struct RecordingHandler {
    requests: Vec<HardwareRequest>,
    adc_volts: f64,
}

impl HardwareHandler for RecordingHandler {
    fn handle(&mut self, request: HardwareRequest) -> Result<HardwareReply, HardwareError> {
        let reply = match &request {
            HardwareRequest::AdcGet { .. } => HardwareReply::Volts(self.adc_volts),
            HardwareRequest::GpioGet { .. } => HardwareReply::Level(true),
            _ => HardwareReply::Done,
        };
        self.requests.push(request);
        Ok(reply)
    }
}

fn recording() -> Executor<RecordingHandler> {
    Executor::new(RecordingHandler { adc_volts: 1.65, ..Default::default() })
}

#[test]
fn adc_read_translates_to_float() {
    let mut executor = recording();
    let response = executor.run("adc(get, 0)");
    assert_eq!(response.to_string(), "SUCCESS: adc(get, channel=0) = 1.650 V");
    assert_eq!(executor.hardware().requests, vec![HardwareRequest::AdcGet { channel: 0 }]);

    let typed = translate_response(&response.to_string());
    assert_eq!(typed.type_tag, TypeTag::Float);
    assert!((typed.numeric - 1.65).abs() < 1e-9);
}

#[test]
fn gpio_set_drives_pin_high() {
    let mut executor = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    let response = executor.run("gpio(set, 3, HIGH)");
    assert_eq!(response.to_string(), "SUCCESS: gpio(set, pin=3, value=HIGH)");
    assert_eq!(executor.hardware().pin_high(3), Some(true));
}

#[test]
fn named_save_false_connects_without_persisting() {
    let mut executor = recording();
    let response = executor.run("nodes(connect, 1, 5, save=False)");
    assert!(!response.is_error(), "{}", response);
    assert_eq!(
        executor.hardware().requests,
        vec![HardwareRequest::ConnectNodes { a: 1, b: 5, persist: false }]
    );
}

#[test]
fn save_defaults_to_persisting() {
    let mut executor = recording();
    executor.run("connectNodes(2, 9)");
    assert_eq!(
        executor.hardware().requests,
        vec![HardwareRequest::ConnectNodes { a: 2, b: 9, persist: true }]
    );
}

#[test]
fn missing_parameter_never_reaches_hardware() {
    let mut executor = recording();
    let response = executor.run("dac(set)");
    assert_eq!(response.error_kind(), Some(ErrorKind::MissingParameter));
    assert!(executor.hardware().requests.is_empty());
    assert_eq!(executor.stats().failed_commands, 1);
    assert_eq!(executor.stats().hardware_calls, 0);
}

#[test]
fn wrong_types_are_rejected_before_hardware() {
    let mut executor = recording();
    for command in ["dac(set, 'zero', 1.0)", "gpio(set, 1, maybe)", "dac(set, 0, 1.0, 2)", "dac(set, 0, 1.0, volts=2)"] {
        let response = executor.run(command);
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidParameterType), "{}", command);
    }
    assert!(executor.hardware().requests.is_empty());
}

#[test]
fn legacy_call_matches_hierarchical_call() {
    let mut legacy = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    let mut modern = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    assert_eq!(legacy.run("setDac(0, 2.5)"), modern.run("dac(set, 0, 2.5)"));
    assert_eq!(legacy.hardware().dac_volts(0), modern.hardware().dac_volts(0));
    assert_eq!(legacy.run("getDac(0)"), modern.run("dac(get, 0)"));
}

#[test]
fn hardware_failure_becomes_error_response() {
    let mut executor = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    let response = executor.run("dac(set, 0, 12.0)");
    assert_eq!(response.error_kind(), Some(ErrorKind::HardwareError));
    assert!(response.to_string().starts_with("ERROR: dac(set, channel=0, voltage=12.0)"), "{}", response);
    assert_eq!(executor.hardware().dac_volts(0), Some(0.0));
    assert_eq!(executor.stats().failed_commands, 1);
}

#[test]
fn parse_failures_are_error_responses() {
    let mut executor = recording();
    let response = executor.run("teleport(1)");
    assert!(matches!(response, Response::Error { kind: ErrorKind::InvalidFunction, .. }));
    assert_eq!(response.to_string(), "ERROR: unknown function 'teleport'");
}

#[test]
fn query_values_carry_types() {
    let board = SimulatedBoard::new(BoardConfig::default()).with_sense_current(0, 12.5);
    let mut executor = Executor::new(board);

    let level = translate_response(&executor.run("gpio(get, 1)").to_string());
    assert_eq!(level.as_bool(), Some(false));

    let current = translate_response(&executor.run("ina(current)").to_string());
    assert_eq!(current.type_tag, TypeTag::Float);
    assert!((current.numeric - 12.5).abs() < 1e-9);

    let baud = translate_response(&executor.run("uart(get)").to_string());
    assert_eq!((baud.type_tag, baud.numeric), (TypeTag::Int, 115_200.0));

    let mode = translate_response(&executor.run("display(get)").to_string());
    assert_eq!((mode.type_tag, mode.value_text.as_str()), (TypeTag::String, "nets"));

    executor.run("nodes(connect, 1, 5)");
    let check = translate_response(&executor.run("nodes(check, 5, 1)").to_string());
    assert_eq!(check.as_bool(), Some(true));
}

#[test]
fn slot_round_trip_restores_connections() {
    let mut executor = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    executor.run("nodes(connect, 10, 20)");
    assert!(!executor.run("saveSlot(2)").is_error());
    executor.run("clearNodes()");
    assert!(!executor.hardware().is_connected(10, 20));
    executor.run("slot(load, 2)");
    assert!(executor.hardware().is_connected(10, 20));
}

#[test]
fn flash_needs_uart() {
    let mut executor = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    assert_eq!(executor.run("flashArduino()").error_kind(), Some(ErrorKind::HardwareError));
    executor.run("connectUart()");
    assert!(!executor.run("flashArduino()").is_error());
}

#[test]
fn separators_in_text_do_not_split_values() {
    let mut executor = Executor::new(SimulatedBoard::new(BoardConfig::default()));
    executor.run("oled(connect)");
    let printed = translate_response(&executor.run("oled(print, 'v = 3 ')").to_string());
    assert_eq!(printed.type_tag, TypeTag::String);
    assert_eq!(printed.numeric, 0.0);

    assert!(!executor.run("config(set, display, rotation, 'a = b')").is_error());
    let stored = translate_response(&executor.run("config(get, display, rotation)").to_string());
    assert_eq!((stored.type_tag, stored.value_text.as_str()), (TypeTag::String, "a = b"));
}
