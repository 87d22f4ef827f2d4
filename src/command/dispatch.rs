// src/command/dispatch.rs - Function name and sub-action lookup tables
//!
//! Pure lookup layer. A function name resolves to an [`ActionCategory`] and a
//! [`SubActionSource`] saying where its sub-action comes from: the first
//! positional argument (`dac(set, 0, 2.5)`) or a verb in the name itself
//! (`setDac(0, 2.5)`). New actions are one row here plus one executor arm.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    Gpio,
    Nodes,
    Dac,
    Adc,
    CurrentSense,
    Config,
    ResetTarget,
    UartBridge,
    Probe,
    ScrollInput,
    SmallDisplay,
    Display,
    Slot,
    Panel,
}

impl ActionCategory {
    /// Hierarchical function name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gpio => "gpio",
            Self::Nodes => "nodes",
            Self::Dac => "dac",
            Self::Adc => "adc",
            Self::CurrentSense => "ina",
            Self::Config => "config",
            Self::ResetTarget => "target",
            Self::UartBridge => "uart",
            Self::Probe => "probe",
            Self::ScrollInput => "wheel",
            Self::SmallDisplay => "oled",
            Self::Display => "display",
            Self::Slot => "slot",
            Self::Panel => "panel",
        }
    }

    /// Accepted sub-action keywords; several keywords may share one action.
    pub fn sub_actions(&self) -> &'static [(&'static str, SubAction)] {
        use SubAction::*;
        match self {
            Self::Gpio => &[("set", Set), ("get", Get), ("direction", Direction), ("dir", Direction), ("pulls", Pulls), ("pull", Pulls)],
            Self::Nodes => &[("connect", Connect), ("add", Connect), ("disconnect", Disconnect), ("remove", Disconnect), ("clear", Clear), ("check", Check)],
            Self::Dac => &[("set", Set), ("get", Get)],
            Self::Adc => &[("get", Get), ("read", Get)],
            Self::CurrentSense => &[("current", Current), ("get", Current), ("shunt", ShuntVoltage), ("voltage", BusVoltage), ("bus_voltage", BusVoltage), ("power", Power)],
            Self::Config => &[("get", Get), ("set", Set), ("reset", Reset)],
            Self::ResetTarget => &[("reset", Reset), ("flash", Flash)],
            Self::UartBridge => &[("connect", Connect), ("disconnect", Disconnect), ("set", Set), ("get", Get)],
            Self::Probe => &[("get", Get), ("read", Get), ("simulate", Simulate)],
            Self::ScrollInput => &[("get", Get), ("simulate", Simulate)],
            Self::SmallDisplay => &[("print", Print), ("clear", Clear), ("connect", Connect), ("disconnect", Disconnect)],
            Self::Display => &[("print", Print), ("set", Set), ("get", Get)],
            Self::Slot => &[("load", Load), ("save", Save), ("clear", Clear), ("get", Get)],
            Self::Panel => &[("set", Set), ("get", Get)],
        }
    }

    pub fn lookup_sub_action(&self, keyword: &str) -> Option<SubAction> {
        self.sub_actions()
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            .map(|(_, action)| *action)
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAction {
    Set,
    Get,
    Direction,
    Pulls,
    Connect,
    Disconnect,
    Clear,
    Check,
    Current,
    ShuntVoltage,
    BusVoltage,
    Power,
    Reset,
    Flash,
    Print,
    Simulate,
    Load,
    Save,
}

impl SubAction {
    /// Canonical keyword, used when re-rendering a command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Get => "get",
            Self::Direction => "direction",
            Self::Pulls => "pulls",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Clear => "clear",
            Self::Check => "check",
            Self::Current => "current",
            Self::ShuntVoltage => "shunt",
            Self::BusVoltage => "voltage",
            Self::Power => "power",
            Self::Reset => "reset",
            Self::Flash => "flash",
            Self::Print => "print",
            Self::Simulate => "simulate",
            Self::Load => "load",
            Self::Save => "save",
        }
    }
}

impl fmt::Display for SubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a resolved function takes its sub-action from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubActionSource {
    /// First positional argument names the sub-action.
    Keyword,
    /// Sub-action is the verb the function name starts with.
    Verb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    pub function: &'static str,
    pub category: ActionCategory,
    pub source: SubActionSource,
}

const fn keyword(function: &'static str, category: ActionCategory) -> DispatchEntry {
    DispatchEntry { function, category, source: SubActionSource::Keyword }
}

const fn legacy(function: &'static str, category: ActionCategory) -> DispatchEntry {
    DispatchEntry { function, category, source: SubActionSource::Verb }
}

static DISPATCH_TABLE: &[DispatchEntry] = &[
    keyword("gpio", ActionCategory::Gpio),
    keyword("nodes", ActionCategory::Nodes),
    keyword("dac", ActionCategory::Dac),
    keyword("adc", ActionCategory::Adc),
    keyword("ina", ActionCategory::CurrentSense),
    keyword("config", ActionCategory::Config),
    keyword("target", ActionCategory::ResetTarget),
    keyword("uart", ActionCategory::UartBridge),
    keyword("probe", ActionCategory::Probe),
    keyword("wheel", ActionCategory::ScrollInput),
    keyword("oled", ActionCategory::SmallDisplay),
    keyword("display", ActionCategory::Display),
    keyword("slot", ActionCategory::Slot),
    keyword("panel", ActionCategory::Panel),
    legacy("setGpio", ActionCategory::Gpio),
    legacy("getGpio", ActionCategory::Gpio),
    legacy("connectNodes", ActionCategory::Nodes),
    legacy("disconnectNodes", ActionCategory::Nodes),
    legacy("addBridge", ActionCategory::Nodes),
    legacy("removeBridge", ActionCategory::Nodes),
    legacy("clearNodes", ActionCategory::Nodes),
    legacy("setDac", ActionCategory::Dac),
    legacy("getDac", ActionCategory::Dac),
    legacy("getAdc", ActionCategory::Adc),
    legacy("getCurrent", ActionCategory::CurrentSense),
    legacy("getConfig", ActionCategory::Config),
    legacy("setConfig", ActionCategory::Config),
    legacy("resetConfig", ActionCategory::Config),
    legacy("resetArduino", ActionCategory::ResetTarget),
    legacy("flashArduino", ActionCategory::ResetTarget),
    legacy("connectUart", ActionCategory::UartBridge),
    legacy("disconnectUart", ActionCategory::UartBridge),
    legacy("setUartBaud", ActionCategory::UartBridge),
    legacy("getUartBaud", ActionCategory::UartBridge),
    legacy("getProbe", ActionCategory::Probe),
    legacy("simulateProbe", ActionCategory::Probe),
    legacy("getWheel", ActionCategory::ScrollInput),
    legacy("simulateWheel", ActionCategory::ScrollInput),
    legacy("printOled", ActionCategory::SmallDisplay),
    legacy("clearOled", ActionCategory::SmallDisplay),
    legacy("connectOled", ActionCategory::SmallDisplay),
    legacy("disconnectOled", ActionCategory::SmallDisplay),
    legacy("printNets", ActionCategory::Display),
    legacy("setDisplayMode", ActionCategory::Display),
    legacy("getDisplayMode", ActionCategory::Display),
    legacy("loadSlot", ActionCategory::Slot),
    legacy("saveSlot", ActionCategory::Slot),
    legacy("clearSlot", ActionCategory::Slot),
    legacy("getSlot", ActionCategory::Slot),
    legacy("setBrightness", ActionCategory::Panel),
    legacy("getBrightness", ActionCategory::Panel),
];

/// Verbs a legacy function name may start with.
const VERBS: &[&str] = &[
    "set", "get", "connect", "remove", "add", "clear", "load", "save", "reset", "flash",
    "disconnect", "simulate", "print",
];

pub fn dispatch_table() -> &'static [DispatchEntry] {
    DISPATCH_TABLE
}

/// Resolve a function name, ignoring ASCII case.
pub fn resolve_function(name: &str) -> Option<&'static DispatchEntry> {
    DISPATCH_TABLE.iter().find(|entry| entry.function.eq_ignore_ascii_case(name))
}

/// Longest verb that prefixes `function`, ignoring ASCII case.
pub fn leading_verb(function: &str) -> Option<&'static str> {
    let lower = function.to_ascii_lowercase();
    VERBS
        .iter()
        .filter(|verb| lower.starts_with(**verb))
        .max_by_key(|verb| verb.len())
        .copied()
}

/// Sub-action implied by a legacy name, checked against the category table.
pub fn infer_sub_action(function: &str, category: ActionCategory) -> Option<SubAction> {
    leading_verb(function).and_then(|verb| category.lookup_sub_action(verb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_legacy_row_implies_a_known_sub_action() {
        for entry in dispatch_table().iter().filter(|e| e.source == SubActionSource::Verb) {
            assert!(
                infer_sub_action(entry.function, entry.category).is_some(),
                "{} has no usable verb",
                entry.function
            );
        }
    }

    #[test]
    fn every_category_has_a_hierarchical_name() {
        for entry in dispatch_table().iter().filter(|e| e.source == SubActionSource::Keyword) {
            assert_eq!(entry.function, entry.category.name());
        }
    }

    #[test]
    fn disconnect_wins_over_connect() {
        assert_eq!(leading_verb("disconnectNodes"), Some("disconnect"));
        assert_eq!(leading_verb("resetArduino"), Some("reset"));
        assert_eq!(leading_verb("Nodes"), None);
    }

    #[test]
    fn aliases_share_actions() {
        assert_eq!(infer_sub_action("removeBridge", ActionCategory::Nodes), Some(SubAction::Disconnect));
        assert_eq!(infer_sub_action("addBridge", ActionCategory::Nodes), Some(SubAction::Connect));
        assert_eq!(ActionCategory::Gpio.lookup_sub_action("DIR"), Some(SubAction::Direction));
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(resolve_function("DAC").map(|e| e.category), Some(ActionCategory::Dac));
        assert_eq!(resolve_function("setdac").map(|e| e.source), Some(SubActionSource::Verb));
        assert!(resolve_function("teleport").is_none());
    }
}
