/// Centralized argument handling for the stream client
///
/// Debug flags are read straight from the process arguments so that library
/// code (logger, transport, supervisor) can check them without threading a
/// parsed CLI struct through every call.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Per-module `--debug-<module>` flag checks
/// - Small helpers shared by the logger and the `stream_monitor` binary
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Client lifecycle debug mode (connect/disconnect, driver commands)
pub fn is_debug_system_enabled() -> bool {
    has_arg("--debug-system")
}

/// Transport connection debug mode (socket open/close, raw sends)
pub fn is_debug_transport_enabled() -> bool {
    has_arg("--debug-transport")
}

/// Reconnection supervisor debug mode (state transitions, timers)
pub fn is_debug_supervisor_enabled() -> bool {
    has_arg("--debug-supervisor")
}

/// Subscription manager debug mode
pub fn is_debug_subscription_enabled() -> bool {
    has_arg("--debug-subscription")
}

/// Message classifier debug mode (logs frame previews)
pub fn is_debug_classifier_enabled() -> bool {
    has_arg("--debug-classifier")
}

/// Synthetic fallback generator debug mode
pub fn is_debug_fallback_enabled() -> bool {
    has_arg("--debug-fallback")
}

/// Stats aggregator debug mode
pub fn is_debug_stats_enabled() -> bool {
    has_arg("--debug-stats")
}

/// Notification lifecycle debug mode
pub fn is_debug_notifications_enabled() -> bool {
    has_arg("--debug-notifications")
}

/// Verbose mode - very detailed tracing for every tag
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose") || has_arg("-v")
}

/// Quiet mode - only warnings and errors
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet") || has_arg("-q")
}

/// Log file path given with `--log-file <path>`
pub fn get_log_file_arg() -> Option<String> {
    get_arg_value("--log-file")
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let checks: [(&'static str, fn() -> bool); 8] = [
        ("system", is_debug_system_enabled),
        ("transport", is_debug_transport_enabled),
        ("supervisor", is_debug_supervisor_enabled),
        ("subscription", is_debug_subscription_enabled),
        ("classifier", is_debug_classifier_enabled),
        ("fallback", is_debug_fallback_enabled),
        ("stats", is_debug_stats_enabled),
        ("notifications", is_debug_notifications_enabled),
    ];

    let mut modes: Vec<&'static str> = checks
        .iter()
        .filter(|(_, check)| check())
        .map(|(name, _)| *name)
        .collect();

    if is_verbose_enabled() {
        modes.push("verbose");
    }

    modes
}

/// Checks if any debug mode is enabled
pub fn is_any_debug_enabled() -> bool {
    !get_enabled_debug_modes().is_empty()
}

/// Prints debug information about enabled debug modes
pub fn print_debug_info() {
    let enabled_modes = get_enabled_debug_modes();
    if enabled_modes.is_empty() {
        println!("No debug modes enabled");
    } else {
        println!("Enabled debug modes: {:?}", enabled_modes);
    }
}
