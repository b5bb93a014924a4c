/// Log tags identify which component produced a line
///
/// Each tag maps to a `--debug-<key>` flag that enables its debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Transport,
    Supervisor,
    Subscription,
    Classifier,
    Fallback,
    Stats,
    Notifications,
}

impl LogTag {
    /// Key used in `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Transport => "transport",
            LogTag::Supervisor => "supervisor",
            LogTag::Subscription => "subscription",
            LogTag::Classifier => "classifier",
            LogTag::Fallback => "fallback",
            LogTag::Stats => "stats",
            LogTag::Notifications => "notifications",
        }
        .to_string()
    }

    /// Uppercase label without colors, used in log files
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Transport => "TRANSPORT",
            LogTag::Supervisor => "SUPERVISOR",
            LogTag::Subscription => "SUBSCRIBE",
            LogTag::Classifier => "CLASSIFY",
            LogTag::Fallback => "FALLBACK",
            LogTag::Stats => "STATS",
            LogTag::Notifications => "NOTIFY",
        }
        .to_string()
    }

    pub fn all() -> [LogTag; 8] {
        [
            LogTag::System,
            LogTag::Transport,
            LogTag::Supervisor,
            LogTag::Subscription,
            LogTag::Classifier,
            LogTag::Fallback,
            LogTag::Stats,
            LogTag::Notifications,
        ]
    }
}
