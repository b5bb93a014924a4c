/// Reconnection supervisor: the connection lifecycle as a pure function
///
/// `transition(state, event)` returns the next state plus the ordered list
/// of side effects the driver must execute. Nothing here touches sockets,
/// timers or clocks, so every edge of the lifecycle is unit-testable.
use super::types::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Consumer called `connect`
    Start,
    /// Transport reported `onOpen`
    Opened,
    /// Transport reported `onClose` or `onError`
    ConnectionLost,
    /// Reconnect timer fired
    ReconnectDue,
    /// Fallback activation timer fired
    FallbackDue,
    /// Consumer called `disconnect`
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open a transport with a fresh client id
    OpenTransport,
    CloseTransport,
    ScheduleReconnect,
    CancelReconnect,
    ScheduleFallback,
    CancelFallback,
    StartGenerator,
    StopGenerator,
    /// Hand the desired channel set to the freshly opened transport
    ResendSubscriptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisorState {
    pub connection: ConnectionState,
    /// Single exclusive "active generator" flag
    pub generator_active: bool,
    pub ever_connected: bool,
    /// Open attempts since `Start`
    pub attempts: u32,
    pub fallback_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SupervisorState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: &SupervisorState) -> Self {
        Self {
            next: *state,
            effects: Vec::new(),
        }
    }

    pub fn changes_connection(&self, previous: &SupervisorState) -> bool {
        self.next.connection != previous.connection
    }
}

pub fn transition(state: &SupervisorState, event: SupervisorEvent) -> Transition {
    use ConnectionState::*;

    let mut next = *state;
    let mut effects = Vec::new();

    match (state.connection, event) {
        (Disconnected, SupervisorEvent::Start) => {
            next.connection = Connecting;
            next.attempts = 1;
            effects.push(Effect::OpenTransport);
        }

        (Connecting | FallbackActive, SupervisorEvent::Opened) => {
            next.connection = Connected;
            next.ever_connected = true;
            if state.fallback_pending {
                next.fallback_pending = false;
                effects.push(Effect::CancelFallback);
            }
            if state.generator_active {
                next.generator_active = false;
                effects.push(Effect::StopGenerator);
            }
            effects.push(Effect::ResendSubscriptions);
        }

        (Connecting, SupervisorEvent::ConnectionLost) => {
            next.connection = Reconnecting;
            effects.push(Effect::CloseTransport);
            let first_failure =
                state.attempts <= 1 && !state.ever_connected && !state.generator_active;
            if first_failure && !state.fallback_pending {
                next.fallback_pending = true;
                effects.push(Effect::ScheduleFallback);
            }
            effects.push(Effect::ScheduleReconnect);
        }

        (Connected, SupervisorEvent::ConnectionLost) => {
            next.connection = Reconnecting;
            effects.push(Effect::CloseTransport);
            effects.push(Effect::ScheduleReconnect);
        }

        // Degraded mode keeps retrying in the background
        (FallbackActive, SupervisorEvent::ConnectionLost) => {
            effects.push(Effect::CloseTransport);
            effects.push(Effect::ScheduleReconnect);
        }

        (Reconnecting, SupervisorEvent::ReconnectDue) => {
            next.connection = Connecting;
            next.attempts = state.attempts.saturating_add(1);
            effects.push(Effect::OpenTransport);
        }

        (FallbackActive, SupervisorEvent::ReconnectDue) => {
            next.attempts = state.attempts.saturating_add(1);
            effects.push(Effect::OpenTransport);
        }

        (Reconnecting | Connecting, SupervisorEvent::FallbackDue) if state.fallback_pending => {
            next.fallback_pending = false;
            if !state.generator_active {
                next.connection = FallbackActive;
                next.generator_active = true;
                effects.push(Effect::StartGenerator);
            }
        }

        (Disconnected, SupervisorEvent::Teardown) => {}

        (_, SupervisorEvent::Teardown) => {
            next = SupervisorState::default();
            effects.extend([
                Effect::CancelReconnect,
                Effect::CancelFallback,
                Effect::StopGenerator,
                Effect::CloseTransport,
            ]);
        }

        // Everything else is a stale or duplicate event
        _ => return Transition::stay(state),
    }

    Transition { next, effects }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    fn run(events: &[SupervisorEvent]) -> (SupervisorState, Vec<Effect>) {
        let mut state = SupervisorState::default();
        let mut last = Vec::new();
        for event in events {
            let t = transition(&state, *event);
            state = t.next;
            last = t.effects;
        }
        (state, last)
    }

    #[test]
    fn test_start_opens_transport() {
        let (state, effects) = run(&[SupervisorEvent::Start]);
        assert_eq!(state.connection, Connecting);
        assert_eq!(state.attempts, 1);
        assert_eq!(effects, vec![Effect::OpenTransport]);
    }

    #[test]
    fn test_start_is_ignored_when_running() {
        let (state, effects) = run(&[SupervisorEvent::Start, SupervisorEvent::Start]);
        assert_eq!(state.connection, Connecting);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_open_resubscribes() {
        let (state, effects) = run(&[SupervisorEvent::Start, SupervisorEvent::Opened]);
        assert_eq!(state.connection, Connected);
        assert!(state.ever_connected);
        assert_eq!(effects, vec![Effect::ResendSubscriptions]);
    }

    #[test]
    fn test_first_failure_schedules_fallback_and_reconnect() {
        let (state, effects) = run(&[SupervisorEvent::Start, SupervisorEvent::ConnectionLost]);
        assert_eq!(state.connection, Reconnecting);
        assert!(state.fallback_pending);
        assert_eq!(
            effects,
            vec![
                Effect::CloseTransport,
                Effect::ScheduleFallback,
                Effect::ScheduleReconnect
            ]
        );

        let (state, effects) = run(&[
            SupervisorEvent::Start,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::FallbackDue,
        ]);
        assert_eq!(state.connection, FallbackActive);
        assert!(state.generator_active);
        assert!(!state.fallback_pending);
        assert_eq!(effects, vec![Effect::StartGenerator]);
    }

    #[test]
    fn test_later_failures_do_not_schedule_fallback() {
        let (state, effects) = run(&[
            SupervisorEvent::Start,
            SupervisorEvent::Opened,
            SupervisorEvent::ConnectionLost,
        ]);
        assert_eq!(state.connection, Reconnecting);
        assert_eq!(effects, vec![Effect::CloseTransport, Effect::ScheduleReconnect]);

        let (state, effects) = run(&[
            SupervisorEvent::Start,
            SupervisorEvent::Opened,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::ReconnectDue,
            SupervisorEvent::ConnectionLost,
        ]);
        assert_eq!(state.connection, Reconnecting);
        assert_eq!(state.attempts, 2);
        assert!(!effects.contains(&Effect::ScheduleFallback));

        // Stale fallback timer is ignored outside a pending activation
        let t = transition(&state, SupervisorEvent::FallbackDue);
        assert_eq!(t.next, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_fallback_keeps_retrying_in_background() {
        let base = [
            SupervisorEvent::Start,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::FallbackDue,
        ];

        let mut events = base.to_vec();
        events.push(SupervisorEvent::ReconnectDue);
        let (state, effects) = run(&events);
        assert_eq!(state.connection, FallbackActive);
        assert_eq!(state.attempts, 2);
        assert_eq!(effects, vec![Effect::OpenTransport]);

        events.push(SupervisorEvent::ConnectionLost);
        let (state, effects) = run(&events);
        assert_eq!(state.connection, FallbackActive);
        assert_eq!(effects, vec![Effect::CloseTransport, Effect::ScheduleReconnect]);
    }

    #[test]
    fn test_live_connect_exits_fallback() {
        let (state, effects) = run(&[
            SupervisorEvent::Start,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::FallbackDue,
            SupervisorEvent::ReconnectDue,
            SupervisorEvent::Opened,
        ]);
        assert_eq!(state.connection, Connected);
        assert!(!state.generator_active);
        assert_eq!(effects, vec![Effect::StopGenerator, Effect::ResendSubscriptions]);
    }

    #[test]
    fn test_open_before_fallback_fires_cancels_it() {
        let (state, effects) = run(&[
            SupervisorEvent::Start,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::ReconnectDue,
            SupervisorEvent::Opened,
        ]);
        assert_eq!(state.connection, Connected);
        assert!(!state.fallback_pending);
        assert_eq!(effects, vec![Effect::CancelFallback, Effect::ResendSubscriptions]);
    }

    #[test]
    fn test_teardown_from_any_state() {
        let (state, effects) = run(&[
            SupervisorEvent::Start,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::FallbackDue,
            SupervisorEvent::Teardown,
        ]);
        assert_eq!(state, SupervisorState::default());
        assert_eq!(
            effects,
            vec![
                Effect::CancelReconnect,
                Effect::CancelFallback,
                Effect::StopGenerator,
                Effect::CloseTransport
            ]
        );

        // Second teardown is a no-op
        let t = transition(&state, SupervisorEvent::Teardown);
        assert_eq!(t.next.connection, Disconnected);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_stale_events_after_teardown_are_ignored() {
        let state = SupervisorState::default();
        for event in [
            SupervisorEvent::Opened,
            SupervisorEvent::ConnectionLost,
            SupervisorEvent::ReconnectDue,
            SupervisorEvent::FallbackDue,
        ] {
            let t = transition(&state, event);
            assert_eq!(t.next.connection, Disconnected);
            assert!(t.effects.is_empty());
        }
    }
}
