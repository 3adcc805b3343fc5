use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use log::{debug, error, info, warn};

use crate::error::BridgeError;

// Sentinel returned when no symbol is active, so the host never has to
// process an empty string
pub const NO_ACTIVE_SYMBOLS: &str = "NONE";

pub const ACTION_SUBSCRIBE: &str = "SUBSCRIBE";
pub const ACTION_UNSUBSCRIBE: &str = "UNSUBSCRIBE";

struct StateInner {
    // Symbol -> active flag; entries are retained with active=false after
    // an unsubscribe so "seen before" stays distinguishable from "unknown"
    subscriptions: HashMap<String, bool>,
    last_envelope: String,
}

/// Single point of truth shared between the connection loop (sole writer)
/// and the host-facing control API (readers). One lock guards both the
/// registry and the last envelope; it is never held across a socket call.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<StateInner>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StateInner {
                subscriptions: HashMap::new(),
                last_envelope: String::new(),
            })),
        }
    }

    /// Stores the envelope verbatim and routes SUBSCRIBE/UNSUBSCRIBE to the
    /// registry. Any other action is accepted and stored but changes no
    /// subscription state.
    pub fn apply(&self, envelope: &str, action: &str, symbol: &str) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => {
                error!("State lock poisoned, dropping envelope");
                return;
            }
        };

        inner.last_envelope = envelope.to_string();

        match action {
            ACTION_SUBSCRIBE => {
                inner.subscriptions.insert(symbol.to_string(), true);
                info!("Subscribed to symbol: {}", symbol);
            }
            ACTION_UNSUBSCRIBE => {
                if let Some(active) = inner.subscriptions.get_mut(symbol) {
                    *active = false;
                    info!("Unsubscribed from symbol: {}", symbol);
                } else {
                    warn!("{}", BridgeError::NotSubscribed(symbol.to_string()));
                }
            }
            other => {
                debug!("Envelope with non-subscription action '{}' stored", other);
            }
        }
    }

    pub fn last_envelope(&self) -> String {
        self.inner.lock()
            .map(|inner| inner.last_envelope.clone())
            .unwrap_or_default()
    }

    /// Symbols currently flagged active, in unspecified order.
    pub fn active_symbols(&self) -> Vec<String> {
        self.inner.lock()
            .map(|inner| {
                inner.subscriptions.iter()
                    .filter(|(_, active)| **active)
                    .map(|(symbol, _)| symbol.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Active symbols joined as `EURUSD;GBPUSD;...`, or the `NONE`
    /// sentinel when nothing is active.
    pub fn active_symbols_display(&self) -> String {
        let symbols = self.active_symbols();
        if symbols.is_empty() {
            NO_ACTIVE_SYMBOLS.to_string()
        } else {
            symbols.join(";")
        }
    }

    pub fn is_active(&self, symbol: &str) -> bool {
        self.inner.lock()
            .map(|inner| inner.subscriptions.get(symbol).copied().unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn get_stats(&self) -> (usize, usize) {
        self.inner.lock()
            .map(|inner| {
                let total = inner.subscriptions.len();
                let active = inner.subscriptions.values().filter(|a| **a).count();
                (total, active)
            })
            .unwrap_or((0, 0))
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_marks_symbol_active() {
        let state = SharedState::new();
        state.apply(r#"{"action":"SUBSCRIBE","symbol":"EURUSD"}"#, "SUBSCRIBE", "EURUSD");

        assert!(state.is_active("EURUSD"));
        assert_eq!(state.active_symbols_display(), "EURUSD");
    }

    #[test]
    fn test_last_action_wins() {
        let state = SharedState::new();
        state.apply("e1", "SUBSCRIBE", "EURUSD");
        state.apply("e2", "SUBSCRIBE", "EURUSD");
        assert!(state.is_active("EURUSD"));

        state.apply("e3", "UNSUBSCRIBE", "EURUSD");
        state.apply("e4", "UNSUBSCRIBE", "EURUSD");
        assert!(!state.is_active("EURUSD"));
        assert_eq!(state.active_symbols_display(), NO_ACTIVE_SYMBOLS);

        state.apply("e5", "SUBSCRIBE", "EURUSD");
        assert!(state.is_active("EURUSD"));
    }

    #[test]
    fn test_unsubscribe_unknown_symbol_changes_nothing() {
        let state = SharedState::new();
        state.apply("e1", "UNSUBSCRIBE", "GBPUSD");

        let (total, active) = state.get_stats();
        assert_eq!((total, active), (0, 0));
        assert_eq!(state.active_symbols_display(), NO_ACTIVE_SYMBOLS);
    }

    #[test]
    fn test_unsubscribed_symbol_is_retained_inactive() {
        let state = SharedState::new();
        state.apply("e1", "SUBSCRIBE", "EURUSD");
        state.apply("e2", "UNSUBSCRIBE", "EURUSD");

        let (total, active) = state.get_stats();
        assert_eq!(total, 1);
        assert_eq!(active, 0);
    }

    #[test]
    fn test_unknown_action_is_inert_but_envelope_stored() {
        let state = SharedState::new();
        let envelope = r#"{"action":"PING","symbol":"EURUSD"}"#;
        state.apply(envelope, "PING", "EURUSD");

        assert_eq!(state.last_envelope(), envelope);
        assert!(!state.is_active("EURUSD"));
        assert_eq!(state.get_stats(), (0, 0));
    }

    #[test]
    fn test_envelope_overwritten_on_each_receipt() {
        let state = SharedState::new();
        assert_eq!(state.last_envelope(), "");

        state.apply("first", "SUBSCRIBE", "EURUSD");
        state.apply("second", "SUBSCRIBE", "GBPUSD");
        assert_eq!(state.last_envelope(), "second");
    }

    #[test]
    fn test_multiple_active_symbols_joined() {
        let state = SharedState::new();
        state.apply("e1", "SUBSCRIBE", "EURUSD");
        state.apply("e2", "SUBSCRIBE", "GBPUSD");

        let display = state.active_symbols_display();
        // Iteration order is unspecified, so check the pieces
        let mut parts: Vec<&str> = display.split(';').collect();
        parts.sort_unstable();
        assert_eq!(parts, vec!["EURUSD", "GBPUSD"]);
    }
}
