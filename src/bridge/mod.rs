pub mod journal;
pub mod server;
pub mod state;

pub use journal::EventLog;
pub use server::{BridgeServer, Lifecycle, StartOutcome};
pub use state::{SharedState, NO_ACTIVE_SYMBOLS};
