use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};
use chrono::Utc;
use log::warn;

/// Append-only text sink, one timestamped line per notable bridge event.
/// Best-effort: write failures are swallowed, the sink is never read back.
#[derive(Clone)]
pub struct EventLog {
    file: Arc<Mutex<Option<File>>>,
}

impl EventLog {
    pub fn open(path: &str) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Could not open journal at {}: {}", path, e);
                None
            }
        };

        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    /// A journal that discards everything. Used when no sink is wanted.
    pub fn disabled() -> Self {
        Self {
            file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn record(&self, line: &str) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };

        if let Some(file) = guard.as_mut() {
            // Flush per line so the sink survives an abrupt process exit
            let _ = writeln!(file, "{} {}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"), line);
            let _ = file.flush();
        }
    }
}
