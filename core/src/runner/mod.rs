//! Process execution bridge.
//!
//! Spawns the helper executable in `task` or `command` mode, delivers the
//! serialized execution context on stdin, pumps stdout/stderr line by line,
//! and classifies the outcome per mode. See [`invoke`].

mod io_pump;
mod invoke;
mod session;

pub use invoke::{invoke, HelperConfig, InvokeMode, InvokeOutcome, InvokeRequest};
pub use io_pump::{pump_stderr, pump_stdout, LineStream, LineTap};
pub use session::{HelperSession, HelperSpawner, ProcessSpawner, SpawnArgs};
