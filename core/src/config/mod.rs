mod load;
mod types;

pub use load::{get_data_dir, load_default};
pub use types::{LoggingConfig, PathsConfig, RunnerConfig, WorkerConfig};
