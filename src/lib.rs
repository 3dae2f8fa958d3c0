pub mod config;
pub mod data;
pub mod emcal;
pub mod errors;
pub mod output;
pub mod pid;
pub mod task;

pub use config::{DecayChannel, TaskConfig};
pub use task::PidSystTask;
