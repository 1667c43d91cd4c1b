//! Controller runtime: configuration, handle, actor and execution.
//!
//! - [`ControllerBuilder`] assembles a controller from factories, subscribers and reporters.
//! - [`Controller`] is the handle used to submit, cancel and observe requests.
//! - The actor (private) owns all state; the runner (private) executes one request.

mod actor;
mod builder;
mod clock;
mod config;
mod controller;
mod history;
mod runner;
mod slot;

pub use builder::ControllerBuilder;
pub use clock::{Clock, SystemClock};
pub use config::ControllerConfig;
pub use controller::Controller;

#[cfg(test)]
mod tests;
