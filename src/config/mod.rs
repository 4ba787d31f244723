/// Main configuration module.
///
/// Compile-time tuning lives in the `game`, `generation` and `server` submodules;
/// `settings` reads the handful of deployment values that come from the environment.
pub mod game;
pub mod generation;
pub mod server;
pub mod settings;
