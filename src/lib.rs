pub mod chart;
pub mod config;
pub mod defaults;
pub mod logging;
pub mod net;
pub mod roster;
pub mod seating;
pub mod session;
pub mod store;
