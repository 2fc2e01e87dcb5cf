//! Services shared across clients.

mod confessions;

pub use confessions::ConfessionService;
