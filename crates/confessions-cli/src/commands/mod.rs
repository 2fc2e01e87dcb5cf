pub mod common;
pub mod completions;
pub mod config;
pub mod like;
pub mod list;
pub mod post;
pub mod whoami;
