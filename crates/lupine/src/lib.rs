pub mod bundler;
pub mod combine;
pub mod config;
pub mod dependency_graph;
pub mod dirs;
pub mod emit;
pub mod requires;
pub mod resolver;
pub mod util;

pub use bundler::Bundler;
pub use config::Config;
