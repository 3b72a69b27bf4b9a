pub mod movement;
pub mod networking;
mod settings;

pub use settings::GLOBAL_CONFIG;

pub type PlayerID = usize;
