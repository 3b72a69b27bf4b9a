pub mod config;
pub mod effects;
pub mod input;
pub mod simulate;
pub mod state;
pub mod validate;
pub mod world;


pub use config::MovementConfig;
pub use effects::StatusEffects;
pub use input::{Buttons, InputCommand};
pub use simulate::simulate;
pub use state::{MoveState, PlayerState, StateDelta};
pub use validate::{validate, WORLD_BOUND};
pub use world::{FlatGround, WorldQuery};
