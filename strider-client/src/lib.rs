pub mod capture;
pub mod game;
pub mod interpolation;
pub mod prediction;
