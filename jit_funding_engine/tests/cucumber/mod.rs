mod jit_world;
mod setups;
mod steps;

pub use jit_world::JitWorld;
