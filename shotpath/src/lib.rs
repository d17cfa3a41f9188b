pub mod collision;
pub mod config;
pub mod constants;
pub mod io;
pub mod links;
pub mod observer;
pub mod obstacles;
pub mod protocol;
pub mod ray;
pub mod segment;
pub mod strategy;
pub mod systems;
pub mod weapon;
pub mod world;
