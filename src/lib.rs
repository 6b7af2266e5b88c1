pub mod destroyable;
pub mod error;
pub mod events;
pub mod game;
pub mod gateway;
pub mod model;
