pub mod events;
pub mod iclock;
