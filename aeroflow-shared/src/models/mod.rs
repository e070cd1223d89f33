pub mod events;
pub mod page;
