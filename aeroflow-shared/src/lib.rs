pub mod models;
pub mod pii;

pub use models::page::{Page, PageRequest};
pub use pii::Masked;
