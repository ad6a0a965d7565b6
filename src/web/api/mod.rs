pub mod align;
pub mod error;
pub mod logbook;
pub mod sensors;
