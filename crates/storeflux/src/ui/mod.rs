pub mod browser;
pub mod item_modal;
pub mod monitor;
pub mod render;
