pub mod config;
pub mod drivers;
pub mod hook;
pub mod input;
pub mod notify;
pub mod plugin;
pub mod usb;
