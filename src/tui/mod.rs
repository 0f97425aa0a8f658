//! TUI module for terminal user interfaces

mod hub_app;

pub use hub_app::HubApp;
