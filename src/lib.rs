pub mod caret;
pub mod chapter;
pub mod config;
pub mod error;
pub mod gloss;
pub mod layout;
pub mod popup;
pub mod render;
pub mod resolver;
pub mod sentence;
pub mod store;
pub mod surface;
pub mod theme;
