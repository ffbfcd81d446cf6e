pub mod settings;

pub use settings::{MessengerConfig, Settings};
