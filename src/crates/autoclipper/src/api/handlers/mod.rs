pub mod clips;
pub mod health;
pub mod jobs;
pub mod settings;
