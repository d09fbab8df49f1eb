// Utility module
// Logging setup and text helpers shared by processors

pub mod logger;
pub mod text;
