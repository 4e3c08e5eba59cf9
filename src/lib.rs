pub mod component;
pub mod error;
pub mod options;
pub mod signal;
pub mod tools;
