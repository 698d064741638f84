pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;

pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use error::Error;
