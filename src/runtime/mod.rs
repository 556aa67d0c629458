pub mod builtins;
pub mod bytecode;
pub mod environment;
pub mod error;
pub mod machine;
pub mod value;

pub use machine::Machine;
