pub mod environment;
pub mod error;
mod evaluator;
pub mod executor;

pub use blocks::diagnostic::{Diagnostic, Problem};
pub use blocks::value::Value;
pub use error::RunError;
pub use executor::{Execution, Interpreter, InterpreterOptions, execute_program, execute_workspace};
