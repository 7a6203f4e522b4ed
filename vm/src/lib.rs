//! A register+stack bytecode interpreter with an interactive step-through
//! debugger (§1-2).
//!
//! The crate splits along the same seam the design does: [`interpreter`] is
//! the hot fetch/decode/execute loop plus its foreign-call and builtin
//! bridges; [`debug_db`] reads the compact offset-indexed symbol database;
//! [`debugger`] is the REPL overlay that ties the two together.

pub mod consts;
pub mod debug_db;
pub mod debugger;
pub mod error;
pub mod interpreter;
pub mod registers;
pub mod stack;

pub mod prelude {
    //! Everything a `vm-exec`/`vm-dbg`-style embedder typically needs.
    pub use crate::debug_db::DebugDatabase;
    pub use crate::debugger::DebugSession;
    pub use crate::error::{FaultKind, InterpreterError};
    pub use crate::interpreter::{Allocator, DefaultHost, HostEnv, Interpreter, LibraryLoader, StackConfig};
    pub use crate::registers::RegisterFile;
    pub use crate::stack::Stack;
}
