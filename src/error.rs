//! Error taxonomy. Every failure mode is a value, never a panic: decode and
//! load errors are recoverable data the caller inspects, and debugger input
//! mistakes just reprompt rather than aborting the session.

use thiserror::Error;

/// A word failed to decode into a valid instruction.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown RX sub-opcode {0:#x} (valid range is 0..=8)")]
    UnknownRxOp(u8),
    #[error("unknown EXP sub-opcode {0:#x} (only 0, rfi, is in scope)")]
    UnknownExpOp(u8),
}

/// Failure constructing a [`crate::memory::Memory`] from an image file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("image of {actual} bytes exceeds the {max}-byte memory")]
    Oversize { max: usize, actual: usize },
}

/// An error that stops the run loop outright: a bad fetch, or a trap code
/// the machine doesn't recognize. Division by zero and unknown RRR/RX/EXP
/// *values* that aren't reachable through decoding are not represented here
/// because they never happen; illegal trap codes are, because trap
/// dispatches on a register value chosen at runtime, not on the opcode.
#[derive(Debug, Error)]
pub enum Fatal {
    #[error("decode error at pc={pc:#06x}: {source}")]
    Decode {
        pc: u16,
        #[source]
        source: DecodeError,
    },
    #[error("unknown trap code {code} requested via R{reg}")]
    UnknownTrap { code: u16, reg: u8 },
}

/// A line typed at the debugger prompt couldn't be parsed or dispatched.
/// Never fatal: the REPL prints the message and reprompts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DebuggerInputError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("command {cmd:?} requires an argument")]
    MissingArgument { cmd: char },
    #[error("invalid integer argument {0:?}")]
    InvalidInteger(String),
}
