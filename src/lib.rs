//! Core of a Sigma16 instruction-set emulator: the ISA encoding, flat
//! memory, CPU state, image loader, decoder, execution engine, and the
//! observation port that a tracer or interactive debugger attaches to.

pub mod cpu;
pub mod debug;
pub mod decode;
pub mod error;
pub mod isa;
pub mod loader;
pub mod memory;
pub mod observe;
pub mod trace;
pub mod vm;

pub use cpu::CpuState;
pub use error::{DebuggerInputError, DecodeError, Fatal, LoadError};
pub use isa::{Instruction, Word};
pub use memory::Memory;
pub use observe::{Event, Subscriber, VmView};
pub use vm::Vm;
