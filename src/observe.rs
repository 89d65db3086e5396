//! The observation port: a single callback the execution engine invokes
//! around and during every instruction, so a tracer or a debugger can watch
//! (and, for the debugger, pause and inspect) a run without the engine
//! knowing which kind of subscriber, if any, is attached.

use crate::cpu::CpuState;
use crate::isa::FormatTag;
use crate::memory::Memory;

/// Borrowed view of the machine handed to a subscriber for the duration of
/// a single callback. The engine never retains a reference across the
/// call: the subscriber is free to mutate registers, memory, or PC, and
/// the engine re-reads whatever it needs after the callback returns.
pub struct VmView<'a> {
    pub cpu: &'a mut CpuState,
    pub memory: &'a mut Memory,
}

/// What happened, from the subscriber's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Raised once, before the first instruction fetch.
    ExecStart,
    /// Raised once per instruction, after it has been decoded and stored
    /// in `cpu.ir` but before it executes. The subscriber reads the IR via
    /// `VmView` to get the operands; the event itself carries only the
    /// format, so it stays cheap to construct even when nobody is
    /// listening.
    Inst(FormatTag),
    /// Raised once, after the run loop halts (including on a fatal error).
    ExecEnd,
}

/// Something that watches a run. Implemented by [`crate::trace::Tracer`]
/// and [`crate::debug::Debugger`]; the engine holds subscribers as
/// `Option<&mut dyn Subscriber>` so "nobody is watching" costs nothing more
/// than a null check.
pub trait Subscriber {
    fn on_event(&mut self, view: &mut VmView<'_>, event: Event);
}
