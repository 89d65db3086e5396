//! The tracer: a [`Subscriber`] that renders each instruction as a single
//! line of `[pc]  mnemonic  operands`, plus sentinels marking the start and
//! end of a run.

use std::io::{self, Write};

use crate::isa::{Instruction, RrrOp, RxOp};
use crate::observe::{Event, Subscriber, VmView};

/// Formats and writes one line per instruction to `W`. Defaults to stdout;
/// construct with [`Tracer::with_writer`] to capture into a buffer.
pub struct Tracer<W: Write = io::Stdout> {
    out: W,
}

impl Tracer<io::Stdout> {
    #[must_use]
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for Tracer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Tracer<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    /// Reclaims the underlying writer, e.g. to inspect captured output
    /// after a run.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Renders the instruction currently sitting in `view.cpu.ir`, if any.
    /// `cmp` omits its destination (it never writes one); unconditional
    /// `jump` omits its destination (the ISA doesn't use `d` for it); every
    /// other opcode shows all the registers it decodes.
    fn format(view: &VmView<'_>) -> Option<String> {
        let pc = view.cpu.pc;
        let inst = view.cpu.ir?;
        Some(match inst {
            Instruction::Rrr { op, d, sa, sb } => {
                let mnem = op.mnemonic();
                match op {
                    RrrOp::Cmp => format!("[{pc:04x}]\t{mnem}\tR{sa}, R{sb}"),
                    RrrOp::Nop => format!("[{pc:04x}]\t{mnem}"),
                    _ => format!("[{pc:04x}]\t{mnem}\tR{d}, R{sa}, R{sb}"),
                }
            }
            Instruction::Rx { op, d, sa, disp } => {
                let mnem = op.mnemonic();
                match op {
                    RxOp::Jump => format!("[{pc:04x}]\t{mnem}\t{disp:04x}[R{sa}]"),
                    _ => format!("[{pc:04x}]\t{mnem}\tR{d}, {disp:04x}[R{sa}]"),
                }
            }
            Instruction::Exp0 { op, .. } => format!("[{pc:04x}]\t{}", op.mnemonic()),
        })
    }
}

impl<W: Write> Subscriber for Tracer<W> {
    fn on_event(&mut self, view: &mut VmView<'_>, event: Event) {
        match event {
            Event::ExecStart => {
                let _ = writeln!(self.out, "=== exec start ===");
            }
            Event::ExecEnd => {
                let _ = writeln!(self.out, "=== exec end ===");
                let _ = self.out.flush();
            }
            Event::Inst(_) => {
                if let Some(line) = Self::format(view) {
                    let _ = writeln!(self.out, "{line}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuState;
    use crate::isa::{Exp0Op, RxOp};
    use crate::memory::Memory;

    fn view<'a>(cpu: &'a mut CpuState, memory: &'a mut Memory) -> VmView<'a> {
        VmView { cpu, memory }
    }

    #[test]
    fn rrr_arithmetic_shows_all_three_registers() {
        let mut cpu = CpuState::new();
        cpu.pc = 0x10;
        cpu.ir = Some(Instruction::Rrr {
            op: RrrOp::Add,
            d: 3,
            sa: 1,
            sb: 2,
        });
        let mut memory = Memory::new();
        let v = view(&mut cpu, &mut memory);
        assert_eq!(Tracer::<Vec<u8>>::format(&v).unwrap(), "[0010]\tadd\tR3, R1, R2");
    }

    #[test]
    fn cmp_omits_its_destination() {
        let mut cpu = CpuState::new();
        cpu.ir = Some(Instruction::Rrr {
            op: RrrOp::Cmp,
            d: 9,
            sa: 1,
            sb: 2,
        });
        let mut memory = Memory::new();
        let v = view(&mut cpu, &mut memory);
        assert_eq!(Tracer::<Vec<u8>>::format(&v).unwrap(), "[0000]\tcmp\tR1, R2");
    }

    #[test]
    fn unconditional_jump_omits_its_destination() {
        let mut cpu = CpuState::new();
        cpu.ir = Some(Instruction::Rx {
            op: RxOp::Jump,
            d: 0,
            sa: 2,
            disp: 0x20,
        });
        let mut memory = Memory::new();
        let v = view(&mut cpu, &mut memory);
        assert_eq!(Tracer::<Vec<u8>>::format(&v).unwrap(), "[0000]\tjump\t0020[R2]");
    }

    #[test]
    fn conditional_branch_keeps_its_destination() {
        let mut cpu = CpuState::new();
        cpu.ir = Some(Instruction::Rx {
            op: RxOp::Jumpc1,
            d: 5,
            sa: 0,
            disp: 7,
        });
        let mut memory = Memory::new();
        let v = view(&mut cpu, &mut memory);
        assert_eq!(Tracer::<Vec<u8>>::format(&v).unwrap(), "[0000]\tjumpc1\tR5, 0007[R0]");
    }

    #[test]
    fn rfi_prints_bare_mnemonic() {
        let mut cpu = CpuState::new();
        cpu.ir = Some(Instruction::Exp0 { op: Exp0Op::Rfi, d: 0 });
        let mut memory = Memory::new();
        let v = view(&mut cpu, &mut memory);
        assert_eq!(Tracer::<Vec<u8>>::format(&v).unwrap(), "[0000]\trfi");
    }

    #[test]
    fn emits_sentinels_around_the_run() {
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut tracer = Tracer::with_writer(Vec::new());
        let mut v = view(&mut cpu, &mut memory);
        tracer.on_event(&mut v, Event::ExecStart);
        tracer.on_event(&mut v, Event::ExecEnd);
        let out = String::from_utf8(tracer.out).unwrap();
        assert_eq!(out, "=== exec start ===\n=== exec end ===\n");
    }
}
