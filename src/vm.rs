//! The execution engine: fetch/decode/dispatch, the arithmetic and control
//! flow of every in-scope opcode, and the `Vm` container that owns CPU
//! state, memory, and the output sink `trap` writes to.

use std::io::{self, Write};

use crate::cpu::CpuState;
use crate::decode::decode;
use crate::error::Fatal;
use crate::isa::{Exp0Op, Instruction, RrrOp, RxOp};
use crate::memory::Memory;
use crate::observe::{Event, Subscriber, VmView};

/// What the dispatch of one instruction does to the program counter.
enum Effect {
    /// Land on the address the decoder already computed (`pc + 1` or `+2`).
    Advance,
    /// A taken branch: land here instead, ignoring the decoded advance.
    Jump(u16),
    /// `trap 0`: stop the run loop, leaving PC exactly where it is.
    Halt,
}

/// A Sigma16 machine: CPU registers, flat memory, and wherever `trap`'s
/// string-write facility sends its bytes.
pub struct Vm<W: Write = io::Stdout> {
    pub cpu: CpuState,
    pub memory: Memory,
    output: W,
}

impl Vm<io::Stdout> {
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self {
            cpu: CpuState::new(),
            memory,
            output: io::stdout(),
        }
    }
}

impl<W: Write> Vm<W> {
    /// Builds a machine that writes `trap`'s string output to `output`
    /// instead of stdout, so tests can capture it.
    pub fn with_output(memory: Memory, output: W) -> Self {
        Self {
            cpu: CpuState::new(),
            memory,
            output,
        }
    }

    /// The sink `trap 2` writes to, for callers that want to inspect
    /// captured output after a run.
    pub fn output(&self) -> &W {
        &self.output
    }

    fn view(&mut self) -> VmView<'_> {
        VmView {
            cpu: &mut self.cpu,
            memory: &mut self.memory,
        }
    }

    /// Runs from the current PC until `trap 0` halts the machine or a
    /// fatal error occurs (a bad decode, or an unrecognized trap code).
    /// `subscriber` is consulted before the first fetch, once per
    /// instruction, and after the loop ends; pass `None` to run unobserved.
    pub fn run(&mut self, mut subscriber: Option<&mut dyn Subscriber>) -> Result<(), Fatal> {
        if let Some(sub) = subscriber.as_deref_mut() {
            let mut view = self.view();
            sub.on_event(&mut view, Event::ExecStart);
        }

        let result = self.run_loop(subscriber.as_deref_mut());

        if let Some(sub) = subscriber.as_deref_mut() {
            let mut view = self.view();
            sub.on_event(&mut view, Event::ExecEnd);
        }

        result
    }

    fn run_loop(&mut self, mut subscriber: Option<&mut dyn Subscriber>) -> Result<(), Fatal> {
        loop {
            let (inst, next_pc) = decode(&self.memory, self.cpu.pc)
                .map_err(|source| Fatal::Decode { pc: self.cpu.pc, source })?;
            self.cpu.ir = Some(inst);

            if let Some(sub) = subscriber.as_deref_mut() {
                let mut view = self.view();
                sub.on_event(&mut view, Event::Inst(inst.format_tag()));
            }

            let effect = match inst {
                Instruction::Rrr { op, d, sa, sb } => self.exec_rrr(op, d, sa, sb)?,
                Instruction::Rx { op, d, sa, disp } => self.exec_rx(op, d, sa, disp, next_pc),
                Instruction::Exp0 { op, d } => self.exec_exp0(op, d),
            };

            match effect {
                Effect::Advance => self.cpu.pc = next_pc,
                Effect::Jump(addr) => self.cpu.pc = addr,
                Effect::Halt => return Ok(()),
            }
        }
    }

    fn eaddr(&mut self, sa: u8, disp: u16) -> u16 {
        let addr = self.cpu.reg(sa).wrapping_add(disp);
        self.cpu.adr = addr;
        addr
    }

    fn exec_rrr(&mut self, op: RrrOp, d: u8, sa: u8, sb: u8) -> Result<Effect, Fatal> {
        let a = self.cpu.reg(sa);
        let b = self.cpu.reg(sb);
        match op {
            RrrOp::Add => self.exec_add(d, a, b),
            RrrOp::Sub => self.cpu.set_reg(d, a.wrapping_sub(b)),
            RrrOp::Mul => self.cpu.set_reg(d, a.wrapping_mul(b)),
            RrrOp::Div => self.exec_div(d, a, b),
            RrrOp::Cmp => self.exec_cmp(a, b),
            RrrOp::Cmplt => {
                self.cpu.set_reg(d, u16::from(a < b));
                self.cpu.clear_condition_code();
            }
            RrrOp::Cmpeq => {
                self.cpu.set_reg(d, u16::from(a == b));
                self.cpu.clear_condition_code();
            }
            RrrOp::Cmpgt => {
                self.cpu.set_reg(d, u16::from(a > b));
                self.cpu.clear_condition_code();
            }
            RrrOp::Inv => {
                self.cpu.set_reg(d, !a);
                self.cpu.clear_condition_code();
            }
            RrrOp::And => {
                self.cpu.set_reg(d, a & b);
                self.cpu.clear_condition_code();
            }
            RrrOp::Or => {
                self.cpu.set_reg(d, a | b);
                self.cpu.clear_condition_code();
            }
            RrrOp::Xor => {
                self.cpu.set_reg(d, a ^ b);
                self.cpu.clear_condition_code();
            }
            RrrOp::Nop => self.cpu.clear_condition_code(),
            RrrOp::Trap => return self.exec_trap(d, sa, sb),
        }
        Ok(Effect::Advance)
    }

    fn exec_add(&mut self, d: u8, a: u16, b: u16) {
        let wide = u32::from(a) + u32::from(b);
        let result = wide as u16;
        self.cpu.set_reg(d, result);

        let carry = wide > 0xFFFF;
        let signed_overflow = (a ^ b) & 0x8000 == 0 && (a ^ result) & 0x8000 != 0;

        self.cpu.clear_condition_code();
        self.cpu.set_carry(carry);
        self.cpu.set_overflow_signed(signed_overflow);
        self.cpu.set_overflow_unsigned(carry);
        self.cpu.set_greater_unsigned(result != 0);
        self.cpu.set_greater_signed((result as i16) > 0);
        self.cpu.set_equal(result == 0);
        self.cpu.set_less_unsigned(false);
        self.cpu.set_less_signed((result as i16) < 0);
    }

    fn exec_div(&mut self, d: u8, a: u16, b: u16) {
        if b == 0 {
            // Division by zero is silently ignored: no write, no trap.
            return;
        }
        self.cpu.set_reg(d, a / b);
        if d != 15 {
            self.cpu.set_reg(15, a % b);
        }
    }

    fn exec_cmp(&mut self, a: u16, b: u16) {
        self.cpu.clear_condition_code();
        self.cpu.set_greater_unsigned(a > b);
        self.cpu.set_greater_signed((a as i16) > (b as i16));
        self.cpu.set_equal(a == b);
        self.cpu.set_less_unsigned(a < b);
        self.cpu.set_less_signed((a as i16) < (b as i16));
    }

    fn exec_trap(&mut self, d: u8, sa: u8, sb: u8) -> Result<Effect, Fatal> {
        match self.cpu.reg(d) {
            0 => Ok(Effect::Halt),
            2 => {
                let count = self.cpu.reg(sb);
                let start = self.cpu.reg(sa);
                for i in 0..count {
                    let addr = start.wrapping_add(i);
                    let byte = self.memory.read_word(addr) as u8;
                    let _ = self.output.write_all(&[byte]);
                }
                let _ = self.output.flush();
                Ok(Effect::Advance)
            }
            code => Err(Fatal::UnknownTrap { code, reg: d }),
        }
    }

    fn exec_rx(&mut self, op: RxOp, d: u8, sa: u8, disp: u16, next_pc: u16) -> Effect {
        match op {
            RxOp::Lea => {
                let ea = self.eaddr(sa, disp);
                self.cpu.set_reg(d, ea);
                Effect::Advance
            }
            RxOp::Load => {
                let ea = self.eaddr(sa, disp);
                let value = self.memory.read_word(ea);
                self.cpu.dat = value;
                self.cpu.set_reg(d, value);
                Effect::Advance
            }
            RxOp::Store => {
                let ea = self.eaddr(sa, disp);
                let value = self.cpu.reg(d);
                self.memory.write_word(ea, value);
                Effect::Advance
            }
            RxOp::Jump => Effect::Jump(self.eaddr(sa, disp)),
            RxOp::Jumpc0 => {
                let ea = self.eaddr(sa, disp);
                if self.cpu.flag_bit(d) {
                    Effect::Advance
                } else {
                    Effect::Jump(ea)
                }
            }
            RxOp::Jumpc1 => {
                let ea = self.eaddr(sa, disp);
                if self.cpu.flag_bit(d) {
                    Effect::Jump(ea)
                } else {
                    Effect::Advance
                }
            }
            RxOp::Jumpf => {
                let ea = self.eaddr(sa, disp);
                if self.cpu.reg(d) == 0 {
                    Effect::Jump(ea)
                } else {
                    Effect::Advance
                }
            }
            RxOp::Jumpt => {
                let ea = self.eaddr(sa, disp);
                if self.cpu.reg(d) != 0 {
                    Effect::Jump(ea)
                } else {
                    Effect::Advance
                }
            }
            RxOp::Jal => {
                let ea = self.eaddr(sa, disp);
                self.cpu.set_reg(d, next_pc);
                Effect::Jump(ea)
            }
        }
    }

    fn exec_exp0(&mut self, _op: Exp0Op, _d: u8) -> Effect {
        // `rfi` has no observable effect in scope: no interrupt state is
        // modeled, so it just falls through like a second nop.
        Effect::Advance
    }
}
