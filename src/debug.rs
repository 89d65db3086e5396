//! The interactive debugger: a [`Subscriber`] that pauses execution at the
//! start and end of a run, at breakpoints, and after a requested number of
//! steps, and answers a small REPL command set while paused.

use std::collections::LinkedList;
use std::io::{stdin, stdout, BufRead, Write};
use std::str::FromStr;

use crate::error::DebuggerInputError;
use crate::observe::{Event, Subscriber, VmView};
use crate::trace::Tracer;

/// One user-set breakpoint: an id (for the `b` command's reply, and for
/// later removal) and the address it watches.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub id: u32,
    pub addr: u16,
}

enum PromptAction {
    /// Stay at the prompt and read another line.
    Prompt,
    /// Hand control back to the run loop.
    Resume,
}

/// Interactive stepping, breakpoints, register/memory inspection, and
/// optional pass-through tracing, all driven from one `on_event` callback.
pub struct Debugger {
    /// Remaining single-steps before re-entering the prompt; `-1` means
    /// run until a breakpoint or the end of execution ("continue").
    step_count: i32,
    trace_enabled: bool,
    breakpoints: LinkedList<Breakpoint>,
    next_breakpoint_id: u32,
    tracer: Tracer<std::io::Stdout>,
}

impl Debugger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step_count: -1,
            trace_enabled: true,
            breakpoints: LinkedList::new(),
            next_breakpoint_id: 0,
            tracer: Tracer::new(),
        }
    }

    fn prompt(&mut self, view: &mut VmView<'_>) {
        loop {
            print!("s16> ");
            let _ = stdout().flush();

            let mut line = String::new();
            match stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => {
                    println!("end of input, exiting.");
                    std::process::exit(0);
                }
                Ok(_) => {}
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.dispatch(line, view) {
                Ok(PromptAction::Prompt) => {}
                Ok(PromptAction::Resume) => return,
                Err(e) => eprintln!("{e}"),
            }
        }
    }

    fn dispatch(&mut self, line: &str, view: &mut VmView<'_>) -> Result<PromptAction, DebuggerInputError> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().expect("line is non-empty after trim");

        match cmd {
            "n" => {
                self.step_count = match parts.next() {
                    Some(arg) => parse_int(arg)?,
                    None => 1,
                };
                Ok(PromptAction::Resume)
            }
            "c" => {
                self.step_count = -1;
                Ok(PromptAction::Resume)
            }
            "b" => {
                let addr: u16 = parse_int(require_arg(parts.next(), 'b')?)?;
                let id = self.next_breakpoint_id;
                self.next_breakpoint_id += 1;
                self.breakpoints.push_back(Breakpoint { id, addr });
                println!("breakpoint {id} set at {addr:#06x}");
                Ok(PromptAction::Prompt)
            }
            "i" => {
                let reg = parse_register(require_arg(parts.next(), 'i')?)?;
                let value: u16 = parse_int(require_arg(parts.next(), 'i')?)?;
                view.cpu.set_reg(reg, value);
                Ok(PromptAction::Prompt)
            }
            "o" => {
                let reg = parse_register(require_arg(parts.next(), 'o')?)?;
                println!("R{reg}={:#06x}", view.cpu.reg(reg));
                Ok(PromptAction::Prompt)
            }
            "t" => {
                self.trace_enabled = !self.trace_enabled;
                println!("tracing {}", if self.trace_enabled { "on" } else { "off" });
                Ok(PromptAction::Prompt)
            }
            "d" => {
                self.dump_cpu(view);
                Ok(PromptAction::Prompt)
            }
            "m" => {
                let (start, end) = parse_mem_range(&mut parts)?;
                self.dump_mem(view, start, end);
                Ok(PromptAction::Prompt)
            }
            "?" => {
                self.help();
                Ok(PromptAction::Prompt)
            }
            "e" => {
                println!("exiting.");
                std::process::exit(0);
            }
            other => Err(DebuggerInputError::UnknownCommand(other.to_string())),
        }
    }

    fn dump_cpu(&self, view: &VmView<'_>) {
        println!("pc={:#06x} adr={:#06x} dat={:#06x}", view.cpu.pc, view.cpu.adr, view.cpu.dat);
        for r in 0..16u8 {
            println!("R{r:<2}={:#06x}", view.cpu.reg(r));
        }
    }

    fn dump_mem(&self, view: &VmView<'_>, start: u16, end: u16) {
        for addr in start..end {
            println!("{addr:#06x}: {:#06x}", view.memory.read_word(addr));
        }
    }

    fn help(&self) {
        println!("n [count]   step count instructions (default 1)");
        println!("c           continue until a breakpoint or halt");
        println!("b addr      set a breakpoint at addr");
        println!("i reg val   write val into register reg");
        println!("o reg       print the value of register reg");
        println!("t           toggle tracing");
        println!("d           dump cpu registers");
        println!("m [end [start]]   dump memory in [start, end) (defaults end=0x100, start=0)");
        println!("?           print this help");
        println!("e           exit");
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for Debugger {
    fn on_event(&mut self, view: &mut VmView<'_>, event: Event) {
        match event {
            Event::ExecStart | Event::ExecEnd => self.prompt(view),
            Event::Inst(tag) => {
                if self.trace_enabled {
                    self.tracer.on_event(view, Event::Inst(tag));
                }
                if self.step_count > 0 {
                    self.step_count -= 1;
                    if self.step_count == 0 {
                        self.prompt(view);
                    }
                }
                if let Some(bp) = self.breakpoints.iter().find(|bp| bp.addr == view.cpu.pc) {
                    println!("breakpoint {} hit at {:#06x}", bp.id, bp.addr);
                    self.prompt(view);
                }
            }
        }
    }
}

fn require_arg(arg: Option<&str>, cmd: char) -> Result<&str, DebuggerInputError> {
    arg.ok_or(DebuggerInputError::MissingArgument { cmd })
}

fn parse_int<T: FromStr>(s: &str) -> Result<T, DebuggerInputError> {
    s.parse().map_err(|_| DebuggerInputError::InvalidInteger(s.to_string()))
}

/// Parses a register index, rejecting anything outside `0..16` so a
/// malformed `i`/`o` argument reprompts instead of indexing `CpuState::regs`
/// out of bounds.
fn parse_register(s: &str) -> Result<u8, DebuggerInputError> {
    match parse_int::<u8>(s)? {
        reg if reg < 16 => Ok(reg),
        _ => Err(DebuggerInputError::InvalidInteger(s.to_string())),
    }
}

/// Parses the `m` command's arguments: the first positional word is `end`
/// (default `0x100`), the second is `start` (default `0`), matching
/// `parse_cmd_dump_mem`'s end-then-start order. Returns `(start, end)` for
/// [`Debugger::dump_mem`].
fn parse_mem_range(parts: &mut std::str::SplitWhitespace<'_>) -> Result<(u16, u16), DebuggerInputError> {
    let end: u16 = parts.next().map(parse_int::<u16>).transpose()?.unwrap_or(0x100);
    let start: u16 = parts.next().map(parse_int::<u16>).transpose()?.unwrap_or(0);
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuState;
    use crate::memory::Memory;

    fn view<'a>(cpu: &'a mut CpuState, memory: &'a mut Memory) -> VmView<'a> {
        VmView { cpu, memory }
    }

    #[test]
    fn write_register_command_mutates_cpu_state() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        let action = debugger.dispatch("i 3 42", &mut v).unwrap();
        assert!(matches!(action, PromptAction::Prompt));
        assert_eq!(v.cpu.reg(3), 42);
    }

    #[test]
    fn step_command_sets_step_count_and_resumes() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        let action = debugger.dispatch("n 5", &mut v).unwrap();
        assert!(matches!(action, PromptAction::Resume));
        assert_eq!(debugger.step_count, 5);
    }

    #[test]
    fn continue_command_sets_unlimited_steps() {
        let mut debugger = Debugger::new();
        debugger.step_count = 3;
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        debugger.dispatch("c", &mut v).unwrap();
        assert_eq!(debugger.step_count, -1);
    }

    #[test]
    fn breakpoint_command_records_an_incrementing_id() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        debugger.dispatch("b 16", &mut v).unwrap();
        debugger.dispatch("b 32", &mut v).unwrap();
        let ids: Vec<u32> = debugger.breakpoints.iter().map(|bp| bp.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn unknown_command_is_a_recoverable_error() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        let err = debugger.dispatch("zzz", &mut v).unwrap_err();
        assert_eq!(err, DebuggerInputError::UnknownCommand("zzz".to_string()));
    }

    #[test]
    fn missing_argument_is_a_recoverable_error() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        let err = debugger.dispatch("b", &mut v).unwrap_err();
        assert_eq!(err, DebuggerInputError::MissingArgument { cmd: 'b' });
    }

    #[test]
    fn trace_toggle_flips_state() {
        let mut debugger = Debugger::new();
        assert!(debugger.trace_enabled);
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        debugger.dispatch("t", &mut v).unwrap();
        assert!(!debugger.trace_enabled);
    }

    #[test]
    fn write_register_rejects_an_out_of_range_index() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        let err = debugger.dispatch("i 16 0", &mut v).unwrap_err();
        assert_eq!(err, DebuggerInputError::InvalidInteger("16".to_string()));
    }

    #[test]
    fn read_register_rejects_an_out_of_range_index() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        let err = debugger.dispatch("o 99", &mut v).unwrap_err();
        assert_eq!(err, DebuggerInputError::InvalidInteger("99".to_string()));
    }

    #[test]
    fn dump_memory_defaults_to_end_0x100_and_start_0() {
        let mut parts = "".split_whitespace();
        assert_eq!(parse_mem_range(&mut parts).unwrap(), (0, 0x100));
    }

    #[test]
    fn dump_memory_takes_end_then_start() {
        // "m 50 10" means end=50, start=10, i.e. the range [10, 50).
        let mut parts = "50 10".split_whitespace();
        assert_eq!(parse_mem_range(&mut parts).unwrap(), (10, 50));
    }

    #[test]
    fn dump_memory_command_accepts_end_only() {
        let mut debugger = Debugger::new();
        let mut cpu = CpuState::new();
        let mut memory = Memory::new();
        let mut v = view(&mut cpu, &mut memory);
        debugger.dispatch("m 8", &mut v).unwrap();
    }
}
