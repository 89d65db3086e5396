//! Turns a fetched word (plus, for RX/EXP, the word that follows it) into
//! an [`Instruction`]. Pure function of memory and a PC value: it never
//! touches [`crate::cpu::CpuState`], so it has no opinion about how PC gets
//! there or where it goes next beyond reporting how many words it consumed.

use crate::error::DecodeError;
use crate::isa::{Exp0Op, Instruction, RrrOp, RxOp};
use crate::memory::Memory;

/// Decodes the instruction at `pc`, returning it together with the address
/// of the word immediately following it (`pc + 1` for RRR, `pc + 2` for RX
/// and EXP). The caller decides whether to actually land there.
pub fn decode(memory: &Memory, pc: u16) -> Result<(Instruction, u16), DecodeError> {
    let w = memory.read_word(pc);
    let op_nibble = ((w >> 12) & 0xF) as u8;
    let d = ((w >> 8) & 0xF) as u8;
    let sa = ((w >> 4) & 0xF) as u8;
    let sb = (w & 0xF) as u8;

    match op_nibble {
        0xF => {
            let op = RxOp::from_nibble(sb).ok_or(DecodeError::UnknownRxOp(sb))?;
            let disp = memory.read_word(pc.wrapping_add(1));
            Ok((Instruction::Rx { op, d, sa, disp }, pc.wrapping_add(2)))
        }
        0xE => {
            let ab = (sa << 4) | sb;
            let op = Exp0Op::from_ab(ab).ok_or(DecodeError::UnknownExpOp(ab))?;
            // Second word is reserved for the larger EXP4/EXP8 forms, out
            // of scope here, but still fetched so PC advances correctly.
            let _reserved = memory.read_word(pc.wrapping_add(1));
            Ok((Instruction::Exp0 { op, d }, pc.wrapping_add(2)))
        }
        _ => {
            let op = RrrOp::from_nibble(op_nibble)
                .expect("op nibbles below 0xE always map to an RRR mnemonic");
            Ok((Instruction::Rrr { op, d, sa, sb }, pc.wrapping_add(1)))
        }
    }
}
