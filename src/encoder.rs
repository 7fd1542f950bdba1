//! Instruction encoding: R/I/J bit layouts, branch-offset arithmetic, and
//! the core/pseudo dispatch (spec. §4.5).
//!
//! Every function here trusts that [`crate::operand::verify`] already
//! checked the operand list's shape against the opcode's declared pattern —
//! the accessor helpers below panic on a mismatch rather than re-validating.

use crate::error::{AsmError, ErrorKind, Span};
use crate::opcode::{InstrKind, Op};
use crate::operand::Operand;

/// What `encode` produced: either the final words, or notice that one
/// label in the operand list is still undefined, identified by name so the
/// caller can register a [`crate::symtab::PendingInstruction`] against it.
pub enum EncodeOutcome {
    Words(Vec<u32>),
    Deferred { label: String },
}

fn r_type(opcode: u8, rs: u8, rt: u8, rd: u8, shamt: u8, funct: u8) -> u32 {
    ((opcode as u32) << 26)
        | ((rs as u32 & 0x1F) << 21)
        | ((rt as u32 & 0x1F) << 16)
        | ((rd as u32 & 0x1F) << 11)
        | ((shamt as u32 & 0x1F) << 6)
        | (funct as u32 & 0x3F)
}

fn i_type(opcode: u8, rs: u8, rt: u8, imm: u16) -> u32 {
    ((opcode as u32) << 26) | ((rs as u32 & 0x1F) << 21) | ((rt as u32 & 0x1F) << 16) | (imm as u32)
}

fn j_type(opcode: u8, address: u32) -> u32 {
    let target = (address >> 2) & 0x03FF_FFFF;
    ((opcode as u32) << 26) | target
}

fn branch_offset(instr_addr: u32, target: u32, span: Span) -> Result<u16, AsmError> {
    let delta = target as i64 - (instr_addr as i64 + 4);
    if delta % 4 != 0 {
        return Err(AsmError::new(
            ErrorKind::OperandMismatch {
                mnemonic: "branch".into(),
                reason: "branch target is not word-aligned".into(),
            },
            span,
        ));
    }
    let words = delta / 4;
    if !(i16::MIN as i64..=i16::MAX as i64).contains(&words) {
        return Err(AsmError::new(
            ErrorKind::OperandMismatch {
                mnemonic: "branch".into(),
                reason: "branch target out of range".into(),
            },
            span,
        ));
    }
    Ok(words as i16 as u16)
}

fn reg_at(ops: &[Operand], i: usize) -> u8 {
    match ops[i] {
        Operand::Register(r) => r,
        _ => unreachable!("operand {i} is not a register after verify()"),
    }
}

fn imm_at(ops: &[Operand], i: usize) -> i64 {
    match ops[i] {
        Operand::Immediate(v) => v,
        _ => unreachable!("operand {i} is not an immediate after verify()"),
    }
}

/// Operand 2 of `div`/`divu` may be absent (core 2-operand form).
fn opt_reg_at(ops: &[Operand], i: usize) -> Option<u8> {
    ops.get(i).map(|o| match o {
        Operand::Register(r) => *r,
        _ => unreachable!("operand {i} is not a register after verify()"),
    })
}

/// `offset(base)` or a bare resolved address (base implied `$zero`).
fn addr_at(ops: &[Operand], i: usize) -> (u8, u16) {
    match &ops[i] {
        Operand::Address { offset, base } => (base.unwrap_or(0), *offset as u16),
        Operand::Immediate(v) => (0, *v as u32 as u16),
        _ => unreachable!("operand {i} is not an address after verify()"),
    }
}


/// Replace every `Operand::Label` with its resolved address (as an
/// `Immediate`), or report the first name still unresolved.
fn concretize(operands: &[Operand], resolve: &mut dyn FnMut(&str) -> Option<u32>) -> Result<Vec<Operand>, String> {
    let mut out = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand {
            Operand::Label(name) => match resolve(name) {
                Some(addr) => out.push(Operand::Immediate(addr as i64)),
                None => return Err(name.clone()),
            },
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

/// Encode one instruction. `resolve` looks up a label's address; returning
/// `None` defers the whole instruction (spec §4.4's "encode-or-defer").
pub fn encode(
    op: Op,
    operands: &[Operand],
    instr_addr: u32,
    span: Span,
    resolve: &mut dyn FnMut(&str) -> Option<u32>,
) -> Result<EncodeOutcome, AsmError> {
    let desc = op.descriptor();
    debug_assert_ne!(desc.kind, InstrKind::Directive, "directives are not encoded as instructions");

    let concrete = match concretize(operands, resolve) {
        Ok(v) => v,
        Err(label) => return Ok(EncodeOutcome::Deferred { label }),
    };

    // div/divu accept an optional third register, expanding to div+mflo —
    // a shape none of the generic Core/Pseudo paths below models cleanly.
    if matches!(op, Op::Div | Op::Divu) {
        let mut words = vec![r_type(0, reg_at(&concrete, 0), reg_at(&concrete, 1), 0, 0, desc.funct)];
        if let Some(rd) = opt_reg_at(&concrete, 2) {
            words.push(r_type(0, 0, 0, rd, 0, Op::Mflo.descriptor().funct));
        }
        return Ok(EncodeOutcome::Words(words));
    }

    let words = match desc.kind {
        InstrKind::Core => vec![encode_core(op, &concrete, instr_addr, span)?],
        InstrKind::Pseudo => expand_pseudo(op, &concrete, instr_addr, span)?,
        InstrKind::Directive => unreachable!(),
    };
    Ok(EncodeOutcome::Words(words))
}

fn encode_core(op: Op, ops: &[Operand], instr_addr: u32, span: Span) -> Result<u32, AsmError> {
    let d = op.descriptor();
    let word = match op {
        Op::Add | Op::Addu | Op::And | Op::Nor | Op::Or | Op::Slt | Op::Sltu | Op::Sub | Op::Subu | Op::Xor
        | Op::Mul => {
            // rd, rs, rt
            r_type(d.opcode, reg_at(ops, 1), reg_at(ops, 2), reg_at(ops, 0), 0, d.funct)
        }
        Op::Sll | Op::Sra | Op::Srl => {
            // rd, rt, shamt
            r_type(0, 0, reg_at(ops, 1), reg_at(ops, 0), imm_at(ops, 2) as u8, d.funct)
        }
        Op::Beq | Op::Bne => {
            let target = imm_at(ops, 2) as u32;
            let offset = branch_offset(instr_addr, target, span)?;
            i_type(d.opcode, reg_at(ops, 0), reg_at(ops, 1), offset)
        }
        Op::Bgez | Op::Bgtz | Op::Blez | Op::Bltz | Op::Bgezal | Op::Bltzal => {
            let target = imm_at(ops, 1) as u32;
            let offset = branch_offset(instr_addr, target, span)?;
            i_type(d.opcode, reg_at(ops, 0), d.rt & 0x1F, offset)
        }
        Op::J | Op::Jal => {
            let target = imm_at(ops, 0) as u32;
            j_type(d.opcode, target)
        }
        Op::Jr => r_type(0, reg_at(ops, 0), 0, 0, 0, d.funct),
        Op::Syscall => r_type(0, 0, 0, 0, 0, d.funct),
        Op::Lb | Op::Lbu | Op::Lh | Op::Lhu | Op::Lw | Op::Sb | Op::Sh | Op::Sw => {
            let (base, offset) = addr_at(ops, 1);
            i_type(d.opcode, base, reg_at(ops, 0), offset)
        }
        Op::Addi | Op::Addiu | Op::Andi | Op::Ori | Op::Slti | Op::Sltiu | Op::Xori => {
            // rt, rs, imm
            i_type(d.opcode, reg_at(ops, 1), reg_at(ops, 0), imm_at(ops, 2) as u16)
        }
        Op::Lui => i_type(d.opcode, 0, reg_at(ops, 0), imm_at(ops, 1) as u16),
        Op::Mfhi | Op::Mflo => r_type(0, 0, 0, reg_at(ops, 0), 0, d.funct),
        Op::Mult | Op::Multu => r_type(0, reg_at(ops, 0), reg_at(ops, 1), 0, 0, d.funct),
        _ => unreachable!("{op:?} is not dispatched through encode_core"),
    };
    Ok(word)
}

/// The four orderings `bge`/`ble`/`blt`/`bgt`(u) test.
#[derive(Clone, Copy)]
enum Rel {
    Lt,
    Le,
    Gt,
    Ge,
}

/// Expands a compare-then-branch pseudo into `slt(u)`+`beq`/`bne` against
/// `$at` (register 1).
///
/// - Register rhs: `le`/`gt` swap the `slt` operand order and flip the
///   branch sense, since there is no "less-or-equal" core instruction to
///   fall back on.
/// - Immediate rhs: there is no operand to swap, so `le`/`gt` instead bump
///   the immediate by one (`rs<=imm` is `rs<imm+1`; `rs>imm` is
///   `rs>=imm+1`) and keep the direct (non-swapped) `slti`.
fn emit_compare_branch(
    rel: Rel,
    signed: bool,
    rs: u8,
    rhs: &Operand,
    target: u32,
    instr_addr: u32,
    span: Span,
) -> Result<Vec<u32>, AsmError> {
    const AT: u8 = 1;
    let slt_d = if signed { Op::Slt.descriptor() } else { Op::Sltu.descriptor() };
    let slti_opcode = if signed { Op::Slti.descriptor().opcode } else { Op::Sltiu.descriptor().opcode };

    let (first, branch_is_bne) = match rhs {
        Operand::Register(rt) => match rel {
            Rel::Lt => (r_type(0, rs, *rt, AT, 0, slt_d.funct), true),
            Rel::Ge => (r_type(0, rs, *rt, AT, 0, slt_d.funct), false),
            Rel::Gt => (r_type(0, *rt, rs, AT, 0, slt_d.funct), true),
            Rel::Le => (r_type(0, *rt, rs, AT, 0, slt_d.funct), false),
        },
        Operand::Immediate(imm) => {
            let (imm_val, is_bne) = match rel {
                Rel::Lt => (*imm, true),
                Rel::Ge => (*imm, false),
                Rel::Le => (*imm + 1, true),
                Rel::Gt => (*imm + 1, false),
            };
            (i_type(slti_opcode, rs, AT, imm_val as u16), is_bne)
        }
        _ => unreachable!("comparison rhs is neither register nor immediate after verify()"),
    };

    let branch_instr_addr = instr_addr + 4;
    let offset = branch_offset(branch_instr_addr, target, span)?;
    let branch_opcode = if branch_is_bne { Op::Bne.descriptor().opcode } else { Op::Beq.descriptor().opcode };
    let second = i_type(branch_opcode, AT, 0, offset);
    Ok(vec![first, second])
}

fn expand_pseudo(op: Op, ops: &[Operand], instr_addr: u32, span: Span) -> Result<Vec<u32>, AsmError> {
    const ZERO: u8 = 0;
    const AT: u8 = 1;

    let words = match op {
        Op::Move => {
            let addu = Op::Addu.descriptor();
            vec![r_type(addu.opcode, reg_at(ops, 1), ZERO, reg_at(ops, 0), 0, addu.funct)]
        }
        Op::Li => {
            let rd = reg_at(ops, 0);
            let imm = imm_at(ops, 1);
            if (i16::MIN as i64..=i16::MAX as i64).contains(&imm) {
                let addiu = Op::Addiu.descriptor();
                vec![i_type(addiu.opcode, ZERO, rd, imm as u16)]
            } else if (imm as u64) & 0xFFFF_0000 == 0 {
                // Upper 16 bits clear but the value wouldn't sign-extend
                // correctly through addiu (e.g. bit 15 set) — zero-extend
                // with ori instead.
                let ori = Op::Ori.descriptor();
                vec![i_type(ori.opcode, ZERO, rd, imm as u16)]
            } else {
                let lui = Op::Lui.descriptor();
                let ori = Op::Ori.descriptor();
                let upper = (imm as u64 >> 16) as u16;
                let lower = imm as u64 as u16;
                vec![i_type(lui.opcode, 0, AT, upper), i_type(ori.opcode, AT, rd, lower)]
            }
        }
        Op::La => {
            let rd = reg_at(ops, 0);
            let addr = imm_at(ops, 1) as u32;
            let lui = Op::Lui.descriptor();
            let ori = Op::Ori.descriptor();
            vec![
                i_type(lui.opcode, 0, AT, (addr >> 16) as u16),
                i_type(ori.opcode, AT, rd, addr as u16),
            ]
        }
        Op::Not => {
            let nor = Op::Nor.descriptor();
            vec![r_type(nor.opcode, reg_at(ops, 1), ZERO, reg_at(ops, 0), 0, nor.funct)]
        }
        Op::Neg => {
            let sub = Op::Sub.descriptor();
            vec![r_type(sub.opcode, ZERO, reg_at(ops, 1), reg_at(ops, 0), 0, sub.funct)]
        }
        Op::Beqz => {
            let beq = Op::Beq.descriptor();
            let offset = branch_offset(instr_addr, imm_at(ops, 1) as u32, span)?;
            vec![i_type(beq.opcode, reg_at(ops, 0), ZERO, offset)]
        }
        Op::Bnez => {
            let bne = Op::Bne.descriptor();
            let offset = branch_offset(instr_addr, imm_at(ops, 1) as u32, span)?;
            vec![i_type(bne.opcode, reg_at(ops, 0), ZERO, offset)]
        }
        Op::B => {
            let beq = Op::Beq.descriptor();
            let offset = branch_offset(instr_addr, imm_at(ops, 0) as u32, span)?;
            vec![i_type(beq.opcode, ZERO, ZERO, offset)]
        }
        Op::Bge => emit_compare_branch(Rel::Ge, true, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Ble => emit_compare_branch(Rel::Le, true, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Blt => emit_compare_branch(Rel::Lt, true, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Bgt => emit_compare_branch(Rel::Gt, true, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Bgeu => emit_compare_branch(Rel::Ge, false, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Bleu => emit_compare_branch(Rel::Le, false, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Bltu => emit_compare_branch(Rel::Lt, false, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Bgtu => emit_compare_branch(Rel::Gt, false, reg_at(ops, 0), &ops[1], imm_at(ops, 2) as u32, instr_addr, span)?,
        Op::Sgt => {
            let slt = Op::Slt.descriptor();
            vec![r_type(slt.opcode, reg_at(ops, 2), reg_at(ops, 1), reg_at(ops, 0), 0, slt.funct)]
        }
        Op::Sne => {
            let xor = Op::Xor.descriptor();
            let sltu = Op::Sltu.descriptor();
            let rd = reg_at(ops, 0);
            vec![
                r_type(xor.opcode, reg_at(ops, 1), reg_at(ops, 2), rd, 0, xor.funct),
                r_type(sltu.opcode, ZERO, rd, rd, 0, sltu.funct),
            ]
        }
        Op::Abs => {
            let rd = reg_at(ops, 0);
            let rs = reg_at(ops, 1);
            let sra = Op::Sra.descriptor();
            let xor = Op::Xor.descriptor();
            let sub = Op::Sub.descriptor();
            vec![
                r_type(0, 0, rs, AT, 31, sra.funct),
                r_type(xor.opcode, rs, AT, rd, 0, xor.funct),
                r_type(sub.opcode, rd, AT, rd, 0, sub.funct),
            ]
        }
        Op::Rol => {
            let rd = reg_at(ops, 0);
            let rt = reg_at(ops, 1);
            let n = (imm_at(ops, 2) as u32) & 0x1F;
            let sll = Op::Sll.descriptor();
            let srl = Op::Srl.descriptor();
            let or = Op::Or.descriptor();
            vec![
                r_type(0, 0, rt, AT, n as u8, sll.funct),
                r_type(0, 0, rt, rd, (32 - n) as u8, srl.funct),
                r_type(or.opcode, rd, AT, rd, 0, or.funct),
            ]
        }
        Op::Ror => {
            let rd = reg_at(ops, 0);
            let rt = reg_at(ops, 1);
            let n = (imm_at(ops, 2) as u32) & 0x1F;
            let sll = Op::Sll.descriptor();
            let srl = Op::Srl.descriptor();
            let or = Op::Or.descriptor();
            vec![
                r_type(0, 0, rt, AT, n as u8, srl.funct),
                r_type(0, 0, rt, rd, (32 - n) as u8, sll.funct),
                r_type(or.opcode, rd, AT, rd, 0, or.funct),
            ]
        }
        _ => unreachable!("{op:?} is not dispatched through expand_pseudo"),
    };
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_: &str) -> Option<u32> {
        None
    }

    fn resolved_to(addr: u32) -> impl FnMut(&str) -> Option<u32> {
        move |_| Some(addr)
    }

    #[test]
    fn r_type_bit_layout() {
        let word = r_type(0x00, 9, 10, 8, 0, 0x20); // add $t0, $t1, $t2
        assert_eq!(word, 0x012A4020);
    }

    #[test]
    fn i_type_bit_layout() {
        let word = i_type(0x08, 9, 8, 0x0005); // addi $t0, $t1, 5
        assert_eq!(word, 0x21280005);
    }

    #[test]
    fn j_type_shifts_target_right_two() {
        let word = j_type(0x02, 0x00400010);
        assert_eq!(word & 0x03FF_FFFF, 0x00400010 >> 2);
    }

    #[test]
    fn add_encodes_as_single_word() {
        let ops = vec![Operand::Register(8), Operand::Register(9), Operand::Register(10)];
        match encode(Op::Add, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 1),
            EncodeOutcome::Deferred { .. } => panic!("add has no label operand"),
        }
    }

    #[test]
    fn j_with_unresolved_label_defers() {
        let ops = vec![Operand::Label("main".into())];
        match encode(Op::J, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Deferred { label } => assert_eq!(label, "main"),
            EncodeOutcome::Words(_) => panic!("label is not resolvable via `always`"),
        }
    }

    #[test]
    fn li_small_immediate_is_one_word() {
        let ops = vec![Operand::Register(8), Operand::Immediate(5)];
        match encode(Op::Li, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 1),
            EncodeOutcome::Deferred { .. } => panic!("li never defers"),
        }
    }

    #[test]
    fn li_large_immediate_is_two_words() {
        let ops = vec![Operand::Register(8), Operand::Immediate(0x12345678)];
        match encode(Op::Li, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 2),
            EncodeOutcome::Deferred { .. } => panic!("li never defers"),
        }
    }

    #[test]
    fn la_expands_to_lui_ori_pair() {
        let ops = vec![Operand::Register(8), Operand::Label("buf".into())];
        let mut resolver = resolved_to(0x1001_0000);
        match encode(Op::La, &ops, 0x0040_0000, Span::new(1, 1), &mut resolver).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 2),
            EncodeOutcome::Deferred { .. } => panic!("resolver always succeeds"),
        }
    }

    #[test]
    fn div_with_three_operands_emits_div_then_mflo() {
        let ops = vec![Operand::Register(8), Operand::Register(9), Operand::Register(10)];
        match encode(Op::Div, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 2),
            EncodeOutcome::Deferred { .. } => panic!("div has no label operand"),
        }
    }

    #[test]
    fn div_with_two_operands_emits_one_word() {
        let ops = vec![Operand::Register(8), Operand::Register(9)];
        match encode(Op::Div, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 1),
            EncodeOutcome::Deferred { .. } => panic!("div has no label operand"),
        }
    }

    #[test]
    fn ble_with_immediate_uses_incremented_bound() {
        // ble $t0, 5, label => slti $at, $t0, 6; bne $at, $zero, label
        let words = emit_compare_branch(Rel::Le, true, 8, &Operand::Immediate(5), 0x0040_0010, 0x0040_0000, Span::new(1, 1)).unwrap();
        let slti_opcode = Op::Slti.descriptor().opcode;
        assert_eq!(words[0], i_type(slti_opcode, 8, 1, 6));
        let bne_opcode = Op::Bne.descriptor().opcode;
        assert_eq!(words[1] >> 26, bne_opcode as u32);
    }

    #[test]
    fn bgt_with_register_swaps_slt_operands() {
        // bgt $t0, $t1, label => slt $at, $t1, $t0; bne $at, $zero, label
        let words = emit_compare_branch(Rel::Gt, true, 8, &Operand::Register(9), 0x0040_0010, 0x0040_0000, Span::new(1, 1)).unwrap();
        let slt_d = Op::Slt.descriptor();
        assert_eq!(words[0], r_type(0, 9, 8, 1, 0, slt_d.funct));
    }

    #[test]
    fn la_is_deferred_until_label_resolves() {
        let ops = vec![Operand::Register(8), Operand::Label("buf".into())];
        match encode(Op::La, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Deferred { label } => assert_eq!(label, "buf"),
            EncodeOutcome::Words(_) => panic!("`always` never resolves"),
        }
    }

    #[test]
    fn move_and_not_and_neg_are_single_words() {
        let ops = vec![Operand::Register(8), Operand::Register(9)];
        for op in [Op::Move, Op::Not, Op::Neg] {
            match encode(op, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
                EncodeOutcome::Words(words) => assert_eq!(words.len(), 1, "{op:?}"),
                EncodeOutcome::Deferred { .. } => panic!("{op:?} has no label operand"),
            }
        }
    }

    #[test]
    fn abs_is_three_words() {
        let ops = vec![Operand::Register(8), Operand::Register(9)];
        match encode(Op::Abs, &ops, 0x0040_0000, Span::new(1, 1), &mut always).unwrap() {
            EncodeOutcome::Words(words) => assert_eq!(words.len(), 3),
            EncodeOutcome::Deferred { .. } => panic!("abs has no label operand"),
        }
    }
}
