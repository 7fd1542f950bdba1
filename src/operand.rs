//! Parsed operands and the pattern check that verifies an operand list
//! against an opcode's declared [`OperandPattern`] before encoding.

use crate::error::{AsmError, ErrorKind, Span};
use crate::opcode::{operand_kind, OpcodeDescriptor, OperandPattern};

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(u8),
    Immediate(i64),
    Label(String),
    /// `offset(base)` addressing, e.g. `-4($sp)`. `base` is `None` for a
    /// bare displacement, which is only legal for directive operands.
    Address { offset: i32, base: Option<u8> },
    Str(String),
}

impl Operand {
    fn kind_bit(&self) -> u8 {
        match self {
            Operand::Register(_) => operand_kind::REGISTER,
            Operand::Immediate(_) => operand_kind::IMMEDIATE,
            Operand::Label(_) => operand_kind::LABEL,
            Operand::Address { .. } => operand_kind::ADDRESS,
            Operand::Str(_) => operand_kind::STRING,
        }
    }
}

/// Checks `operands` against `desc.pattern`, slot by slot. A `REPEAT` slot
/// consumes every remaining operand (each must match its mask) and must be
/// the last non-empty slot in the pattern; an `OPTIONAL` slot may be absent
/// only if it is the last slot.
pub fn verify(desc: &OpcodeDescriptor, operands: &[Operand], span: Span) -> Result<(), AsmError> {
    let pattern: OperandPattern = desc.pattern;
    let mut op_iter = operands.iter();

    for (slot_idx, &mask) in pattern.iter().enumerate() {
        if mask & operand_kind::REPEAT != 0 {
            let base_mask = mask & !operand_kind::REPEAT;
            let remaining: Vec<&Operand> = op_iter.by_ref().collect();
            if remaining.is_empty() {
                return Err(mismatch(desc, "expected at least one operand", span));
            }
            for operand in remaining {
                if operand.kind_bit() & base_mask == 0 {
                    return Err(mismatch(desc, "repeated operand has the wrong kind", span));
                }
            }
            return Ok(());
        }

        match op_iter.next() {
            Some(operand) => {
                if operand.kind_bit() & mask == 0 {
                    return Err(mismatch(
                        desc,
                        &format!("operand {} has the wrong kind", slot_idx + 1),
                        span,
                    ));
                }
            }
            None => {
                if mask & operand_kind::OPTIONAL != 0 || mask == operand_kind::NONE {
                    continue;
                }
                return Err(mismatch(desc, "too few operands", span));
            }
        }
    }

    if op_iter.next().is_some() {
        return Err(mismatch(desc, "too many operands", span));
    }
    Ok(())
}

fn mismatch(desc: &OpcodeDescriptor, reason: &str, span: Span) -> AsmError {
    AsmError::new(
        ErrorKind::OperandMismatch {
            mnemonic: desc.mnemonic.to_string(),
            reason: reason.to_string(),
        },
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Op;

    fn span() -> Span {
        Span::new(1, 1)
    }

    #[test]
    fn add_accepts_three_registers() {
        let ops = vec![Operand::Register(1), Operand::Register(2), Operand::Register(3)];
        assert!(verify(Op::Add.descriptor(), &ops, span()).is_ok());
    }

    #[test]
    fn add_rejects_immediate_in_register_slot() {
        let ops = vec![Operand::Register(1), Operand::Register(2), Operand::Immediate(5)];
        assert!(verify(Op::Add.descriptor(), &ops, span()).is_err());
    }

    #[test]
    fn word_directive_accepts_repeated_immediates_and_labels() {
        let ops = vec![Operand::Immediate(1), Operand::Label("x".into()), Operand::Immediate(3)];
        assert!(verify(Op::DirWord.descriptor(), &ops, span()).is_ok());
    }

    #[test]
    fn div_accepts_optional_third_register() {
        let two = vec![Operand::Register(1), Operand::Register(2)];
        let three = vec![Operand::Register(1), Operand::Register(2), Operand::Register(3)];
        assert!(verify(Op::Div.descriptor(), &two, span()).is_ok());
        assert!(verify(Op::Div.descriptor(), &three, span()).is_ok());
    }

    #[test]
    fn syscall_rejects_any_operand() {
        let ops = vec![Operand::Register(1)];
        assert!(verify(Op::Syscall.descriptor(), &ops, span()).is_err());
        assert!(verify(Op::Syscall.descriptor(), &[], span()).is_ok());
    }
}
