//! Static opcode table.
//!
//! Every mnemonic and directive is assigned a stable ordinal
//! ([`Op`]); the table below is indexed directly by that ordinal so the
//! encoder can dispatch with an array lookup rather than a string compare.
//! [`OperandPattern`] is the three-slot, per-slot-mask shape the grammar
//! driver checks a parsed operand list against before handing it to the
//! encoder (see [`crate::operand::verify`]).

/// Bitmask of operand kinds a single pattern slot accepts, plus the two
/// modifier bits `REPEAT` and `OPTIONAL`.
pub mod operand_kind {
    pub const NONE: u8 = 0x00;
    pub const LABEL: u8 = 0x01;
    pub const IMMEDIATE: u8 = 0x02;
    pub const REGISTER: u8 = 0x04;
    pub const ADDRESS: u8 = 0x08;
    pub const STRING: u8 = 0x10;
    /// This slot consumes zero-or-more operands of the given kinds, then
    /// the pattern is complete.
    pub const REPEAT: u8 = 0x20;
    /// This slot may be absent.
    pub const OPTIONAL: u8 = 0x40;
}

use operand_kind::*;

pub type OperandPattern = [u8; 3];

pub const R_TYPE: OperandPattern = [REGISTER, REGISTER, REGISTER];
pub const I_TYPE: OperandPattern = [REGISTER, REGISTER, IMMEDIATE];
pub const I_ADDR_TYPE: OperandPattern = [REGISTER, ADDRESS | LABEL, NONE];
pub const I_BRANCH_TYPE: OperandPattern = [REGISTER, REGISTER | IMMEDIATE, LABEL];
/// Core `beq`/`bne`: unlike the pseudo compare-branches, the second operand
/// must be a register.
pub const REG_REG_LABEL: OperandPattern = [REGISTER, REGISTER, LABEL];
pub const J_TYPE: OperandPattern = [LABEL, NONE, NONE];
pub const BRANCH_TYPE: OperandPattern = [REGISTER, LABEL, NONE];
pub const REGISTER_ONLY: OperandPattern = [REGISTER, NONE, NONE];
pub const IMMEDIATE_ONLY: OperandPattern = [IMMEDIATE, NONE, NONE];
pub const REG_IMM: OperandPattern = [REGISTER, IMMEDIATE, NONE];
pub const REG_REG: OperandPattern = [REGISTER, REGISTER, NONE];
pub const REG_LABEL: OperandPattern = [REGISTER, LABEL, NONE];
pub const STRING_REPEAT: OperandPattern = [STRING | REPEAT, NONE, NONE];
pub const IMM_REPEAT: OperandPattern = [IMMEDIATE | REPEAT, NONE, NONE];
pub const STRING_ONLY: OperandPattern = [STRING, NONE, NONE];
pub const IMM_LABEL_REPEAT: OperandPattern = [IMMEDIATE | LABEL | REPEAT, NONE, NONE];
pub const R_TYPE_OPT_REG: OperandPattern = [REGISTER, REGISTER, REGISTER | OPTIONAL];
pub const NONE_PATTERN: OperandPattern = [NONE, NONE, NONE];

/// Which of the three dispatch paths (§4.5) an opcode belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    Core,
    Pseudo,
    Directive,
}

/// Stable per-mnemonic/directive ordinal. Values are preserved from the
/// reference assembler this crate was modeled on so the flat opcode table
/// stays index-addressable; gaps do not occur because every ordinal backs
/// exactly one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    Add = 0x00,
    Addu = 0x01,
    And = 0x02,
    Nor = 0x03,
    Or = 0x04,
    Slt = 0x05,
    Sltu = 0x06,
    Sub = 0x07,
    Subu = 0x08,
    Xor = 0x09,
    Sll = 0x0A,
    Sra = 0x0B,
    Srl = 0x0C,
    Beq = 0x0D,
    Bgez = 0x0E,
    Bgezal = 0x0F,
    Bgtz = 0x10,
    Blez = 0x11,
    Bltz = 0x12,
    Bltzal = 0x13,
    Bne = 0x14,
    J = 0x15,
    Jal = 0x16,
    Jr = 0x17,
    Syscall = 0x18,
    Lb = 0x19,
    Lbu = 0x1A,
    Lh = 0x1B,
    Lhu = 0x1C,
    Lw = 0x1D,
    Sb = 0x1E,
    Sh = 0x1F,
    Sw = 0x20,
    Addi = 0x21,
    Addiu = 0x22,
    Andi = 0x23,
    Lui = 0x24,
    Ori = 0x25,
    Slti = 0x26,
    Sltiu = 0x27,
    Xori = 0x28,
    Move = 0x29,
    Li = 0x2A,
    La = 0x2B,
    Not = 0x2C,
    Beqz = 0x2D,
    Bge = 0x2E,
    Ble = 0x2F,
    Bnez = 0x30,
    Blt = 0x31,
    Bgt = 0x32,
    Div = 0x33,
    Divu = 0x34,
    Mfhi = 0x35,
    Mflo = 0x36,
    Mult = 0x37,
    Multu = 0x38,
    DirInclude = 0x39,
    DirText = 0x3A,
    DirData = 0x3B,
    DirAscii = 0x3C,
    DirAsciiz = 0x3D,
    DirByte = 0x3E,
    DirAlign = 0x3F,
    DirHalf = 0x40,
    DirWord = 0x41,
    DirKtext = 0x42,
    DirKdata = 0x43,
    DirSpace = 0x44,
    Mul = 0x45,
    Abs = 0x46,
    Neg = 0x47,
    Ror = 0x48,
    Rol = 0x49,
    Sgt = 0x4A,
    B = 0x4B,
    Sne = 0x4C,
    Bleu = 0x4D,
    Bgeu = 0x4E,
    Bltu = 0x4F,
    Bgtu = 0x50,
}

impl Op {
    pub fn descriptor(self) -> &'static OpcodeDescriptor {
        &OPCODE_TABLE[self as usize]
    }
}

/// A single opcode-table row: primary opcode, secondary funct, fixed `rt`
/// (used by the BGEZ/BLTZ family), accepted operand pattern, dispatch kind,
/// and emitted size in bytes (core instructions are always 4; this field
/// only matters for `Pseudo`, where it is how forward references reserve
/// the right number of bytes before the target is known).
#[derive(Debug, Clone, Copy)]
pub struct OpcodeDescriptor {
    pub op: Op,
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub funct: u8,
    pub rt: u8,
    pub pattern: OperandPattern,
    pub kind: InstrKind,
    pub size: u8,
}

const fn core(op: Op, mnemonic: &'static str, opcode: u8, funct: u8, rt: u8, pattern: OperandPattern) -> OpcodeDescriptor {
    OpcodeDescriptor {
        op,
        mnemonic,
        opcode,
        funct,
        rt,
        pattern,
        kind: InstrKind::Core,
        size: 4,
    }
}

const fn pseudo(op: Op, mnemonic: &'static str, pattern: OperandPattern, size: u8) -> OpcodeDescriptor {
    OpcodeDescriptor {
        op,
        mnemonic,
        opcode: 0,
        funct: 0,
        rt: 0,
        pattern,
        kind: InstrKind::Pseudo,
        size,
    }
}

const fn directive(op: Op, mnemonic: &'static str, pattern: OperandPattern) -> OpcodeDescriptor {
    OpcodeDescriptor {
        op,
        mnemonic,
        opcode: 0,
        funct: 0,
        rt: 0,
        pattern,
        kind: InstrKind::Directive,
        size: 0,
    }
}

/// Indexed by [`Op`] as `usize`. Keep this in the exact order of the `Op`
/// discriminants — `Op::descriptor` relies on it.
pub static OPCODE_TABLE: [OpcodeDescriptor; 81] = [
    core(Op::Add, "add", 0x00, 0x20, 0x00, R_TYPE),
    core(Op::Addu, "addu", 0x00, 0x21, 0x00, R_TYPE),
    core(Op::And, "and", 0x00, 0x24, 0x00, R_TYPE),
    core(Op::Nor, "nor", 0x00, 0x27, 0x00, R_TYPE),
    core(Op::Or, "or", 0x00, 0x25, 0x00, R_TYPE),
    core(Op::Slt, "slt", 0x00, 0x2A, 0x00, R_TYPE),
    core(Op::Sltu, "sltu", 0x00, 0x2B, 0x00, R_TYPE),
    core(Op::Sub, "sub", 0x00, 0x22, 0x00, R_TYPE),
    core(Op::Subu, "subu", 0x00, 0x23, 0x00, R_TYPE),
    core(Op::Xor, "xor", 0x00, 0x26, 0x00, R_TYPE),
    core(Op::Sll, "sll", 0x00, 0x00, 0x00, I_TYPE),
    core(Op::Sra, "sra", 0x00, 0x03, 0x00, I_TYPE),
    core(Op::Srl, "srl", 0x00, 0x02, 0x00, I_TYPE),
    core(Op::Beq, "beq", 0x04, 0x00, 0x00, REG_REG_LABEL),
    core(Op::Bgez, "bgez", 0x01, 0x00, 0x01, BRANCH_TYPE),
    core(Op::Bgezal, "bgezal", 0x01, 0x00, 0x11, BRANCH_TYPE),
    core(Op::Bgtz, "bgtz", 0x07, 0x00, 0x00, BRANCH_TYPE),
    core(Op::Blez, "blez", 0x06, 0x00, 0x00, BRANCH_TYPE),
    core(Op::Bltz, "bltz", 0x01, 0x00, 0x00, BRANCH_TYPE),
    core(Op::Bltzal, "bltzal", 0x01, 0x00, 0x10, BRANCH_TYPE),
    core(Op::Bne, "bne", 0x05, 0x00, 0x00, REG_REG_LABEL),
    core(Op::J, "j", 0x02, 0x00, 0x00, J_TYPE),
    core(Op::Jal, "jal", 0x03, 0x00, 0x00, J_TYPE),
    core(Op::Jr, "jr", 0x00, 0x08, 0x00, REGISTER_ONLY),
    core(Op::Syscall, "syscall", 0x00, 0x0C, 0x00, NONE_PATTERN),
    core(Op::Lb, "lb", 0x20, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Lbu, "lbu", 0x24, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Lh, "lh", 0x21, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Lhu, "lhu", 0x25, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Lw, "lw", 0x23, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Sb, "sb", 0x28, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Sh, "sh", 0x29, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Sw, "sw", 0x2B, 0x00, 0x00, I_ADDR_TYPE),
    core(Op::Addi, "addi", 0x08, 0x00, 0x00, I_TYPE),
    core(Op::Addiu, "addiu", 0x09, 0x00, 0x00, I_TYPE),
    core(Op::Andi, "andi", 0x0C, 0x00, 0x00, I_TYPE),
    core(Op::Lui, "lui", 0x0F, 0x00, 0x00, REG_IMM),
    core(Op::Ori, "ori", 0x0D, 0x00, 0x00, I_TYPE),
    core(Op::Slti, "slti", 0x0A, 0x00, 0x00, I_TYPE),
    core(Op::Sltiu, "sltiu", 0x0B, 0x00, 0x00, I_TYPE),
    core(Op::Xori, "xori", 0x0E, 0x00, 0x00, I_TYPE),
    pseudo(Op::Move, "move", REG_REG, 4),
    pseudo(Op::Li, "li", REG_IMM, 8),
    pseudo(Op::La, "la", REG_LABEL, 8),
    pseudo(Op::Not, "not", REG_REG, 4),
    pseudo(Op::Beqz, "beqz", BRANCH_TYPE, 4),
    pseudo(Op::Bge, "bge", I_BRANCH_TYPE, 8),
    pseudo(Op::Ble, "ble", I_BRANCH_TYPE, 8),
    pseudo(Op::Bnez, "bnez", BRANCH_TYPE, 4),
    pseudo(Op::Blt, "blt", I_BRANCH_TYPE, 8),
    pseudo(Op::Bgt, "bgt", I_BRANCH_TYPE, 8),
    core(Op::Div, "div", 0x00, 0x1A, 0x00, R_TYPE_OPT_REG),
    core(Op::Divu, "divu", 0x00, 0x1B, 0x00, R_TYPE_OPT_REG),
    core(Op::Mfhi, "mfhi", 0x00, 0x10, 0x00, REGISTER_ONLY),
    core(Op::Mflo, "mflo", 0x00, 0x12, 0x00, REGISTER_ONLY),
    core(Op::Mult, "mult", 0x00, 0x18, 0x00, REG_REG),
    core(Op::Multu, "multu", 0x00, 0x19, 0x00, REG_REG),
    directive(Op::DirInclude, ".include", STRING_ONLY),
    directive(Op::DirText, ".text", NONE_PATTERN),
    directive(Op::DirData, ".data", NONE_PATTERN),
    directive(Op::DirAscii, ".ascii", STRING_ONLY),
    directive(Op::DirAsciiz, ".asciiz", STRING_ONLY),
    directive(Op::DirByte, ".byte", IMM_REPEAT),
    directive(Op::DirAlign, ".align", IMMEDIATE_ONLY),
    directive(Op::DirHalf, ".half", IMM_REPEAT),
    directive(Op::DirWord, ".word", IMM_LABEL_REPEAT),
    directive(Op::DirKtext, ".ktext", NONE_PATTERN),
    directive(Op::DirKdata, ".kdata", NONE_PATTERN),
    directive(Op::DirSpace, ".space", IMMEDIATE_ONLY),
    core(Op::Mul, "mul", 0x1C, 0x02, 0x00, R_TYPE),
    pseudo(Op::Abs, "abs", REG_REG, 12),
    pseudo(Op::Neg, "neg", REG_REG, 4),
    pseudo(Op::Ror, "ror", I_TYPE, 12),
    pseudo(Op::Rol, "rol", I_TYPE, 12),
    pseudo(Op::Sgt, "sgt", R_TYPE, 4),
    pseudo(Op::B, "b", J_TYPE, 4),
    pseudo(Op::Sne, "sne", R_TYPE, 8),
    pseudo(Op::Bleu, "bleu", I_BRANCH_TYPE, 8),
    pseudo(Op::Bgeu, "bgeu", I_BRANCH_TYPE, 8),
    pseudo(Op::Bltu, "bltu", I_BRANCH_TYPE, 8),
    pseudo(Op::Bgtu, "bgtu", I_BRANCH_TYPE, 8),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_indexes_match_table_rows() {
        for (i, entry) in OPCODE_TABLE.iter().enumerate() {
            assert_eq!(entry.op as usize, i, "row {i} carries a mismatched Op");
        }
    }

    #[test]
    fn add_descriptor_is_r_type() {
        let d = Op::Add.descriptor();
        assert_eq!(d.opcode, 0x00);
        assert_eq!(d.funct, 0x20);
        assert_eq!(d.pattern, R_TYPE);
    }

    #[test]
    fn li_reserves_worst_case_size() {
        // LI's declared size (8) must cover the 2-instruction LUI+ORI expansion,
        // even though the 1-instruction ADDIU/ORI paths only emit 4 bytes.
        assert_eq!(Op::Li.descriptor().size, 8);
    }
}
