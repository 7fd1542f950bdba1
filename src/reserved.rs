//! The reserved-identifier table: every register name, ABI alias, directive
//! and mnemonic the tokenizer may fold into a non-identifier token, kept
//! sorted by byte value and searched with `binary_search_by`.

use crate::opcode::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedKind {
    Register(u8),
    Mnemonic(Op),
    Directive(Op),
}

#[derive(Debug, Clone, Copy)]
pub struct ReservedEntry {
    pub name: &'static str,
    pub kind: ReservedKind,
}

const fn reg(name: &'static str, n: u8) -> ReservedEntry {
    ReservedEntry {
        name,
        kind: ReservedKind::Register(n),
    }
}

const fn mnem(name: &'static str, op: Op) -> ReservedEntry {
    ReservedEntry {
        name,
        kind: ReservedKind::Mnemonic(op),
    }
}

const fn dir(name: &'static str, op: Op) -> ReservedEntry {
    ReservedEntry {
        name,
        kind: ReservedKind::Directive(op),
    }
}

/// Sorted by `name` as plain ASCII byte order (`$` < `.` < lowercase
/// letters), matching the table this tokenizer's reference design builds.
/// `ordering_matches_sort` below guards the invariant the binary search
/// depends on.
pub static RESERVED_TABLE: &[ReservedEntry] = &[
    reg("$0", 0),
    reg("$1", 1),
    reg("$10", 10),
    reg("$11", 11),
    reg("$12", 12),
    reg("$13", 13),
    reg("$14", 14),
    reg("$15", 15),
    reg("$16", 16),
    reg("$17", 17),
    reg("$18", 18),
    reg("$19", 19),
    reg("$2", 2),
    reg("$20", 20),
    reg("$21", 21),
    reg("$22", 22),
    reg("$23", 23),
    reg("$24", 24),
    reg("$25", 25),
    reg("$26", 26),
    reg("$27", 27),
    reg("$28", 28),
    reg("$29", 29),
    reg("$3", 3),
    reg("$30", 30),
    reg("$31", 31),
    reg("$4", 4),
    reg("$5", 5),
    reg("$6", 6),
    reg("$7", 7),
    reg("$8", 8),
    reg("$9", 9),
    reg("$a0", 4),
    reg("$a1", 5),
    reg("$a2", 6),
    reg("$a3", 7),
    reg("$at", 1),
    reg("$fp", 30),
    reg("$gp", 28),
    reg("$k0", 26),
    reg("$k1", 27),
    reg("$ra", 31),
    reg("$s0", 16),
    reg("$s1", 17),
    reg("$s2", 18),
    reg("$s3", 19),
    reg("$s4", 20),
    reg("$s5", 21),
    reg("$s6", 22),
    reg("$s7", 23),
    reg("$sp", 29),
    reg("$t0", 8),
    reg("$t1", 9),
    reg("$t2", 10),
    reg("$t3", 11),
    reg("$t4", 12),
    reg("$t5", 13),
    reg("$t6", 14),
    reg("$t7", 15),
    reg("$t8", 24),
    reg("$t9", 25),
    reg("$v0", 2),
    reg("$v1", 3),
    reg("$zero", 0),
    dir(".align", Op::DirAlign),
    dir(".ascii", Op::DirAscii),
    dir(".asciiz", Op::DirAsciiz),
    dir(".byte", Op::DirByte),
    dir(".data", Op::DirData),
    dir(".half", Op::DirHalf),
    dir(".include", Op::DirInclude),
    dir(".kdata", Op::DirKdata),
    dir(".ktext", Op::DirKtext),
    dir(".space", Op::DirSpace),
    dir(".text", Op::DirText),
    dir(".word", Op::DirWord),
    mnem("abs", Op::Abs),
    mnem("add", Op::Add),
    mnem("addi", Op::Addi),
    mnem("addiu", Op::Addiu),
    mnem("addu", Op::Addu),
    mnem("and", Op::And),
    mnem("andi", Op::Andi),
    mnem("b", Op::B),
    mnem("beq", Op::Beq),
    mnem("beqz", Op::Beqz),
    mnem("bge", Op::Bge),
    mnem("bgeu", Op::Bgeu),
    mnem("bgez", Op::Bgez),
    mnem("bgezal", Op::Bgezal),
    mnem("bgt", Op::Bgt),
    mnem("bgtu", Op::Bgtu),
    mnem("bgtz", Op::Bgtz),
    mnem("ble", Op::Ble),
    mnem("bleu", Op::Bleu),
    mnem("blez", Op::Blez),
    mnem("blt", Op::Blt),
    mnem("bltu", Op::Bltu),
    mnem("bltz", Op::Bltz),
    mnem("bltzal", Op::Bltzal),
    mnem("bne", Op::Bne),
    mnem("bnez", Op::Bnez),
    mnem("div", Op::Div),
    mnem("divu", Op::Divu),
    mnem("j", Op::J),
    mnem("jal", Op::Jal),
    mnem("jr", Op::Jr),
    mnem("la", Op::La),
    mnem("lb", Op::Lb),
    mnem("lbu", Op::Lbu),
    mnem("lh", Op::Lh),
    mnem("lhu", Op::Lhu),
    mnem("li", Op::Li),
    mnem("lui", Op::Lui),
    mnem("lw", Op::Lw),
    mnem("mfhi", Op::Mfhi),
    mnem("mflo", Op::Mflo),
    mnem("move", Op::Move),
    mnem("mul", Op::Mul),
    mnem("mult", Op::Mult),
    mnem("multu", Op::Multu),
    mnem("neg", Op::Neg),
    mnem("nor", Op::Nor),
    mnem("not", Op::Not),
    mnem("or", Op::Or),
    mnem("ori", Op::Ori),
    mnem("rol", Op::Rol),
    mnem("ror", Op::Ror),
    mnem("sb", Op::Sb),
    mnem("sgt", Op::Sgt),
    mnem("sh", Op::Sh),
    mnem("sll", Op::Sll),
    mnem("slt", Op::Slt),
    mnem("slti", Op::Slti),
    mnem("sltiu", Op::Sltiu),
    mnem("sltu", Op::Sltu),
    mnem("sne", Op::Sne),
    mnem("sra", Op::Sra),
    mnem("srl", Op::Srl),
    mnem("sub", Op::Sub),
    mnem("subu", Op::Subu),
    mnem("sw", Op::Sw),
    mnem("syscall", Op::Syscall),
    mnem("xor", Op::Xor),
    mnem("xori", Op::Xori),
];

/// Binary search by name. Returns `None` for ordinary identifiers.
pub fn lookup(name: &str) -> Option<&'static ReservedEntry> {
    RESERVED_TABLE
        .binary_search_by(|entry| entry.name.cmp(name))
        .ok()
        .map(|idx| &RESERVED_TABLE[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_sort() {
        let mut sorted: Vec<&str> = RESERVED_TABLE.iter().map(|e| e.name).collect();
        sorted.sort_unstable();
        let actual: Vec<&str> = RESERVED_TABLE.iter().map(|e| e.name).collect();
        assert_eq!(actual, sorted, "RESERVED_TABLE must stay sorted for binary_search");
    }

    #[test]
    fn finds_register_and_alias_to_same_number() {
        assert_eq!(lookup("$sp").unwrap().kind, ReservedKind::Register(29));
        assert_eq!(lookup("$29").unwrap().kind, ReservedKind::Register(29));
    }

    #[test]
    fn finds_directive_and_mnemonic() {
        assert_eq!(lookup(".word").unwrap().kind, ReservedKind::Directive(Op::DirWord));
        assert_eq!(lookup("addiu").unwrap().kind, ReservedKind::Mnemonic(Op::Addiu));
    }

    #[test]
    fn unknown_identifier_is_not_reserved() {
        assert!(lookup("main").is_none());
        assert!(lookup("loop_start").is_none());
    }
}
