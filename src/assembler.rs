//! The grammar driver: a recursive-descent LL(1) walk over the token
//! stream that encodes each instruction as it is parsed, deferring only
//! the ones whose label operand is still undefined, and replays deferred
//! instructions the moment their label is defined (spec §4.4).

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::encoder::{self, EncodeOutcome};
use crate::error::{AsmError, ErrorKind, Span};
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::Lexer;
use crate::opcode::Op;
use crate::operand::{self, Operand};
use crate::segment::{Segment, SegmentImage, SEGMENT_COUNT};
use crate::symtab::{PendingInstruction, SymbolStatus, SymbolTable};

pub struct AssembleResult {
    pub segments: [SegmentImage; SEGMENT_COUNT],
    pub symbols: SymbolTable,
    pub errors: Vec<AsmError>,
}

impl AssembleResult {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn segment(&self, segment: Segment) -> &SegmentImage {
        &self.segments[segment.index()]
    }
}

/// Assemble one top-level source file (and anything it `.include`s) into
/// four segment images.
pub fn assemble(path: Option<PathBuf>, source: &str) -> AssembleResult {
    let mut driver = Driver::new(path, source);
    driver.run();
    driver.finish()
}

/// Assemble several top-level source files as one continuous stream, in
/// the order given — the CLI's multi-input surface. Symbols and segment
/// cursors carry across file boundaries exactly as across an `.include`.
pub fn assemble_files(files: Vec<(Option<PathBuf>, String)>) -> AssembleResult {
    let mut driver = Driver::new_multi(files);
    driver.run();
    driver.finish()
}

/// Small lookahead buffer over [`Lexer::next`] so the driver can peek past
/// a label's colon to decide whether `.word`/`.half` alignment needs to
/// happen before the label is bound.
struct TokenStream {
    lexer: Lexer,
    buf: VecDeque<Token>,
}

impl TokenStream {
    fn peek(&mut self, n: usize) -> &Token {
        while self.buf.len() <= n {
            let tok = self.lexer.next();
            self.buf.push_back(tok);
        }
        &self.buf[n]
    }

    fn advance(&mut self) -> Token {
        self.peek(0);
        self.buf.pop_front().unwrap()
    }
}

struct Driver {
    stream: TokenStream,
    segments: [SegmentImage; SEGMENT_COUNT],
    symbols: SymbolTable,
    segment: Segment,
    errors: Vec<AsmError>,
}

impl Driver {
    fn new(path: Option<PathBuf>, source: &str) -> Self {
        Self::new_multi(vec![(path, source.to_string())])
    }

    /// Assembles `files` as one continuous token stream, in order — each
    /// entry behaves like a `.include` target stacked ahead of time, so
    /// labels and deferred references resolve across file boundaries
    /// exactly as they would within a single `.include`d file (spec §5's
    /// include ordering guarantee, generalized to top-level inputs).
    fn new_multi(files: Vec<(Option<PathBuf>, String)>) -> Self {
        let (lexer, lex_errors) = Lexer::new_multi(files);
        Self {
            stream: TokenStream { lexer, buf: VecDeque::new() },
            segments: Segment::ALL.map(SegmentImage::new),
            symbols: SymbolTable::new(),
            segment: Segment::UserText,
            errors: lex_errors,
        }
    }

    fn image(&self) -> &SegmentImage {
        &self.segments[self.segment.index()]
    }

    fn image_mut(&mut self) -> &mut SegmentImage {
        &mut self.segments[self.segment.index()]
    }

    fn error(&mut self, err: AsmError) {
        self.errors.push(tag_file(err, self.stream.lexer.current_file()));
    }

    fn run(&mut self) {
        loop {
            if matches!(self.stream.peek(0).kind, TokenKind::Eof) {
                break;
            }
            self.parse_line();
        }
    }

    fn finish(mut self) -> AssembleResult {
        let undefined: Vec<(String, Span)> = self
            .symbols
            .entries_in_touched_order()
            .filter(|e| e.status == SymbolStatus::Undefined)
            .filter_map(|e| e.pending.first().map(|p| (e.name.clone(), p.span)))
            .collect();
        for (name, span) in undefined {
            self.error(AsmError::new(ErrorKind::LabelUndefined(name), span));
        }
        AssembleResult {
            segments: self.segments,
            symbols: self.symbols,
            errors: self.errors,
        }
    }

    fn parse_line(&mut self) {
        if matches!(self.stream.peek(0).kind, TokenKind::Newline) {
            self.stream.advance();
            return;
        }

        if let TokenKind::Identifier(name) = self.stream.peek(0).kind.clone() {
            if matches!(self.stream.peek(1).kind, TokenKind::Colon) {
                let span = self.stream.peek(0).span;
                self.stream.advance();
                self.stream.advance();
                self.define_label(&name, span);
                self.parse_line_tail();
                return;
            }
        }

        self.parse_line_tail();
    }

    fn parse_line_tail(&mut self) {
        match self.stream.peek(0).kind.clone() {
            TokenKind::Newline => {
                self.stream.advance();
            }
            TokenKind::Eof => {}
            TokenKind::Mnemonic(op) => {
                let span = self.stream.advance().span;
                self.parse_instruction(op, span);
                self.expect_eol();
            }
            TokenKind::Directive(op) => {
                let span = self.stream.advance().span;
                self.parse_directive(op, span);
                self.expect_eol();
            }
            other => {
                let span = self.stream.peek(0).span;
                self.error(AsmError::new(
                    ErrorKind::ParseUnexpected {
                        expected: "an instruction, directive, or end of line".into(),
                        found: describe(&other),
                    },
                    span,
                ));
                self.recover();
            }
        }
    }

    fn expect_eol(&mut self) {
        match self.stream.peek(0).kind.clone() {
            TokenKind::Newline => {
                self.stream.advance();
            }
            TokenKind::Eof => {}
            other => {
                let span = self.stream.peek(0).span;
                self.error(AsmError::new(
                    ErrorKind::ParseUnexpected {
                        expected: "end of line".into(),
                        found: describe(&other),
                    },
                    span,
                ));
                self.recover();
            }
        }
    }

    /// Drain tokens up to (and including) the next `Newline`, so one bad
    /// line does not cascade into spurious errors on the next.
    fn recover(&mut self) {
        loop {
            match self.stream.peek(0).kind {
                TokenKind::Newline => {
                    self.stream.advance();
                    break;
                }
                TokenKind::Eof => break,
                _ => {
                    self.stream.advance();
                }
            }
        }
    }

    fn define_label(&mut self, name: &str, span: Span) {
        if let TokenKind::Directive(op) = self.stream.peek(0).kind {
            let pre_align = match op {
                Op::DirWord => Some(2),
                Op::DirHalf => Some(1),
                _ => None,
            };
            if let Some(boundary) = pre_align {
                if let Err(e) = self.image_mut().align(boundary, span) {
                    self.error(e);
                }
            }
        }

        let idx = self.symbols.touch(name);
        let offset = self.image().cursor();
        let segment = self.segment;

        let already_defined = self.symbols.entry_at(idx).status == SymbolStatus::Defined;
        if already_defined {
            self.error(AsmError::new(ErrorKind::LabelRedefined(name.to_string()), span));
            return;
        }

        let entry = self.symbols.entry_at_mut(idx);
        entry.status = SymbolStatus::Defined;
        entry.segment = segment;
        entry.offset = offset;
        entry.definition_span = Some(span);

        self.replay_pending(idx);
    }

    fn replay_pending(&mut self, idx: usize) {
        let pending = std::mem::take(&mut self.symbols.entry_at_mut(idx).pending);
        for p in pending {
            self.replay_one(p);
        }
    }

    fn replay_one(&mut self, pending: PendingInstruction) {
        if pending.op == Op::DirWord {
            if let Operand::Label(name) = &pending.operands[0] {
                if let Some(addr) = self.resolved_address(name) {
                    self.segments[pending.segment.index()].patch(pending.patch_offset, &addr.to_le_bytes());
                }
            }
            return;
        }

        let outcome = {
            let symbols = &self.symbols;
            let mut resolver = |name: &str| {
                symbols
                    .get(name)
                    .filter(|e| e.status == SymbolStatus::Defined)
                    .map(|e| e.segment.base() + e.offset)
            };
            encoder::encode(pending.op, &pending.operands, pending.instruction_address, pending.span, &mut resolver)
        };

        match outcome {
            Ok(EncodeOutcome::Words(words)) => {
                let mut offset = pending.patch_offset;
                for w in words {
                    self.segments[pending.segment.index()].patch(offset, &w.to_le_bytes());
                    offset += 4;
                }
            }
            Ok(EncodeOutcome::Deferred { label }) => {
                let idx = self.symbols.touch(&label);
                self.symbols.entry_at_mut(idx).pending.push(pending);
            }
            Err(e) => self.error(e),
        }
    }

    fn resolved_address(&self, name: &str) -> Option<u32> {
        self.symbols
            .get(name)
            .filter(|e| e.status == SymbolStatus::Defined)
            .map(|e| e.segment.base() + e.offset)
    }

    fn parse_instruction(&mut self, op: Op, span: Span) {
        let operands = match self.parse_operands() {
            Ok(ops) => ops,
            Err(e) => {
                self.error(e);
                return;
            }
        };
        if let Err(e) = operand::verify(op.descriptor(), &operands, span) {
            self.error(e);
            return;
        }
        if !self.segment.is_text() {
            self.error(AsmError::new(
                ErrorKind::SegmentMisuse("instructions are only valid in a text segment".into()),
                span,
            ));
            return;
        }

        for operand in &operands {
            if let Operand::Label(name) = operand {
                self.symbols.touch(name);
            }
        }

        let instr_addr = self.image().address();
        let outcome = {
            let symbols = &self.symbols;
            let mut resolver = |name: &str| {
                symbols
                    .get(name)
                    .filter(|e| e.status == SymbolStatus::Defined)
                    .map(|e| e.segment.base() + e.offset)
            };
            encoder::encode(op, &operands, instr_addr, span, &mut resolver)
        };

        match outcome {
            Ok(EncodeOutcome::Words(words)) => {
                for w in words {
                    if let Err(e) = self.image_mut().write(&w.to_le_bytes(), span) {
                        self.error(e);
                        return;
                    }
                }
            }
            Ok(EncodeOutcome::Deferred { label }) => {
                let desc = op.descriptor();
                let patch_offset = self.image().cursor();
                if let Err(e) = self.image_mut().space(desc.size as u32, span) {
                    self.error(e);
                    return;
                }
                let idx = self.symbols.touch(&label);
                self.symbols.entry_at_mut(idx).pending.push(PendingInstruction {
                    segment: self.segment,
                    patch_offset,
                    instruction_address: instr_addr,
                    op,
                    operands,
                    span,
                });
            }
            Err(e) => self.error(e),
        }
    }

    fn parse_directive(&mut self, op: Op, span: Span) {
        match op {
            Op::DirText => self.segment = Segment::UserText,
            Op::DirData => self.segment = Segment::UserData,
            Op::DirKtext => self.segment = Segment::KernelText,
            Op::DirKdata => self.segment = Segment::KernelData,
            Op::DirAlign => self.parse_dir_align(span),
            Op::DirSpace => self.parse_dir_space(span),
            Op::DirByte => self.parse_dir_byte(span),
            Op::DirHalf => self.parse_dir_half(span),
            Op::DirWord => self.parse_dir_word(span),
            Op::DirAscii => self.parse_dir_ascii(span, false),
            Op::DirAsciiz => self.parse_dir_ascii(span, true),
            Op::DirInclude => self.parse_dir_include(span),
            _ => unreachable!("{op:?} is not a directive"),
        }
    }

    fn parse_operands(&mut self) -> Result<Vec<Operand>, AsmError> {
        let mut operands = Vec::new();
        loop {
            if matches!(self.stream.peek(0).kind, TokenKind::Newline | TokenKind::Eof) {
                break;
            }
            operands.push(self.parse_operand()?);
            if matches!(self.stream.peek(0).kind, TokenKind::Comma) {
                self.stream.advance();
                continue;
            }
            break;
        }
        Ok(operands)
    }

    fn parse_operand(&mut self) -> Result<Operand, AsmError> {
        let tok = self.stream.advance();
        match tok.kind {
            TokenKind::Register(r) => Ok(Operand::Register(r)),
            TokenKind::IntLiteral(v) => {
                if matches!(self.stream.peek(0).kind, TokenKind::LParen) {
                    self.stream.advance();
                    let base = self.parse_register_rparen()?;
                    Ok(Operand::Address { offset: v as i32, base: Some(base) })
                } else {
                    Ok(Operand::Immediate(v))
                }
            }
            TokenKind::LParen => {
                let base = self.parse_register_rparen()?;
                Ok(Operand::Address { offset: 0, base: Some(base) })
            }
            TokenKind::Identifier(name) => Ok(Operand::Label(name)),
            TokenKind::StringLiteral(s) => Ok(Operand::Str(s)),
            other => Err(AsmError::new(
                ErrorKind::ParseUnexpected {
                    expected: "an operand".into(),
                    found: describe(&other),
                },
                tok.span,
            )),
        }
    }

    /// Consumes `register )`, assuming the opening `(` was already consumed.
    fn parse_register_rparen(&mut self) -> Result<u8, AsmError> {
        let reg_tok = self.stream.advance();
        let base = match reg_tok.kind {
            TokenKind::Register(r) => r,
            other => {
                return Err(AsmError::new(
                    ErrorKind::ParseUnexpected {
                        expected: "a register".into(),
                        found: describe(&other),
                    },
                    reg_tok.span,
                ))
            }
        };
        let rparen = self.stream.advance();
        if !matches!(rparen.kind, TokenKind::RParen) {
            return Err(AsmError::new(
                ErrorKind::ParseUnexpected {
                    expected: "')'".into(),
                    found: describe(&rparen.kind),
                },
                rparen.span,
            ));
        }
        Ok(base)
    }

    fn parse_dir_align(&mut self, span: Span) {
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        if let Err(e) = operand::verify(Op::DirAlign.descriptor(), &operands, span) {
            return self.error(e);
        }
        let n = match operands[0] {
            Operand::Immediate(v) => v,
            _ => unreachable!(),
        };
        if !(0..=31).contains(&n) {
            return self.error(AsmError::new(ErrorKind::AlignOutOfRange(n as u32), span));
        }
        if let Err(e) = self.image_mut().align(n as u32, span) {
            self.error(e);
        }
    }

    fn parse_dir_space(&mut self, span: Span) {
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        if let Err(e) = operand::verify(Op::DirSpace.descriptor(), &operands, span) {
            return self.error(e);
        }
        let n = match operands[0] {
            Operand::Immediate(v) => v as u32,
            _ => unreachable!(),
        };
        if let Err(e) = self.image_mut().space(n, span) {
            self.error(e);
        }
    }

    /// `.ascii`/`.asciiz`/`.half`/`.byte` are only legal in `user-data`
    /// (spec §4.6); `.word` has no such restriction.
    fn require_user_data(&mut self, mnemonic: &'static str, span: Span) -> bool {
        if self.segment != Segment::UserData {
            self.error(AsmError::new(
                ErrorKind::SegmentMisuse(format!("'{mnemonic}' is only valid in the user-data segment")),
                span,
            ));
            return false;
        }
        true
    }

    fn parse_dir_byte(&mut self, span: Span) {
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        if let Err(e) = operand::verify(Op::DirByte.descriptor(), &operands, span) {
            return self.error(e);
        }
        if !self.require_user_data(".byte", span) {
            return;
        }
        for operand in operands {
            if let Operand::Immediate(v) = operand {
                if let Err(e) = self.image_mut().write(&[v as u8], span) {
                    self.error(e);
                    return;
                }
            }
        }
    }

    fn parse_dir_half(&mut self, span: Span) {
        if let Err(e) = self.image_mut().align(1, span) {
            return self.error(e);
        }
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        if let Err(e) = operand::verify(Op::DirHalf.descriptor(), &operands, span) {
            return self.error(e);
        }
        if !self.require_user_data(".half", span) {
            return;
        }
        for operand in operands {
            if let Operand::Immediate(v) = operand {
                if let Err(e) = self.image_mut().write(&(v as u16).to_le_bytes(), span) {
                    self.error(e);
                    return;
                }
            }
        }
    }

    fn parse_dir_word(&mut self, span: Span) {
        if let Err(e) = self.image_mut().align(2, span) {
            return self.error(e);
        }
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        if let Err(e) = operand::verify(Op::DirWord.descriptor(), &operands, span) {
            return self.error(e);
        }
        for operand in operands {
            match operand {
                Operand::Immediate(v) => {
                    if let Err(e) = self.image_mut().write(&(v as u32).to_le_bytes(), span) {
                        self.error(e);
                        return;
                    }
                }
                Operand::Label(name) => {
                    let idx = self.symbols.touch(&name);
                    if let Some(addr) = self.resolved_address(&name) {
                        let _ = idx;
                        if let Err(e) = self.image_mut().write(&addr.to_le_bytes(), span) {
                            self.error(e);
                            return;
                        }
                    } else {
                        let patch_offset = self.image().cursor();
                        let instruction_address = self.image().address();
                        if let Err(e) = self.image_mut().space(4, span) {
                            self.error(e);
                            return;
                        }
                        let segment = self.segment;
                        self.symbols.entry_at_mut(idx).pending.push(PendingInstruction {
                            segment,
                            patch_offset,
                            instruction_address,
                            op: Op::DirWord,
                            operands: vec![Operand::Label(name)],
                            span,
                        });
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    fn parse_dir_ascii(&mut self, span: Span, nul_terminated: bool) {
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        let desc = if nul_terminated { Op::DirAsciiz.descriptor() } else { Op::DirAscii.descriptor() };
        if let Err(e) = operand::verify(desc, &operands, span) {
            return self.error(e);
        }
        if !self.require_user_data(desc.mnemonic, span) {
            return;
        }
        let text = match &operands[0] {
            Operand::Str(s) => s.clone(),
            _ => unreachable!(),
        };
        let mut bytes = text.into_bytes();
        if nul_terminated {
            bytes.push(0);
        }
        if let Err(e) = self.image_mut().write(&bytes, span) {
            self.error(e);
        }
    }

    fn parse_dir_include(&mut self, span: Span) {
        let operands = match self.parse_operands() {
            Ok(o) => o,
            Err(e) => return self.error(e),
        };
        if let Err(e) = operand::verify(Op::DirInclude.descriptor(), &operands, span) {
            return self.error(e);
        }
        let path = match &operands[0] {
            Operand::Str(s) => s.clone(),
            _ => unreachable!(),
        };
        if let Err(e) = self.stream.lexer.open_include(&path, span, &mut self.errors) {
            self.error(e);
        }
    }
}

fn tag_file(err: AsmError, file: Option<PathBuf>) -> AsmError {
    match file {
        Some(f) => err.with_file(f),
        None => err,
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Register(r) => format!("register ${r}"),
        TokenKind::Mnemonic(op) => format!("mnemonic '{}'", op.descriptor().mnemonic),
        TokenKind::Directive(op) => format!("directive '{}'", op.descriptor().mnemonic),
        TokenKind::Identifier(name) => format!("identifier '{name}'"),
        TokenKind::IntLiteral(v) => format!("integer {v}"),
        TokenKind::StringLiteral(_) => "a string literal".into(),
        TokenKind::Colon => "':'".into(),
        TokenKind::Comma => "','".into(),
        TokenKind::LParen => "'('".into(),
        TokenKind::RParen => "')'".into(),
        TokenKind::Newline => "end of line".into(),
        TokenKind::Eof => "end of file".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_ok(source: &str) -> AssembleResult {
        let result = assemble(None, source);
        assert!(result.ok(), "unexpected errors: {:?}", result.errors);
        result
    }

    #[test]
    fn simple_add_sequence() {
        let result = assemble_ok(".text\nadd $t0, $t1, $t2\n");
        let bytes = result.segment(Segment::UserText).bytes();
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn forward_label_reference_resolves() {
        let result = assemble_ok(".text\nj target\ntarget:\nadd $t0, $t0, $t0\n");
        assert!(result.ok());
        let bytes = result.segment(Segment::UserText).bytes();
        assert_eq!(bytes.len(), 8);
        let target_addr = result.symbols.get("target").unwrap().segment.base() + result.symbols.get("target").unwrap().offset;
        assert_eq!(target_addr, Segment::UserText.base() + 4);
    }

    #[test]
    fn backward_label_reference_resolves_immediately() {
        let result = assemble_ok(".text\nstart:\nadd $t0, $t0, $t0\nj start\n");
        assert!(result.ok());
    }

    #[test]
    fn undefined_label_is_reported() {
        let result = assemble(None, ".text\nj nowhere\n");
        assert!(!result.ok());
        assert!(result.errors.iter().any(|e| matches!(e.kind, ErrorKind::LabelUndefined(_))));
    }

    #[test]
    fn redefined_label_is_reported() {
        let result = assemble(None, ".text\nfoo:\nfoo:\nadd $t0, $t0, $t0\n");
        assert!(result.errors.iter().any(|e| matches!(e.kind, ErrorKind::LabelRedefined(_))));
    }

    #[test]
    fn word_directive_aligns_and_defers_label() {
        let result = assemble_ok(".data\n.byte 1\nptr:\n.word target\n.text\ntarget:\nadd $t0, $t0, $t0\n");
        let data = result.segment(Segment::UserData).bytes();
        // `.byte 1` then align(2) pads 3 bytes before the `.word` slot.
        assert_eq!(data.len(), 8);
        let word_bytes = &data[4..8];
        let target_entry = result.symbols.get("target").unwrap();
        let expected_addr = target_entry.segment.base() + target_entry.offset;
        assert_eq!(u32::from_le_bytes(word_bytes.try_into().unwrap()), expected_addr);
    }

    #[test]
    fn segment_directives_switch_active_segment() {
        let result = assemble_ok(".data\n.byte 1, 2, 3\n.text\nadd $t0, $t0, $t0\n");
        assert_eq!(result.segment(Segment::UserData).bytes(), &[1, 2, 3]);
        assert_eq!(result.segment(Segment::UserText).bytes().len(), 4);
    }

    #[test]
    fn instruction_outside_text_segment_is_rejected() {
        let result = assemble(None, ".data\nadd $t0, $t0, $t0\n");
        assert!(result.errors.iter().any(|e| matches!(e.kind, ErrorKind::SegmentMisuse(_))));
    }

    #[test]
    fn li_with_small_and_large_immediates() {
        let result = assemble_ok(".text\nli $t0, 5\nli $t0, 0x12345678\n");
        assert_eq!(result.segment(Segment::UserText).bytes().len(), 4 + 8);
    }

    #[test]
    fn ascii_and_asciiz_directives() {
        let result = assemble_ok(".data\n.ascii \"ab\"\n.asciiz \"c\"\n");
        assert_eq!(result.segment(Segment::UserData).bytes(), &[b'a', b'b', b'c', 0]);
    }

    #[test]
    fn align_zero_operand_is_a_noop() {
        let result = assemble_ok(".data\n.byte 1\n.align 0\n.byte 2\n");
        assert_eq!(result.segment(Segment::UserData).bytes(), &[1, 2]);
    }

    #[test]
    fn parse_error_recovers_at_next_line() {
        let result = assemble(None, ".text\nadd $t0, $t0\nadd $t1, $t1, $t2\n");
        assert!(!result.ok());
        // the second, well-formed line still assembles despite the first's error
        assert_eq!(result.segment(Segment::UserText).bytes().len(), 4);
    }
}
