use crate::lexer::token::TokenKind;
use crate::lexer::{tokenize, Lexer};
use crate::opcode::Op;

fn lex_ok(input: &str) -> Vec<TokenKind> {
    let result = tokenize(input);
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    result.tokens.into_iter().map(|t| t.kind).collect()
}

#[test]
fn empty_input() {
    assert_eq!(lex_ok(""), vec![TokenKind::Eof]);
}

#[test]
fn registers_and_aliases_resolve_to_same_number() {
    assert_eq!(lex_ok("$t0"), vec![TokenKind::Register(8), TokenKind::Eof]);
    assert_eq!(lex_ok("$8"), vec![TokenKind::Register(8), TokenKind::Eof]);
}

#[test]
fn mnemonic_and_directive_resolve_to_op() {
    assert_eq!(lex_ok("addu"), vec![TokenKind::Mnemonic(Op::Addu), TokenKind::Eof]);
    assert_eq!(lex_ok(".text"), vec![TokenKind::Directive(Op::DirText), TokenKind::Eof]);
}

#[test]
fn plain_identifier_is_a_label() {
    assert_eq!(
        lex_ok("loop_start"),
        vec![TokenKind::Identifier("loop_start".into()), TokenKind::Eof]
    );
}

#[test]
fn comment_is_dropped() {
    assert_eq!(lex_ok("add $t0, $t1, $t2 # sum\n"), {
        let mut v = vec![
            TokenKind::Mnemonic(Op::Add),
            TokenKind::Register(8),
            TokenKind::Comma,
            TokenKind::Register(9),
            TokenKind::Comma,
            TokenKind::Register(10),
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        v.dedup();
        v
    });
}

#[test]
fn decimal_hex_and_negative_integers() {
    assert_eq!(lex_ok("10"), vec![TokenKind::IntLiteral(10), TokenKind::Eof]);
    assert_eq!(lex_ok("0xFF"), vec![TokenKind::IntLiteral(255), TokenKind::Eof]);
    assert_eq!(lex_ok("-4"), vec![TokenKind::IntLiteral(-4), TokenKind::Eof]);
}

#[test]
fn char_literal_and_escape() {
    assert_eq!(lex_ok("'a'"), vec![TokenKind::IntLiteral('a' as i64), TokenKind::Eof]);
    assert_eq!(lex_ok("'\\n'"), vec![TokenKind::IntLiteral('\n' as i64), TokenKind::Eof]);
}

#[test]
fn string_literal_with_escapes() {
    assert_eq!(
        lex_ok("\"hi\\n\""),
        vec![TokenKind::StringLiteral("hi\n".into()), TokenKind::Eof]
    );
}

#[test]
fn punctuation_and_addressing_syntax() {
    assert_eq!(
        lex_ok("lw $t0, 4($sp)"),
        vec![
            TokenKind::Mnemonic(Op::Lw),
            TokenKind::Register(8),
            TokenKind::Comma,
            TokenKind::IntLiteral(4),
            TokenKind::LParen,
            TokenKind::Register(29),
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn label_definition_uses_colon() {
    assert_eq!(
        lex_ok("main:"),
        vec![TokenKind::Identifier("main".into()), TokenKind::Colon, TokenKind::Eof]
    );
}

#[test]
fn integer_overflow_past_32_bits_is_invalid() {
    assert!(tokenize("4294967296").errors.len() == 1); // 2^32
    assert!(tokenize("-2147483649").errors.len() == 1); // -(2^31 + 1)
    assert!(tokenize("0x100000000").errors.len() == 1); // 2^32
}

#[test]
fn integer_boundary_values_are_accepted() {
    assert_eq!(lex_ok("4294967295"), vec![TokenKind::IntLiteral(4294967295), TokenKind::Eof]);
    assert_eq!(lex_ok("-2147483648"), vec![TokenKind::IntLiteral(-2147483648), TokenKind::Eof]);
}

#[test]
fn unknown_character_is_reported() {
    let result = tokenize("@");
    assert!(!result.errors.is_empty());
}

#[test]
fn lexer_stitches_include_frame_transparently() {
    let dir = tempfile::tempdir().unwrap();
    let included_path = dir.path().join("inc.asm");
    std::fs::write(&included_path, "add $t0, $t1, $t2\n").unwrap();

    let (mut lexer, errors) = Lexer::new(Some(dir.path().join("main.asm")), ".include \"inc.asm\"\nj main\n");
    assert!(errors.is_empty());

    // First token: the `.include` directive itself, still in the root frame.
    assert_eq!(lexer.next().kind, TokenKind::Directive(Op::DirInclude));
    let path_tok = lexer.next();
    assert_eq!(path_tok.kind, TokenKind::StringLiteral("inc.asm".into()));

    let mut inc_errors = Vec::new();
    lexer.open_include("inc.asm", path_tok.span, &mut inc_errors).unwrap();
    assert!(inc_errors.is_empty());

    assert_eq!(lexer.next().kind, TokenKind::Mnemonic(Op::Add));
    assert_eq!(lexer.next().kind, TokenKind::Register(8));
    assert_eq!(lexer.next().kind, TokenKind::Comma);
    assert_eq!(lexer.next().kind, TokenKind::Register(9));
    assert_eq!(lexer.next().kind, TokenKind::Comma);
    assert_eq!(lexer.next().kind, TokenKind::Register(10));
    assert_eq!(lexer.next().kind, TokenKind::Newline);
    // The included file's own Eof is swallowed; we land back in the root
    // frame on the newline after `.include "inc.asm"`.
    assert_eq!(lexer.next().kind, TokenKind::Newline);
    assert_eq!(lexer.next().kind, TokenKind::Mnemonic(Op::J));
}
