use mips32_assembler::assembler::assemble;
use mips32_assembler::segment::Segment;

fn words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn simple_addu_encodes_as_a_single_r_type_word() {
    let result = assemble(None, ".text\nmain: addu $t0, $t1, $t2\n");
    assert!(result.ok(), "{:?}", result.errors);

    let text = result.segment(Segment::UserText);
    assert_eq!(words(text.bytes()), vec![0x012A_4021]);

    let main = result.symbols.get("main").expect("main should be defined");
    assert_eq!(main.offset, 0);
}

#[test]
fn self_referencing_branch_encodes_a_negative_one_offset() {
    let result = assemble(None, ".text\nloop: beq $t0, $t1, loop\n");
    assert!(result.ok(), "{:?}", result.errors);

    let text = result.segment(Segment::UserText);
    assert_eq!(words(text.bytes()), vec![0x1109_FFFF]);
}

#[test]
fn la_and_asciiz_round_trip_across_segments() {
    let source = "\
.text
la $t0, msg
.data
msg: .asciiz \"hi\"
";
    let result = assemble(None, source);
    assert!(result.ok(), "{:?}", result.errors);

    let text = result.segment(Segment::UserText);
    let hi16 = Segment::UserData.base() >> 16;
    assert_eq!(words(text.bytes()), vec![0x3C01_0000 | hi16, 0x3428_0000]);

    let data = result.segment(Segment::UserData);
    assert_eq!(data.bytes(), &[b'h', b'i', 0x00]);
}

#[test]
fn li_with_a_large_immediate_expands_to_lui_ori() {
    let result = assemble(None, ".text\nli $t0, 0x12345678\n");
    assert!(result.ok(), "{:?}", result.errors);

    let text = result.segment(Segment::UserText);
    assert_eq!(words(text.bytes()), vec![0x3C01_1234, 0x3428_5678]);
}

#[test]
fn li_with_a_small_immediate_emits_addiu() {
    let result = assemble(None, ".text\nli $t0, 5\n");
    assert!(result.ok(), "{:?}", result.errors);

    let text = result.segment(Segment::UserText);
    assert_eq!(words(text.bytes()), vec![0x2408_0005]);
}

#[test]
fn align_then_word_lays_out_data_segment_correctly() {
    let result = assemble(None, ".data\n.align 2\nw: .word 1,2,3\n");
    assert!(result.ok(), "{:?}", result.errors);

    let data = result.segment(Segment::UserData);
    assert_eq!(data.bytes(), &[1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]);

    let w = result.symbols.get("w").expect("w should be defined");
    assert_eq!(w.offset, 0);
}

#[test]
fn forward_jump_resolves_and_unresolved_labels_fail_assembly() {
    let source = "\
.text
j end
sll $0, $0, 0
end: syscall
";
    let result = assemble(None, source);
    assert!(result.ok(), "{:?}", result.errors);

    let text = result.segment(Segment::UserText);
    let target = Segment::UserText.base() + 8; // past `j` and the filler instruction
    assert_eq!(words(text.bytes())[0], 0x0800_0000 | (target >> 2));

    let bad = assemble(None, ".text\nj nowhere\n");
    assert!(!bad.ok());
    assert!(bad
        .errors
        .iter()
        .any(|e| matches!(e.kind, mips32_assembler::error::ErrorKind::LabelUndefined(_))));
}

#[test]
fn cli_writes_object_file_and_reports_exit_codes() {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("prog.asm");
    std::fs::File::create(&src_path)
        .unwrap()
        .write_all(b".text\nmain: addu $t0, $t1, $t2\n")
        .unwrap();
    let out_path = dir.path().join("prog.obj");

    Command::cargo_bin("mips32-assembler")
        .unwrap()
        .arg(&src_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success();

    let bytes = std::fs::read(&out_path).unwrap();
    assert_eq!(&bytes[0..4], b"mips");

    let assemble_only_out = dir.path().join("unused.obj");
    Command::cargo_bin("mips32-assembler")
        .unwrap()
        .arg(&src_path)
        .arg("-a")
        .arg("-o")
        .arg(&assemble_only_out)
        .assert()
        .success();
    assert!(!assemble_only_out.exists());

    let bad_path = dir.path().join("bad.asm");
    std::fs::File::create(&bad_path)
        .unwrap()
        .write_all(b".text\nj nowhere\n")
        .unwrap();
    Command::cargo_bin("mips32-assembler")
        .unwrap()
        .arg(&bad_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERROR"));

    Command::cargo_bin("mips32-assembler")
        .unwrap()
        .arg(dir.path().join("missing.asm"))
        .assert()
        .code(2);
}
