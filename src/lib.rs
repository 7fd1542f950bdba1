//! # MIPS32 Assembler
//!
//! A two-pass assembler for the MIPS32 instruction set: given one or more
//! assembly source files, it produces the binary image of four memory
//! segments (user text, user data, kernel text, kernel data) with all
//! symbolic references resolved.
//!
//! ## Pipeline
//!
//! 1. [`reserved`] / [`opcode`] — static tables of registers, mnemonics
//!    and directives, looked up once per identifier by binary search.
//! 2. [`lexer`] — tokenizes source text, resolving reserved identifiers to
//!    their [`opcode::Op`] as it goes; a stack of source frames supports
//!    `.include`.
//! 3. [`symtab`] — the symbol table: forward-reference deferral, per-symbol
//!    pending-instruction lists.
//! 4. [`assembler`] — the recursive-descent grammar driver: parses,
//!    encodes, and replays deferred instructions once their labels resolve.
//! 5. [`encoder`] — bit-exact instruction encoding, pseudo-instruction
//!    expansion, branch-offset arithmetic.
//! 6. [`segment`] — the four fixed memory segments and their growable byte
//!    images.
//!
//! [`writer`] turns the result into the object-file/dump formats described
//! in the external interface; it is a thin shell around the library proper.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mips32_assembler::assembler::assemble;
//!
//! let source = std::fs::read_to_string("program.asm").unwrap();
//! let result = assemble(None, &source);
//! if result.ok() {
//!     println!("assembled with no errors");
//! }
//! ```

pub mod assembler;
pub mod encoder;
pub mod error;
pub mod lexer;
pub mod opcode;
pub mod operand;
pub mod reserved;
pub mod segment;
pub mod symtab;
pub mod writer;
