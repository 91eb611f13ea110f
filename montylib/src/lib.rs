use std::fmt;
use std::mem;

use static_assertions::const_assert_eq;

mod fault;

pub use fault::Fault;


/// A single cell of the data area.
pub type Value = i64;

/// 1-based index of a line in the program source.
pub type LineNumber = usize;

pub const INSTRUCTION_SIZE: usize = 1;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Highest cell value `pchar` and `pstr` can print as a byte.
pub const MAX_CHAR_VALUE: Value = u8::MAX as Value;


macro_rules! declare_instructions {
    ($($name:ident $asm_name:literal $min_depth:literal),+) => {

/// Monty instructions. Each instruction is represented by one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    $($name),+
}

impl Opcode {

    /// Every opcode, in declaration order.
    pub const ALL: &'static [Opcode] = &[$(Opcode::$name),+];

    pub fn from_string(string: &str) -> Option<Self> {
        match string {
            $($asm_name => Some(Self::$name),)+
            _ => None
        }
    }


    /// The mnemonic used for this opcode in source files.
    pub fn name(self) -> &'static str {
        match self {
            $(Self::$name => $asm_name),+
        }
    }


    /// Number of cells the data area must hold before the opcode may run.
    /// Opcodes that fault on an empty area with their own diagnostic report 0 here.
    pub fn min_depth(self) -> usize {
        match self {
            $(Self::$name => $min_depth),+
        }
    }

}

    };
}

declare_instructions! {

    Push "push" 0,
    Pall "pall" 0,
    Pint "pint" 0,
    Pop "pop" 0,

    Swap "swap" 2,
    Add "add" 2,
    Sub "sub" 2,
    Div "div" 2,
    Mul "mul" 2,
    Mod "mod" 2,

    Pchar "pchar" 0,
    Pstr "pstr" 0,

    Rotl "rotl" 0,
    Rotr "rotr" 0,

    Stack "stack" 0,
    Queue "queue" 0,

    Nop "nop" 0,
    Stop "stop" 0

}

const_assert_eq!(mem::size_of::<Opcode>(), INSTRUCTION_SIZE);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
