use std::fmt;
use std::io;

use crate::{LineNumber, Opcode};


/// A fatal condition that halts the interpreter. Every fault prints exactly one diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {

    /// The interpreter was invoked with the wrong arguments.
    Usage,
    FileOpen { path: String },
    UnknownInstruction { line: LineNumber, mnemonic: String },
    AllocationFailure,
    /// `push` got no argument, or one that isn't a base-10 integer.
    NotAnInteger { line: LineNumber },
    /// `pint` on an empty data area.
    EmptyStack { line: LineNumber },
    EmptyForPop { line: LineNumber },
    /// A binary opcode ran with fewer than two cells.
    TooShort { line: LineNumber, opcode: Opcode },
    DivisionByZero { line: LineNumber },
    /// `pchar` on a value that isn't a byte.
    OutOfRange { line: LineNumber },
    EmptyForPchar { line: LineNumber },
    /// Reading the program or writing its output failed.
    Io { message: String },

}

impl Fault {

    /// Source line the fault was raised on, if it happened while executing.
    pub fn line(&self) -> Option<LineNumber> {
        match self {
            Fault::UnknownInstruction { line, .. } |
            Fault::NotAnInteger { line } |
            Fault::EmptyStack { line } |
            Fault::EmptyForPop { line } |
            Fault::TooShort { line, .. } |
            Fault::DivisionByZero { line } |
            Fault::OutOfRange { line } |
            Fault::EmptyForPchar { line }
                => Some(*line),

            Fault::Usage |
            Fault::FileOpen { .. } |
            Fault::AllocationFailure |
            Fault::Io { .. }
                => None,
        }
    }

}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Usage => write!(f, "USAGE: monty file"),
            Fault::FileOpen { path } => write!(f, "Error: Can't open file {path}"),
            Fault::UnknownInstruction { line, mnemonic } => write!(f, "L{line}: unknown instruction {mnemonic}"),
            Fault::AllocationFailure => write!(f, "Error: malloc failed"),
            Fault::NotAnInteger { line } => write!(f, "L{line}: usage: push integer"),
            Fault::EmptyStack { line } => write!(f, "L{line}: can't pint, stack empty"),
            Fault::EmptyForPop { line } => write!(f, "L{line}: can't pop an empty stack"),
            Fault::TooShort { line, opcode } => write!(f, "L{line}: can't {opcode}, stack too short"),
            Fault::DivisionByZero { line } => write!(f, "L{line}: division by zero"),
            Fault::OutOfRange { line } => write!(f, "L{line}: can't pchar, value out of range"),
            Fault::EmptyForPchar { line } => write!(f, "L{line}: can't pchar, stack empty"),
            Fault::Io { message } => write!(f, "Error: {message}"),
        }
    }
}

impl std::error::Error for Fault {}

impl From<io::Error> for Fault {
    fn from(err: io::Error) -> Self {
        Fault::Io { message: err.to_string() }
    }
}
