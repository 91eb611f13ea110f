use lazy_static::lazy_static;
use regex::Regex;

use montylib::{LineNumber, Value};


lazy_static! {

    static ref LINE_REGEX: Regex = Regex::new(
        r"^\s*(?P<mnemonic>\S+)(?:\s+(?P<argument>.*?))?\s*$"
    ).unwrap();

    static ref INTEGER_REGEX: Regex = Regex::new(
        r"^[+-]?[0-9]+$"
    ).unwrap();

}


/// A non-blank source line split into its mnemonic and the rest of the line.
#[derive(Debug, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub line_number: LineNumber,
    pub mnemonic: &'a str,
    pub argument: Option<&'a str>,
}


/// Split `line` into mnemonic and argument. Blank lines yield `None`.
pub fn lex_line(line: &str, line_number: LineNumber) -> Option<SourceLine<'_>> {

    let captures = LINE_REGEX.captures(line)?;

    Some(SourceLine {
        line_number,
        mnemonic: captures.name("mnemonic")?.as_str(),
        argument: captures.name("argument")
            .map(|argument| argument.as_str())
            .filter(|argument| !argument.is_empty()),
    })
}


/// Read the integer operand of `push` from the first word of `argument`.
pub fn parse_integer(argument: Option<&str>) -> Option<Value> {

    let word = argument?.split_whitespace().next()?;

    if !INTEGER_REGEX.is_match(word) {
        return None;
    }

    // Digits that overflow a cell are not an integer the VM can hold
    word.parse::<Value>().ok()
}
