use std::io::{BufRead, Write};

use montylib::{Fault, LineNumber, Opcode, Value, MAX_CHAR_VALUE};
use tracing::{debug, info, trace};

use crate::data_area::{DataArea, Mode};
use crate::tokenizer::{self, SourceLine};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}


pub struct VM {

    /// The cells the program operates on.
    area: DataArea,
    /// End of the data area `push` and `pop` use.
    mode: Mode,
    state: State,
    /// Number of the last line read from the program.
    line_number: LineNumber,

}

impl VM {

    /// Instantiate a VM with an empty data area in stack mode.
    pub fn new() -> Self {
        Self {
            area: DataArea::new(),
            mode: Mode::Stack,
            state: State::Running,
            line_number: 0,
        }
    }


    #[cfg(test)]
    pub fn mode(&self) -> Mode {
        self.mode
    }


    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }


    #[cfg(test)]
    pub fn data_area(&self) -> &DataArea {
        &self.area
    }


    /// Execute the program read from `source`, writing its output to `out`.
    /// The data area is released before returning, whether the program ended or faulted.
    pub fn run<R: BufRead, W: Write>(&mut self, source: R, out: &mut W) -> Result<(), Fault> {

        info!("program started");

        let result = self.run_lines(source, out);

        let released = self.area.release_all();
        trace!(released, "data area released");
        self.state = State::Halted;

        match &result {
            Ok(()) => info!(lines = self.line_number, "program finished"),
            Err(fault) => info!(lines = self.line_number, %fault, "program faulted"),
        }

        result
    }


    fn run_lines<R: BufRead, W: Write>(&mut self, source: R, out: &mut W) -> Result<(), Fault> {

        // Lines are decoded lossily so a stray byte only affects the line it sits on
        for line in source.split(b'\n') {

            if self.state == State::Halted {
                break;
            }

            let line = line?;
            self.step(&String::from_utf8_lossy(&line), out)?;
        }

        Ok(())
    }


    /// Dispatch a single line of the program.
    pub fn step<W: Write>(&mut self, line: &str, out: &mut W) -> Result<(), Fault> {

        if self.state == State::Halted {
            return Ok(());
        }

        self.line_number += 1;

        let Some(source_line) = tokenizer::lex_line(line, self.line_number) else {
            return Ok(());
        };

        let opcode = Opcode::from_string(source_line.mnemonic)
            .ok_or_else(|| Fault::UnknownInstruction {
                line: source_line.line_number,
                mnemonic: source_line.mnemonic.to_string()
            })?;

        debug!(line = source_line.line_number, %opcode, argument = source_line.argument.unwrap_or_default(), "dispatch");

        self.execute(opcode, &source_line, out)
    }


    fn execute<W: Write>(&mut self, opcode: Opcode, source_line: &SourceLine, out: &mut W) -> Result<(), Fault> {

        let line = source_line.line_number;

        if self.area.len() < opcode.min_depth() {
            return Err(Fault::TooShort { line, opcode });
        }

        // This match statement will be implemented through an efficient jump table by the compiler.
        match opcode {

            Opcode::Push => {
                let value = tokenizer::parse_integer(source_line.argument)
                    .ok_or(Fault::NotAnInteger { line })?;
                self.area.insert(self.mode, value)?;
            },
            Opcode::Pop => {
                self.area.remove_matching_end(self.mode)
                    .ok_or(Fault::EmptyForPop { line })?;
            },

            Opcode::Pall => {
                for value in self.area.iter() {
                    writeln!(out, "{value}")?;
                }
            },
            Opcode::Pint => {
                let value = self.area.peek_front()
                    .ok_or(Fault::EmptyStack { line })?;
                writeln!(out, "{value}")?;
            },
            Opcode::Pchar => {
                let value = self.area.peek_front()
                    .ok_or(Fault::EmptyForPchar { line })?;
                let byte = as_byte(value)
                    .ok_or(Fault::OutOfRange { line })?;
                out.write_all(&[byte, b'\n'])?;
            },
            Opcode::Pstr => {
                let bytes: Vec<u8> = self.area.iter()
                    .map_while(as_byte)
                    .collect();
                out.write_all(&bytes)?;
                out.write_all(b"\n")?;
            },

            Opcode::Swap => self.area.swap_front(),
            Opcode::Add => self.combine(opcode, line, Value::wrapping_add)?,
            Opcode::Sub => self.combine(opcode, line, Value::wrapping_sub)?,
            Opcode::Mul => self.combine(opcode, line, Value::wrapping_mul)?,
            Opcode::Div => {
                self.check_divisor(line)?;
                self.combine(opcode, line, Value::wrapping_div)?;
            },
            Opcode::Mod => {
                self.check_divisor(line)?;
                self.combine(opcode, line, Value::wrapping_rem)?;
            },

            Opcode::Rotl => self.area.rotate_left(),
            Opcode::Rotr => self.area.rotate_right(),

            Opcode::Stack => self.set_mode(Mode::Stack),
            Opcode::Queue => self.set_mode(Mode::Queue),

            Opcode::Nop => { /* Do nothing */ },

            Opcode::Stop => {
                debug!(line, "stop");
                self.state = State::Halted;
            },

        }

        Ok(())
    }


    /// Replace the two front cells with `operation(front, second)`.
    fn combine(&mut self, opcode: Opcode, line: LineNumber, operation: fn(Value, Value) -> Value) -> Result<(), Fault> {

        let (Some(first), Some(second)) = (self.area.get(0), self.area.get(1)) else {
            return Err(Fault::TooShort { line, opcode });
        };

        self.area.remove_front();
        self.area.remove_front();
        self.area.insert_front(operation(first, second))
    }


    /// The second cell is the divisor of `div` and `mod`.
    fn check_divisor(&self, line: LineNumber) -> Result<(), Fault> {
        match self.area.get(1) {
            Some(0) => Err(Fault::DivisionByZero { line }),
            _ => Ok(())
        }
    }


    fn set_mode(&mut self, mode: Mode) {
        debug!(?mode, "mode switched");
        self.mode = mode;
    }

}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}


#[inline]
fn as_byte(value: Value) -> Option<u8> {
    if (0..=MAX_CHAR_VALUE).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Run `program` on a fresh VM and return the result, the captured output and the VM.
    fn run(program: &str) -> (Result<(), Fault>, String, VM) {
        let mut vm = VM::new();
        let mut out = Vec::new();
        let result = vm.run(program.as_bytes(), &mut out);
        (result, String::from_utf8(out).unwrap(), vm)
    }

    fn output_of(program: &str) -> String {
        let (result, output, _) = run(program);
        assert_eq!(result, Ok(()));
        output
    }

    fn fault_of(program: &str) -> Fault {
        let (result, _, vm) = run(program);
        assert!(vm.data_area().is_empty(), "data area not released");
        result.unwrap_err()
    }

    /// Execute `program` line by line without releasing the data area.
    fn contents_after(program: &str) -> Vec<Value> {
        let mut vm = VM::new();
        let mut out = Vec::new();
        for line in program.lines() {
            vm.step(line, &mut out).unwrap();
        }
        vm.data_area().iter().collect()
    }

    #[test]
    fn pall_prints_lifo_in_stack_mode() {
        assert_eq!(output_of("push 1\npush 2\npall\n"), "2\n1\n");
    }

    #[test]
    fn pall_prints_fifo_in_queue_mode() {
        assert_eq!(output_of("queue\npush 1\npush 2\npush 3\npall\n"), "1\n2\n3\n");
    }

    #[test]
    fn queue_mode_pop_removes_the_newest_value() {
        assert_eq!(output_of("queue\npush 1\npush 2\npush 3\npop\npall\n"), "1\n2\n");
    }

    #[test]
    fn mode_switch_affects_only_later_pushes() {
        assert_eq!(output_of("push 1\npush 2\nqueue\npush 3\nstack\npush 4\npall\n"), "4\n2\n1\n3\n");
    }

    #[test]
    fn push_then_pop_is_a_no_op_in_both_modes() {
        assert_eq!(contents_after("push 1\npush 2\npush 3\npop"), [2, 1]);
        assert_eq!(contents_after("queue\npush 1\npush 2\npush 9\npop"), [1, 2]);
    }

    #[test]
    fn swap_exchanges_the_front_pair() {
        assert_eq!(output_of("push 1\npush 2\nswap\npall\n"), "1\n2\n");
    }

    #[test]
    fn pint_leaves_the_value_in_place() {
        assert_eq!(output_of("push 5\npint\npint\npall\n"), "5\n5\n5\n");
    }

    #[test]
    fn pchar_prints_a_byte() {
        assert_eq!(output_of("push 98\npchar\n"), "b\n");
    }

    #[test]
    fn arithmetic_uses_the_front_as_first_operand() {
        assert_eq!(contents_after("push 3\npush 10\nadd"), [13]);
        assert_eq!(contents_after("push 3\npush 10\nsub"), [7]);
        assert_eq!(contents_after("push 3\npush 10\nmul"), [30]);
        assert_eq!(contents_after("push 3\npush 10\ndiv"), [3]);
        assert_eq!(contents_after("push 3\npush 10\nmod"), [1]);
        assert_eq!(contents_after("push 4\npush 3\npush 10\nsub"), [7, 4]);
    }

    #[test]
    fn arithmetic_wraps_instead_of_overflowing() {
        assert_eq!(contents_after("push 1\npush 9223372036854775807\nadd"), [Value::MIN]);
        assert_eq!(contents_after("push -1\npush -9223372036854775808\ndiv"), [Value::MIN]);
    }

    #[test]
    fn rotations_move_whole_area() {
        assert_eq!(output_of("push 1\npush 2\npush 3\nrotl\npall\n"), "2\n1\n3\n");
        assert_eq!(output_of("push 1\npush 2\npush 3\nrotr\npall\n"), "1\n3\n2\n");
        assert_eq!(output_of("push 1\npush 2\npush 3\nrotl\nrotr\npall\n"), "3\n2\n1\n");
        assert_eq!(output_of("rotl\nrotr\npush 1\nrotl\nrotr\npall\n"), "1\n");
    }

    #[test]
    fn pstr_stops_at_the_first_non_byte() {
        assert_eq!(output_of("push 1000\npush 105\npush 72\npstr\n"), "Hi\n");
        assert_eq!(output_of("push 10\npush 107\npush 79\npstr\n"), "Ok\n\n");
        assert_eq!(output_of("pstr\n"), "\n");
        assert_eq!(output_of("push -1\npush 65\npstr\n"), "A\n");
    }

    #[test]
    fn blank_lines_still_count() {
        assert_eq!(fault_of("push 1\n\n   \npop\npop\n"), Fault::EmptyForPop { line: 5 });
    }

    #[test]
    fn stop_halts_before_later_lines() {
        let (result, output, vm) = run("push 1\npint\nstop\npint\nbogus\n");
        assert_eq!(result, Ok(()));
        assert_eq!(output, "1\n");
        assert_eq!(vm.state(), State::Halted);
    }

    #[test]
    fn invalid_utf8_in_an_argument_is_harmless() {
        let mut vm = VM::new();
        let mut out = Vec::new();
        let result = vm.run(&b"push 1\npush 2 \xff\npall\n"[..], &mut out);
        assert_eq!(result, Ok(()));
        assert_eq!(out, b"2\n1\n");
    }

    #[test]
    fn invalid_utf8_mnemonic_is_an_unknown_instruction() {
        let mut vm = VM::new();
        let mut out = Vec::new();
        let result = vm.run(&b"push 1\npall\npu\xffsh 2\n"[..], &mut out);
        assert_eq!(result, Err(Fault::UnknownInstruction { line: 3, mnemonic: "pu\u{FFFD}sh".into() }));
        assert_eq!(out, b"1\n");
        assert!(vm.data_area().is_empty());
    }

    #[test]
    fn nop_does_nothing() {
        assert_eq!(contents_after("push 1\nnop\nnop"), [1]);
    }

    #[test]
    fn unknown_instructions_fault_with_their_text() {
        assert_eq!(fault_of("push 1\njump 4\n"), Fault::UnknownInstruction { line: 2, mnemonic: "jump".into() });
        assert_eq!(fault_of("PUSH 1\n"), Fault::UnknownInstruction { line: 1, mnemonic: "PUSH".into() });
    }

    #[test]
    fn push_requires_an_integer() {
        assert_eq!(fault_of("push hello\n"), Fault::NotAnInteger { line: 1 });
        assert_eq!(fault_of("push 1\npush\n"), Fault::NotAnInteger { line: 2 });
        assert_eq!(fault_of("push 2.5\n"), Fault::NotAnInteger { line: 1 });
    }

    #[test]
    fn empty_area_faults() {
        assert_eq!(fault_of("pop\n"), Fault::EmptyForPop { line: 1 });
        assert_eq!(fault_of("pint\n"), Fault::EmptyStack { line: 1 });
        assert_eq!(fault_of("pchar\n"), Fault::EmptyForPchar { line: 1 });
        assert_eq!(fault_of("queue\npop\n"), Fault::EmptyForPop { line: 2 });
    }

    #[test]
    fn pchar_rejects_values_outside_a_byte() {
        assert_eq!(fault_of("push 256\npchar\n"), Fault::OutOfRange { line: 2 });
        assert_eq!(fault_of("push -1\npchar\n"), Fault::OutOfRange { line: 2 });
    }

    #[test]
    fn binary_opcodes_need_two_cells() {
        for opcode in ["swap", "add", "sub", "div", "mul", "mod"] {
            let program = format!("push 1\n{opcode}\n");
            assert_eq!(fault_of(&program), Fault::TooShort { line: 2, opcode: Opcode::from_string(opcode).unwrap() });
            assert_eq!(fault_of(opcode), Fault::TooShort { line: 1, opcode: Opcode::from_string(opcode).unwrap() });
        }
    }

    #[test]
    fn short_area_is_not_mutated() {
        let mut vm = VM::new();
        let mut out = Vec::new();
        vm.step("push 7", &mut out).unwrap();
        assert_eq!(vm.step("add", &mut out), Err(Fault::TooShort { line: 2, opcode: Opcode::Add }));
        assert_eq!(vm.data_area().iter().collect::<Vec<_>>(), [7]);
    }

    #[test]
    fn zero_divisor_faults_before_mutation() {
        for opcode in ["div", "mod"] {
            let mut vm = VM::new();
            let mut out = Vec::new();
            vm.step("push 0", &mut out).unwrap();
            vm.step("push 5", &mut out).unwrap();
            assert_eq!(vm.step(opcode, &mut out), Err(Fault::DivisionByZero { line: 3 }));
            assert_eq!(vm.data_area().iter().collect::<Vec<_>>(), [5, 0]);
        }
    }

    #[test]
    fn faults_release_every_cell() {
        let (result, output, vm) = run("push 1\npush 2\npush 3\npall\nfoo\n");
        assert_eq!(result, Err(Fault::UnknownInstruction { line: 5, mnemonic: "foo".into() }));
        assert_eq!(output, "3\n2\n1\n");
        assert!(vm.data_area().is_empty());
        assert_eq!(vm.state(), State::Halted);
    }

    #[test]
    fn normal_end_releases_every_cell() {
        let (result, _, vm) = run("push 1\npush 2\n");
        assert_eq!(result, Ok(()));
        assert!(vm.data_area().is_empty());
        assert_eq!(vm.mode(), Mode::Stack);
    }

    #[test]
    fn halted_vm_ignores_further_lines() {
        let mut vm = VM::new();
        let mut out = Vec::new();
        vm.step("stop", &mut out).unwrap();
        vm.step("push 1", &mut out).unwrap();
        assert!(vm.data_area().is_empty());
        assert_eq!(vm.step("pop", &mut out), Ok(()));
    }

}
