//! Human-readable [`Chunk`] disassembly. Debug/inspection tooling only —
//! never consulted by the compiler itself.

use std::fmt::Write as _;

use crate::chunk::{Chunk, OpCode};

/// Renders every instruction in `chunk` as one line, prefixed with its byte
/// offset and either the source line or `|` when it repeats the line above.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    let mut previous_line: Option<u32> = None;
    while offset < chunk.code().len() {
        offset = disassemble_instruction(chunk, offset, &mut previous_line, &mut out);
    }
    out
}

fn disassemble_instruction(chunk: &Chunk, offset: usize, previous_line: &mut Option<u32>, out: &mut String) -> usize {
    let _ = write!(out, "{offset:04} ");

    let line = chunk.line_at(offset);
    if *previous_line == Some(line) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{line:4} ");
    }
    *previous_line = Some(line);

    let byte = chunk.code()[offset];
    match OpCode::from_byte(byte) {
        None => {
            let _ = writeln!(out, "Unknown opcode {byte}");
            offset + 1
        }
        Some(op) if op.has_operand() => {
            let operand = chunk.code()[offset + 1];
            if matches!(op, OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal) {
                let _ = writeln!(out, "{:<16} {:4} '{}'", format!("{op:?}"), operand, describe(chunk.constant(operand)));
            } else {
                let _ = writeln!(out, "{:<16} {:4}", format!("{op:?}"), operand);
            }
            offset + 2
        }
        Some(op) => {
            let _ = writeln!(out, "{op:?}");
            offset + 1
        }
    }
}

fn describe(value: &crate::value::Value) -> String {
    match value {
        crate::value::Value::Nil => "nil".to_string(),
        crate::value::Value::Bool(b) => b.to_string(),
        crate::value::Value::Number(n) => n.to_string(),
        crate::value::Value::Obj(s) => s.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::vm::Vm;

    #[test]
    fn disassembly_lists_one_line_per_instruction_with_offsets() {
        let mut vm = Vm::new();
        let mut chunk = Chunk::new();
        let (ok, _) = compile("print 1 + 2;", &mut chunk, &mut vm);
        assert!(ok);
        let text = disassemble(&chunk, "test chunk");
        assert!(text.starts_with("== test chunk ==\n"));
        assert!(text.contains("Constant"));
        assert!(text.contains("Add"));
        assert!(text.contains("Print"));
        assert!(text.contains("Return"));
    }

    #[test]
    fn constant_operands_show_their_resolved_value() {
        let mut vm = Vm::new();
        let mut chunk = Chunk::new();
        let (ok, _) = compile(r#"print "hi";"#, &mut chunk, &mut vm);
        assert!(ok);
        let text = disassemble(&chunk, "strings");
        assert!(text.contains("'hi'"));
    }
}
