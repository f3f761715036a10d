use super::*;
use crate::chunk::OpCode;

fn compile_ok(source: &str) -> Chunk {
    let mut vm = Vm::new();
    let mut chunk = Chunk::new();
    let (ok, diagnostics) = compile(source, &mut chunk, &mut vm);
    assert!(ok, "expected successful compile, got diagnostics: {diagnostics:?}");
    chunk
}

fn compile_err(source: &str) -> Vec<CompileError> {
    let mut vm = Vm::new();
    let mut chunk = Chunk::new();
    let (ok, diagnostics) = compile(source, &mut chunk, &mut vm);
    assert!(!ok, "expected a compile error for {source:?}");
    diagnostics
}

#[test]
fn print_arithmetic_expression_emits_expected_opcodes() {
    let chunk = compile_ok("print 1 + 2;");
    let ops: Vec<u8> = chunk.code().to_vec();
    assert_eq!(
        ops,
        vec![
            OpCode::Constant as u8,
            0,
            OpCode::Constant as u8,
            1,
            OpCode::Add as u8,
            OpCode::Print as u8,
            OpCode::Return as u8,
        ]
    );
    assert_eq!(chunk.constant(0), &Value::Number(1.0));
    assert_eq!(chunk.constant(1), &Value::Number(2.0));
}

#[test]
fn equal_strings_intern_to_the_same_constant_identity() {
    let mut vm = Vm::new();
    let mut chunk = Chunk::new();
    let (ok, _) = compile(r#"print "hi" == "hi";"#, &mut chunk, &mut vm);
    assert!(ok);
    let a = chunk.constant(0).as_obj_string();
    let b = chunk.constant(1).as_obj_string();
    assert!(std::rc::Rc::ptr_eq(a, b));
}

#[test]
fn assignment_to_non_variable_target_is_an_error() {
    let diagnostics = compile_err("a * b = c;");
    assert!(diagnostics.iter().any(|d| d.message == "Invalid assignment target"));
}

#[test]
fn assignment_to_plain_variable_emits_set_global() {
    let chunk = compile_ok("var a = 1; a = 2;");
    assert!(chunk.code().contains(&(OpCode::SetGlobal as u8)));
}

#[test]
fn var_declaration_without_initializer_emits_nil() {
    let chunk = compile_ok("var a;");
    assert_eq!(chunk.code()[0], OpCode::Nil as u8);
    assert_eq!(chunk.code()[1], OpCode::DefineGlobal as u8);
}

#[test]
fn missing_semicolon_reports_expected_semicolon_error() {
    let diagnostics = compile_err("print 1");
    assert!(diagnostics.iter().any(|d| d.message.contains("';'")));
}

#[test]
fn unterminated_expression_reports_error_at_end_with_no_space() {
    let diagnostics = compile_err("print");
    let rendered = diagnostics[0].to_string();
    assert!(rendered.contains("Errorat end"), "got {rendered:?}");
}

#[test]
fn error_at_identifier_reports_the_lexeme_with_a_leading_space() {
    let diagnostics = compile_err("var 1;");
    let rendered = diagnostics[0].to_string();
    assert!(rendered.contains("Error at"), "got {rendered:?}");
}

#[test]
fn scanner_error_token_surfaces_with_no_location_qualifier() {
    let diagnostics = compile_err("print 1 | 2;");
    let rendered = diagnostics[0].to_string();
    assert!(rendered.contains("Did you mean"), "got {rendered:?}");
    assert!(!rendered.contains(" at "));
    assert!(!rendered.contains("at end"));
}

#[test]
fn constant_pool_overflow_past_256_entries_is_reported_once() {
    let mut source = String::new();
    for i in 0..300 {
        source.push_str(&format!("print {i};\n"));
    }
    let diagnostics = compile_err(&source);
    assert!(diagnostics.iter().any(|d| d.message == "Too many constants in one chunk"));
}

#[test]
fn parse_error_does_not_abort_the_whole_compile() {
    // The first statement is malformed; the synchronizer should still let
    // the second, well-formed statement compile and contribute to `chunk`.
    let diagnostics = compile_err("1 + ; print 1;");
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn unary_and_grouping_compose() {
    let chunk = compile_ok("print -(1 + 2);");
    assert!(chunk.code().contains(&(OpCode::Negate as u8)));
}

#[test]
fn comparison_operators_lower_to_inverted_pairs() {
    let chunk = compile_ok("print 1 >= 2;");
    let ops = chunk.code();
    let position = ops.iter().position(|&b| b == OpCode::Less as u8).unwrap();
    assert_eq!(ops[position + 1], OpCode::Not as u8);
}

#[test]
fn literals_compile_to_their_dedicated_opcodes() {
    let chunk = compile_ok("print true; print false; print nil;");
    assert!(chunk.code().contains(&(OpCode::True as u8)));
    assert!(chunk.code().contains(&(OpCode::False as u8)));
    assert!(chunk.code().contains(&(OpCode::Nil as u8)));
}

#[test]
fn every_statement_leaves_the_stack_balanced_via_pop() {
    let chunk = compile_ok("1 + 2;");
    assert_eq!(*chunk.code().last().unwrap(), OpCode::Return as u8);
    assert_eq!(chunk.code()[chunk.code().len() - 2], OpCode::Pop as u8);
}

#[test]
fn factor_over_term_precedence_makes_explicit_grouping_redundant() {
    let implicit = compile_ok("1 + 2 * 3;");
    let explicit = compile_ok("1 + (2 * 3);");
    assert_eq!(implicit.code(), explicit.code());
}

#[test]
fn bare_equals_sign_in_prefix_position_is_expected_expression_not_a_panic() {
    let diagnostics = compile_err("= 1;");
    assert!(diagnostics.iter().any(|d| d.message == "Expected expression"));
}
