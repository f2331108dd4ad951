use blocks::loader::Loader;
use blocks::registry::{Store, WorkspaceRegistry};
use codegen::{CodegenOptions, GeneratedSource, generate, generate_program};
use interpreter::{InterpreterOptions, Problem, execute_program};

fn load(source: &str) -> Store {
    Store::from(
        Loader::new(source.to_string(), 0)
            .load()
            .expect("load failed"),
    )
}

fn single_workspace(blocks: &str) -> String {
    format!(
        r#"{{"workspaces": [{{"id": "w1", "name": "Main", "blocks": [{}]}}]}}"#,
        blocks
    )
}

fn java(blocks: &str) -> GeneratedSource {
    generate_program(&mut load(&single_workspace(blocks)), &CodegenOptions::default())
}

fn assert_balanced(source: &str) {
    let mut depth = 0i32;
    for c in source.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                assert!(depth >= 0, "unbalanced braces in:\n{}", source);
            }
            _ => {}
        }
    }
    assert_eq!(depth, 0, "unbalanced braces in:\n{}", source);
}

#[test]
fn main_prints_hi() {
    let generated = java(
        r#"{"id": "main", "type": "function", "name": "main", "body": [
            {"id": "p", "type": "print", "value": "hi"}]}"#,
    );
    assert_eq!(
        generated.source,
        "class Main {\n  public static void main(String[] args) {\n    System.out.println(\"hi\");\n  }\n}\n"
    );
    assert!(generated.diagnostics.is_empty());
}

#[test]
fn braces_balance_at_every_depth() {
    for depth in 0..=10 {
        let mut blocks = r#"{"id": "leaf", "type": "print", "value": "x"}"#.to_string();
        for level in 0..depth {
            blocks = if level % 2 == 0 {
                format!(
                    r#"{{"id": "r{}", "type": "repeat", "count": 2, "body": [{}]}}"#,
                    level, blocks
                )
            } else {
                format!(
                    r#"{{"id": "if{0}", "type": "ifThen",
                        "condition": {{"id": "c{0}", "type": "compareOperator", "operator": "<", "left": 1, "right": 2}},
                        "thenBlocks": [{1}], "elseBlocks": [{{"id": "e{0}", "type": "print", "value": "e"}}]}}"#,
                    level, blocks
                )
            };
        }
        let generated = java(&format!(
            r#"{{"id": "main", "type": "function", "name": "main", "body": [{}]}}"#,
            blocks
        ));
        assert_balanced(&generated.source);
        let leaf = generated
            .source
            .lines()
            .find(|line| line.contains("\"x\""))
            .expect("leaf printed");
        let indent = leaf.len() - leaf.trim_start().len();
        assert_eq!(indent, 2 * (depth + 2));
    }
}

#[test]
fn arithmetic_renders_parenthesised_and_agrees_with_interpreter() {
    let blocks = r#"{"id": "p", "type": "print", "value":
        {"id": "m", "type": "mathOperator", "operator": "+", "left": 3, "right": 4}}"#;
    let generated = java(blocks);
    assert!(generated.source.contains("System.out.println((3 + 4));"));

    let mut store = load(&single_workspace(blocks));
    let execution = execute_program(&mut store, &InterpreterOptions::default());
    assert_eq!(execution.output, ["7"]);
}

#[test]
fn division_by_zero_is_left_to_the_target() {
    let generated = java(
        r#"{"id": "p", "type": "print", "value":
            {"id": "m", "type": "mathOperator", "operator": "/", "left": 1, "right": 0}}"#,
    );
    assert!(generated.source.contains("(1 / 0)"));
    assert!(generated.diagnostics.is_empty());
}

#[test]
fn if_else_and_logic() {
    let generated = java(
        r#"{"id": "if", "type": "ifThen",
            "condition": {"id": "or", "type": "compareLogic", "operator": "||",
                "left": {"id": "c1", "type": "compareOperator", "operator": ">", "left": 5, "right": 3},
                "right": {"id": "c2", "type": "compareOperator", "operator": "!=", "left": 1, "right": 1}},
            "thenBlocks": [{"id": "y", "type": "print", "value": "yes"}],
            "elseBlocks": [{"id": "n", "type": "print", "value": "no"}]}"#,
    );
    let expected = [
        "  if ((5 > 3) || (1 != 1)) {",
        "    System.out.println(\"yes\");",
        "  } else {",
        "    System.out.println(\"no\");",
        "  }",
    ]
    .join("\n");
    assert!(generated.source.contains(&expected), "{}", generated.source);
}

#[test]
fn missing_condition_renders_false() {
    let generated = java(
        r#"{"id": "if", "type": "ifThen", "thenBlocks": [{"id": "y", "type": "print", "value": "yes"}]}"#,
    );
    assert!(generated.source.contains("if (false) {"));
    assert_eq!(generated.diagnostics[0].problem, Problem::MissingCondition);
}

#[test]
fn logic_with_empty_side_renders_true() {
    let generated = java(
        r#"{"id": "if", "type": "ifThen",
            "condition": {"id": "and", "type": "compareLogic", "operator": "&&",
                "left": {"id": "c1", "type": "compareOperator", "operator": ">", "left": 5, "right": 3}},
            "thenBlocks": [{"id": "y", "type": "print", "value": "yes"}]}"#,
    );
    assert!(generated.source.contains("  if ((5 > 3) && true) {"), "{}", generated.source);
    assert_eq!(generated.diagnostics.len(), 1);
    assert_eq!(generated.diagnostics[0].problem, Problem::MissingOperand("right"));
}

#[test]
fn bare_return_in_valued_function_returns_zero() {
    let generated = java(
        r#"{"id": "f", "type": "function", "name": "pick", "returns": 7, "body": [
            {"id": "if", "type": "ifThen",
                "condition": {"id": "c", "type": "compareOperator", "operator": ">", "left": 1, "right": 2},
                "thenBlocks": [{"id": "r", "type": "return"}]}
        ]}"#,
    );
    let expected = [
        "  public static int pick() {",
        "    if (1 > 2) {",
        "      return 0;",
        "    }",
        "    return 7;",
        "  }",
    ]
    .join("\n");
    assert!(generated.source.contains(&expected), "{}", generated.source);
    assert_balanced(&generated.source);
}

#[test]
fn nested_loops_use_distinct_counters() {
    let generated = java(
        r#"{"id": "outer", "type": "repeat", "count": 2, "body": [
            {"id": "inner", "type": "repeat", "count": 3, "body": [
                {"id": "p", "type": "print", "value": "x"}]}]}"#,
    );
    assert!(generated.source.contains("for (int __i0 = 0; __i0 < 2; __i0++) {"));
    assert!(generated.source.contains("for (int __i1 = 0; __i1 < 3; __i1++) {"));
}

#[test]
fn options_change_layout() {
    let options = CodegenOptions {
        indent_width: 4,
        loop_variable: "n".to_string(),
    };
    let mut store = load(&single_workspace(
        r#"{"id": "r", "type": "repeat", "count": 1, "body": []}"#,
    ));
    let generated = generate_program(&mut store, &options);
    assert!(generated.source.contains("\n    for (int n0 = 0; n0 < 1; n0++) {\n    }"));
}

#[test]
fn variables_declare_and_assign() {
    let generated = generate_program(
        &mut load(
            r#"{
            "workspaces": [{"id": "w1", "name": "Main", "blocks": [
                {"id": "cv", "type": "createVariable", "name": "counter", "value": 0},
                {"id": "vc", "type": "variableChange", "variableId": "c", "value":
                    {"id": "m", "type": "mathOperator", "operator": "+",
                        "left": {"id": "read", "type": "variable", "variableId": "c"}, "right": 1}},
                {"id": "ghost", "type": "variableChange", "variableId": "nope", "value": 1}
            ]}],
            "variables": [{"id": "c", "name": "counter"}]
        }"#,
        ),
        &CodegenOptions::default(),
    );
    assert!(generated.source.contains("  int counter = 0;\n  counter = (counter + 1);\n}"));
    assert_eq!(generated.diagnostics.len(), 1);
    assert!(matches!(
        generated.diagnostics[0].problem,
        Problem::UndefinedVariable(_)
    ));
}

#[test]
fn functions_and_returns() {
    let generated = java(
        r#"{"id": "add", "type": "function", "name": "add", "parameters": ["a", "b"], "body": [
               {"id": "ret", "type": "return", "value":
                   {"id": "sum", "type": "mathOperator", "operator": "+",
                       "left": {"id": "pa", "type": "parameter", "name": "a"},
                       "right": {"id": "pb", "type": "parameter", "name": "b"}}}]},
           {"id": "seven", "type": "function", "name": "seven", "returns": 7},
           {"id": "hello", "type": "function", "name": "hello", "body": [
               {"id": "p", "type": "print", "value": "hello"}]}"#,
    );
    let source = &generated.source;
    assert!(source.contains("  public static int add(int a, int b) {\n    return (a + b);\n  }"));
    assert!(source.contains("  public static int seven() {\n    return 7;\n  }"));
    assert!(source.contains("  public static void hello() {"));
    assert!(generated.diagnostics.is_empty());
}

#[test]
fn calls_pad_arguments_and_emit_registry_functions() {
    let source = r#"{
        "workspaces": [{"id": "w1", "name": "Main", "blocks": [
            {"id": "main", "type": "function", "name": "main", "body": [
                {"id": "p", "type": "print", "value":
                    {"id": "call", "type": "functionCall", "functionId": "f-add", "arguments": [2]}},
                {"id": "stmt", "type": "functionCall", "functionId": "f-add", "arguments": [1, 2, 3]}
            ]}
        ]}],
        "functions": [{"id": "f-add", "name": "add", "parameters": ["a", "b"], "returns":
            {"id": "sum", "type": "mathOperator", "operator": "+",
                "left": {"id": "pa", "type": "parameter", "name": "a"},
                "right": {"id": "pb", "type": "parameter", "name": "b"}}}]
    }"#;
    let generated = generate_program(&mut load(source), &CodegenOptions::default());
    assert!(generated.source.contains("System.out.println(add(2, 0));"));
    assert!(generated.source.contains("    add(1, 2);"));
    assert_eq!(
        generated.source.matches("public static int add(int a, int b) {").count(),
        1
    );
    assert_balanced(&generated.source);
    assert_eq!(generated.diagnostics.len(), 2);
}

#[test]
fn undefined_call_renders_nothing() {
    let generated = java(
        r#"{"id": "stmt", "type": "functionCall", "functionId": "ghost"},
           {"id": "p", "type": "print", "value": {"id": "call", "type": "functionCall", "functionId": "ghost"}}"#,
    );
    assert!(generated.source.contains("  System.out.println();"));
    assert!(!generated.source.contains("ghost"));
    assert_eq!(generated.diagnostics.len(), 2);
}

#[test]
fn classes_and_methods() {
    let source = r#"{
        "workspaces": [
            {"id": "dog", "name": "Dog", "blocks": [
                {"id": "bark", "type": "function", "name": "bark", "body": [
                    {"id": "woof", "type": "print", "value": "woof"}]}]},
            {"id": "main", "name": "Main", "blocks": [
                {"id": "entry", "type": "function", "name": "main", "body": [
                    {"id": "new", "type": "classInstantiation", "className": "Dog", "instanceName": "rex"},
                    {"id": "call", "type": "invokeMethod", "instance": "rex", "method": "bark"}]}]}
        ]
    }"#;
    let mut store = load(source);
    let generated = generate_program(&mut store, &CodegenOptions::default());
    assert!(generated.source.starts_with("class Dog {\n"));
    assert!(generated.source.contains("}\n\nclass Main {\n"));
    assert!(generated.source.contains("    Dog rex = new Dog();\n    rex.bark();\n"));
    assert!(generated.source.ends_with("}\n"));
    assert_balanced(&generated.source);

    // The last generated class stays selected.
    assert_eq!(store.workspaces.active().map(|w| w.name.as_str()), Some("Main"));
}

#[test]
fn misplaced_and_unknown_blocks_are_skipped() {
    let generated = java(
        r#"{"id": "m", "type": "mathOperator", "operator": "*", "left": 2, "right": 2},
           {"id": "u", "type": "hologram"},
           {"id": "ret", "type": "return", "value": 1},
           {"id": "p", "type": "print", "value": "kept"}"#,
    );
    assert_eq!(
        generated.source,
        "class Main {\n  System.out.println(\"kept\");\n}\n"
    );
    let problems: Vec<_> = generated.diagnostics.iter().map(|d| &d.problem).collect();
    assert!(matches!(problems[0], Problem::MisplacedBlock(_)));
    assert_eq!(problems[1], &Problem::UnknownBlockKind);
    assert!(matches!(problems[2], Problem::MisplacedBlock(_)));
}

#[test]
fn generate_over_separate_registries() {
    let mut store = load(&single_workspace(
        r#"{"id": "p", "type": "print", "value": "text with \"quotes\""}"#,
    ));
    let Store {
        workspaces,
        variables,
        functions,
        ..
    } = &mut store;
    let generated = generate(workspaces, variables, functions, &CodegenOptions::default());
    assert!(
        generated
            .source
            .contains(r#"System.out.println("text with \"quotes\"");"#)
    );
}
