use crate::{
    config::ExecConfig,
    language::{compile, scope::Scope},
    render_ir, run_source,
    runtime::{builtins::Builtin, bytecode::lower, error::RuntimeError, value::Value, Machine},
    Error,
};
use std::rc::Rc;

fn run(src: &str) -> (Result<Value, Error>, String) {
    run_with(src, &ExecConfig::default())
}

fn run_with(src: &str, config: &ExecConfig) -> (Result<Value, Error>, String) {
    let mut out = Vec::new();
    let result = run_source(src, config, &mut out);
    (result, String::from_utf8(out).expect("program output is utf8"))
}

fn output(src: &str) -> String {
    let (result, out) = run(src);
    if let Err(err) = result {
        panic!("program failed: {err}\n{src}");
    }
    out
}

const FIB: &str = "(n,) [ n < 2 [ n ] [ n - 1 fib, n - 2 fib, add ] ] fib.";

const SOLVE: &str = "(n,) [ n*(n+1)/2, 2, pow SquareOfSum. \
n*(n+1)*((2*n)+1)/6 SumOfSquares. \
SquareOfSum - SumOfSquares, int. ] solve.";

#[test]
fn user_defined_add_pipes_into_assignment() {
    let out = output("(a,b) [ a + b ] add. 1,2,add result. result print.");
    assert_eq!(out, "3\n");
}

#[test]
fn recursive_fib() {
    assert_eq!(output(&format!("{FIB} 7 fib, print.")), "13\n");
    assert_eq!(output(&format!("{FIB} 20 fib, print.")), "6765\n");
}

#[test]
fn deep_recursion_does_not_touch_the_host_stack() {
    let src = "(n,) [ n < 1 [ 0 ] [ n - 1 count, 1, add ] ] count. 50_000 count, print.";
    assert_eq!(output(src), "50000\n");
}

#[test]
fn recursion_limit_is_a_runtime_error() {
    let config = ExecConfig {
        max_depth: Some(10),
        ..ExecConfig::default()
    };
    let (result, _) = run_with(&format!("{FIB} 30 fib, print."), &config);
    assert_eq!(
        result,
        Err(Error::Runtime(RuntimeError::RecursionLimit {
            name: "fib".into(),
            limit: 10,
        }))
    );
}

#[test]
fn conditional_is_the_function_result() {
    let pick = "(x,) [ x [ 1 ] [ 2 ] ] pick.";
    assert_eq!(output(&format!("{pick} 1 pick, print. 0 pick, print.")), "1\n2\n");

    let sparse = "(x,) [ x [ ] [ 7 ] ] sparse.";
    assert_eq!(
        output(&format!("{sparse} 1 sparse, print. 0 sparse, print.")),
        "()\n7\n"
    );

    let fallback = "(x,) [ x [ 7 ] [ ] ] fallback.";
    assert_eq!(
        output(&format!("{fallback} 0 fallback, print. 1 fallback, print.")),
        "()\n7\n"
    );
}

#[test]
fn quoted_names_are_values() {
    let src = "(a,b) [ a + b ] plus. plus' print.";
    assert_eq!(output(src), "<function plus>\n");

    let src = "(a,b) [ a + b ] plus. plus' f. 1, 2, f, print.";
    assert_eq!(output(src), "3\n");
}

#[test]
fn bare_callable_consumes_pending_arguments() {
    assert_eq!(output("4, 5, max, print."), "5\n");
    assert_eq!(output("\"a\", \"b\", print."), "a b\n");
}

#[test]
fn pending_arguments_do_not_leak_across_statements() {
    assert_eq!(output("1, 2. print."), "\n");
}

#[test]
fn solve_round_trip() {
    assert_eq!(output(&format!("{SOLVE} 100 solve, print.")), "25164150\n");
}

#[test]
fn grouped_digits() {
    assert_eq!(output("1_000 print."), "1000\n");
    assert_eq!(output("1_000.5 print."), "1000.5\n");
    assert_eq!(output("2e3 print."), "2000\n");
}

#[test]
fn closures_see_their_defining_body() {
    let src = "(x,) [ (y,) [ x + y ] inner. 5 inner ] outer. 10 outer, print.";
    assert_eq!(output(src), "15\n");
}

#[test]
fn call_environments_do_not_outlive_the_run() {
    let src = "(x,) [ (y,) [ x + y ] inner. inner' ] outer. 10 outer. 0.";
    let mut scope = Scope::with_callables(Builtin::names());
    let program = compile(src, &mut scope).expect("compile");
    let mut out = Vec::new();
    let mut machine = Machine::new(&ExecConfig::default(), &mut out);
    assert_eq!(machine.run(Rc::new(lower(&program))), Ok(Value::Int(0)));
    assert_eq!(machine.live_envs(), 1);
}

#[test]
fn ir_listing_shows_both_forms() {
    let listing = render_ir(FIB).expect("render");
    assert!(listing.starts_with("def fib(n):\n"));
    assert!(listing.contains("== <main> =="));
    assert!(listing.contains("== fib =="));
    assert!(matches!(render_ir("(a,) [ a + ] f."), Err(Error::Syntax(_))));
}

#[test]
fn unmatched_clauses_are_dropped() {
    let (result, out) = run("1 2 3. 4 print.");
    assert_eq!(result, Ok(Value::Unit));
    assert_eq!(out, "4\n");
}

#[test]
fn unbound_names_abort_the_run() {
    let (result, out) = run("1 print. nope print. 2 print.");
    assert_eq!(
        result,
        Err(Error::Runtime(RuntimeError::UnboundName {
            name: "nope".into()
        }))
    );
    assert_eq!(out, "1\n");
}

#[test]
fn type_mismatch_is_reported_at_runtime() {
    let (result, _) = run("\"a\" - 1, print.");
    assert!(matches!(
        result,
        Err(Error::Runtime(RuntimeError::TypeMismatch { .. }))
    ));
}

#[test]
fn syntax_errors_stop_before_execution() {
    let (result, out) = run("1 print. (a,) [ a + ] f.");
    let err = match result {
        Err(Error::Syntax(err)) => err,
        other => panic!("expected a syntax error, got {other:?}"),
    };
    assert!(err.message.contains("right operand"));
    assert!(out.is_empty());
}

#[test]
fn lists_flow_into_builtins() {
    assert_eq!(output("(4, 1, 3) sum, print."), "8\n");
    assert_eq!(output("(4, 1, 3) xs. xs min, print. xs len, print."), "1\n3\n");
    assert_eq!(output("(1, 2) + (3,) print."), "[1, 2, 3]\n");
}
