// End-to-end tests for the minipy interpreter
//
// Each case runs a complete program with scripted standard input and checks
// either the exact output or the kind of fatal error that ended the run.

use minipy::error::{ErrorKind, ScriptError};
use minipy::interpreter::Interpreter;
use std::io::Cursor;

/// Expected outcome of a single program run
#[derive(Debug, Clone)]
pub enum Expected {
    Output(String),
    Error {
        kind: ErrorKind,
        output_before: String,
    },
}

/// Test result for a single test case
#[derive(Debug)]
pub enum TestResult {
    Pass,
    Fail(String),
    Crash(String),
}

/// Individual test case
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub source: String,
    pub input: String,
    pub expected: Expected,
}

impl TestCase {
    pub fn prints(name: &str, source: &str, output: &str) -> Self {
        Self::prints_with_input(name, source, "", output)
    }

    pub fn prints_with_input(name: &str, source: &str, input: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            input: input.to_string(),
            expected: Expected::Output(output.to_string()),
        }
    }

    pub fn fails(name: &str, source: &str, kind: ErrorKind, output_before: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            input: String::new(),
            expected: Expected::Error {
                kind,
                output_before: output_before.to_string(),
            },
        }
    }
}

/// Test suite containing multiple test cases
#[derive(Debug)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Run all tests in this suite
    pub fn run(&self) -> TestSuiteResults {
        let mut results = TestSuiteResults::new(&self.name);

        println!("Running test suite: {}", self.name);
        println!("{}", "=".repeat(50));

        for test in &self.tests {
            let result = run_single_test(test);
            results.add_result(&test.name, result);
        }

        results.print_summary();
        results
    }
}

/// Results for a test suite run
#[derive(Debug)]
pub struct TestSuiteResults {
    pub suite_name: String,
    pub failures: Vec<String>,
    pub passed: usize,
}

impl TestSuiteResults {
    pub fn new(suite_name: &str) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            failures: Vec::new(),
            passed: 0,
        }
    }

    pub fn add_result(&mut self, test_name: &str, result: TestResult) {
        match result {
            TestResult::Pass => {
                self.passed += 1;
                println!("  ✓ {}", test_name);
            }
            TestResult::Fail(msg) => {
                println!("  ✗ {}: {}", test_name, msg);
                self.failures.push(format!("{}: {}", test_name, msg));
            }
            TestResult::Crash(msg) => {
                println!("  💥 {}: CRASHED - {}", test_name, msg);
                self.failures.push(format!("{}: crashed: {}", test_name, msg));
            }
        }
    }

    pub fn print_summary(&self) {
        println!();
        println!("Test Suite: {} - Summary", self.suite_name);
        println!("{}", "-".repeat(30));
        println!("Passed:  {}", self.passed);
        println!("Failed:  {}", self.failures.len());
        println!();
    }
}

/// Runs `source` and returns everything it printed, plus the fatal error if any
fn run_program(source: &str, input: &str) -> (String, Option<ScriptError>) {
    let mut interpreter = Interpreter::new(Cursor::new(input.as_bytes().to_vec()), Vec::<u8>::new());
    let error = interpreter.run_source(source).err();
    let output = String::from_utf8_lossy(&interpreter.into_output()).into_owned();
    (output, error)
}

/// Run a single test case
fn run_single_test(test: &TestCase) -> TestResult {
    // Catch any panics to detect crashes
    let result = std::panic::catch_unwind(|| run_program(&test.source, &test.input));

    let (output, error) = match result {
        Ok(outcome) => outcome,
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic".to_string()
            };
            return TestResult::Crash(panic_msg);
        }
    };

    match (&test.expected, error) {
        (Expected::Output(expected), None) if *expected == output => TestResult::Pass,
        (Expected::Output(expected), None) => TestResult::Fail(format!(
            "expected output {:?}, got {:?}",
            expected, output
        )),
        (Expected::Output(_), Some(error)) => {
            TestResult::Fail(format!("expected success, got {:?}: {}", error.kind, error))
        }
        (Expected::Error { kind, .. }, None) => TestResult::Fail(format!(
            "expected {:?}, but the run succeeded with output {:?}",
            kind, output
        )),
        (Expected::Error { kind, output_before }, Some(error)) => {
            if error.kind != *kind {
                TestResult::Fail(format!("expected {:?}, got {:?}: {}", kind, error.kind, error))
            } else if *output_before != output {
                TestResult::Fail(format!(
                    "expected output {:?} before the error, got {:?}",
                    output_before, output
                ))
            } else {
                TestResult::Pass
            }
        }
    }
}

// ============================================================================
// Test Suite Creation Functions
// ============================================================================

fn create_program_tests() -> TestSuite {
    let mut suite = TestSuite::new("Whole Programs");

    suite.add_test(TestCase::prints(
        "factorial",
        "n = 5\nfactorial = 1\nfor i in range(1, n + 1):\n    factorial = factorial * i\nprint(factorial)",
        "120\n",
    ));

    suite.add_test(TestCase::prints(
        "gcd",
        "a = 15\nb = 18\nwhile b != 0:\n    t = b\n    b = a % b\n    a = t\nprint(a)",
        "3\n",
    ));

    suite.add_test(TestCase::prints_with_input(
        "prompt_and_input",
        "n = input(\"Enter:\")\nprint(n)",
        "7\n",
        "Enter:7\n",
    ));

    suite.add_test(TestCase::prints(
        "running_sums",
        "\
n = 10
sum = 0
a = 17%5
sum1 = 0

for i in range(1, n + 1):
    sum1 = sum1 + a * i
    sum = sum + i
    sum = sum + sum1
    print(sum)

print(\"Total sum\")
print(sum)
print(sum1)
",
        "3\n11\n26\n50\n85\n133\n196\n276\n375\n495\nTotal sum\n495\n110\n",
    ));

    suite.add_test(TestCase::prints(
        "fizzbuzz",
        "\
for i in range(1, 16):
    if i % 15 == 0:
        print(\"FizzBuzz\")
    elif i % 3 == 0:
        print(\"Fizz\")
    elif i % 5 == 0:
        print(\"Buzz\")
    else:
        print(i)
",
        "1\n2\nFizz\n4\nBuzz\nFizz\n7\n8\nFizz\nBuzz\n11\nFizz\n13\n14\nFizzBuzz\n",
    ));

    suite.add_test(TestCase::prints(
        "primes_with_flag",
        "\
# primes below 20
for n in range(2, 20):
    prime = true
    d = 2
    while d * d <= n and prime:
        if n % d == 0:
            prime = false
        d += 1
    if prime:
        print(n)
",
        "2\n3\n5\n7\n11\n13\n17\n19\n",
    ));

    suite.add_test(TestCase::prints_with_input(
        "sum_of_inputs",
        "\
count = int(input(\"How many? \"))
total = 0
for k in range(count):
    value = input()
    total += value
print(\"total:\", total)
",
        "3\n4\n-2\n10\n",
        "How many? total: 12\n",
    ));

    suite
}

fn create_semantics_tests() -> TestSuite {
    let mut suite = TestSuite::new("Language Semantics");

    suite.add_test(TestCase::prints("precedence", "print(2 + 3 * 4)", "14\n"));
    suite.add_test(TestCase::prints("modulus", "print(17 % 5)", "2\n"));
    suite.add_test(TestCase::prints("left_assoc_subtraction", "print(10 - 4 - 3)", "3\n"));
    suite.add_test(TestCase::prints("unary_minus", "x = 4\nprint(-x * 2)", "-8\n"));
    suite.add_test(TestCase::prints("truncating_division", "print(-7 / 2)\nprint(-7 % 2)", "-3\n-1\n"));
    suite.add_test(TestCase::prints("unset_variable_is_zero", "print(ghost + 1)", "1\n"));
    suite.add_test(TestCase::prints(
        "loop_variable_survives_loop",
        "for i in range(0, 4):\n    last = i * 10\nprint(i)\nprint(last)",
        "3\n30\n",
    ));
    suite.add_test(TestCase::prints(
        "while_false_runs_zero_times",
        "x = 0\nwhile false:\n    x = 1\nprint(x)",
        "0\n",
    ));
    suite.add_test(TestCase::prints(
        "if_false_without_else",
        "if 0:\n    print(1)\nprint(\"done\")",
        "done\n",
    ));
    suite.add_test(TestCase::prints(
        "boolean_print",
        "ready = true\nprint(ready)\nprint(ready + 1)",
        "true\n2\n",
    ));
    suite.add_test(TestCase::prints(
        "boolean_literal_prints_as_integer",
        "print(true)\nprint(False + 0)",
        "1\n0\n",
    ));
    suite.add_test(TestCase::prints(
        "comparison_priority",
        "a = 3\nif a <= 3:\n    print(\"le\")\nif a >= 4:\n    print(\"ge\")",
        "le\n",
    ));
    suite.add_test(TestCase::prints(
        "comments_and_blank_lines",
        "\n# start\nx = 1  # one\n\n    # indented comment\nprint(x)\n\n",
        "1\n",
    ));
    suite.add_test(TestCase::prints(
        "unrecognized_line_continues",
        "import math\nprint(5)",
        "5\n",
    ));
    suite.add_test(TestCase::prints_with_input(
        "non_integer_input_defaults_to_zero",
        "n = input()\nprint(n)",
        "seven\n",
        "0\n",
    ));

    suite
}

fn create_error_tests() -> TestSuite {
    let mut suite = TestSuite::new("Fatal Errors");

    suite.add_test(TestCase::fails(
        "division_by_zero",
        "print(1)\nx = 4 / (2 - 2)\nprint(2)",
        ErrorKind::DivisionByZero,
        "1\n",
    ));
    suite.add_test(TestCase::fails(
        "modulus_by_zero_in_loop",
        "for i in range(0, 3):\n    print(10 % (1 - i))",
        ErrorKind::DivisionByZero,
        "0\n",
    ));
    suite.add_test(TestCase::fails(
        "malformed_indentation",
        "print(1)\nif true:\n   print(2)",
        ErrorKind::MalformedIndentation,
        "",
    ));
    suite.add_test(TestCase::fails(
        "invalid_literal",
        "print(1)\nx = 2.5",
        ErrorKind::InvalidLiteral,
        "1\n",
    ));
    suite.add_test(TestCase::fails(
        "error_after_if_block_runs_branch_first",
        "if true:\n    print(1)\nx = 2.5",
        ErrorKind::InvalidLiteral,
        "1\n",
    ));
    suite.add_test(TestCase::fails(
        "error_inside_taken_branch",
        "if true:\n    x = 1 / 0\ny = 2.5",
        ErrorKind::DivisionByZero,
        "",
    ));
    suite.add_test(TestCase::fails(
        "missing_block",
        "for i in range(3):\nprint(i)",
        ErrorKind::Syntax,
        "",
    ));
    suite.add_test(TestCase::fails(
        "input_exhausted",
        "x = input(\"x? \")",
        ErrorKind::InputExhausted,
        "x? ",
    ));
    suite.add_test(TestCase::fails(
        "zero_step",
        "for i in range(0, 3, 0):\n    pass",
        ErrorKind::InvalidRange,
        "",
    ));

    suite
}

// ============================================================================
// Main Test Functions
// ============================================================================

#[test]
fn comprehensive_program_tests() {
    println!("🧪 minipy Interpreter Test Suite");
    println!("================================\n");

    let suites = vec![
        create_program_tests(),
        create_semantics_tests(),
        create_error_tests(),
    ];

    let mut failures = Vec::new();
    for suite in suites {
        failures.extend(suite.run().failures);
    }

    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
}

#[test]
fn range_iteration_count_matches_bounds() {
    for start in -3..4 {
        for end in -3..4 {
            let source = format!(
                "count = 0\nfor i in range({}, {}):\n    count += 1\nprint(count)",
                start, end
            );
            let (output, error) = run_program(&source, "");
            assert!(error.is_none());
            let expected = (end - start).max(0);
            assert_eq!(output, format!("{}\n", expected), "range({}, {})", start, end);
        }
    }
}

#[test]
fn environment_is_reset_between_runs() {
    let mut interpreter = Interpreter::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new());
    interpreter.run_source("x = 5").unwrap();
    assert!(interpreter.environment().contains("x"));

    interpreter.reset();
    interpreter.run_source("print(x)").unwrap();
    assert_eq!(String::from_utf8(interpreter.into_output()).unwrap(), "0\n");
}
