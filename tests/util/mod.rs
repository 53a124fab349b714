#![allow(dead_code)]
/// Re-export some common utilities for system tests
pub use assert_cmd::prelude::*; // Add methods on commands
pub use assert_fs::prelude::*;
pub use predicate::str::is_match;
pub use predicates::prelude::*; // Used for writing assertions
pub use std::process::Command; // Run programs

/// Name of the binary under test
pub const BIN: &str = "dtbpipe";

/// Helper function to match the raw output of stderr or stdout, with a pattern a fixed amount of times
pub fn match_on_output(
    byte_output: &[u8],
    re_str: &str,
    match_count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    // Build regex pattern
    let re = fancy_regex::Regex::new(re_str).unwrap();
    // Make the predicate function
    let pred_regex = predicate::function(|&x| re.find_iter(x).count() == match_count);
    // Convert the output to string as utf-8
    let str_res = std::str::from_utf8(byte_output).expect("invalid utf-8 sequence");
    // Evaluate the output with the predicate
    assert!(
        pred_regex.eval(&str_res),
        "regex: {re_str} - expected match count: {match_count}\n{str_res}"
    );
    Ok(())
}

/// Helper function to match the raw output of stderr or stdout, with a pattern a fixed amount of times, case insensitive
pub fn match_on_out_no_case(
    byte_output: &[u8],
    re_str: &str,
    match_count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    match_on_output(byte_output, &("(?i)".to_owned() + re_str), match_count)
}

/// Helper function takes in the output of stderr and asserts that there are no errors or warnings
pub fn assert_no_errors_or_warn(stderr_byte_output: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    match_on_out_no_case(stderr_byte_output, "error - ", 0)?;
    match_on_out_no_case(stderr_byte_output, "warn - ", 0)?;
    Ok(())
}

/// Generate an emulated raw data file in `dir` with the given layout arguments
pub fn generate_raw_file(
    dir: &assert_fs::TempDir,
    name: &str,
    layout_args: &[&str],
    events: usize,
) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let out = dir.child(name);
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.args(layout_args)
        .arg("generate")
        .arg("--events")
        .arg(events.to_string())
        .arg("--output")
        .arg(out.path());
    cmd.assert().success();
    out.assert(predicate::path::is_file());
    Ok(out.path().to_path_buf())
}
