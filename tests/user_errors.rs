use crate::util::*;
mod util;

#[test]
fn missing_input_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("does_not_exist.raw");
    cmd.assert().failure();

    match_on_out_no_case(&cmd.output()?.stderr, "does not exist", 1)?;
    Ok(())
}

#[test]
fn any_errors_exit_code_zero() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("-E").arg("0");
    cmd.assert().failure();

    match_on_out_no_case(&cmd.output()?.stderr, "exit code for any errors cannot be 0", 1)?;
    Ok(())
}

#[test]
fn channel_file_combined_with_input_files() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("ch0.raw").arg("-c").arg("channels.toml");
    cmd.assert().failure();

    match_on_out_no_case(&cmd.output()?.stderr, "cannot be combined with a channel file", 1)?;
    Ok(())
}

#[test]
fn bad_envelope_value() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("-t").arg("tbm11");
    cmd.assert().failure();

    match_on_out_no_case(&cmd.output()?.stderr, "invalid value", 1)?;
    Ok(())
}

#[test]
fn stats_output_without_format() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("-S").arg("stdout");
    cmd.assert().failure();

    match_on_out_no_case(&cmd.output()?.stderr, "required arguments were not provided", 1)?;
    Ok(())
}

#[test]
fn generate_zero_events() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("generate")
        .arg("--events")
        .arg("0")
        .arg("--output")
        .arg(dir.child("x.raw").path());
    cmd.assert().failure();

    match_on_out_no_case(&cmd.output()?.stderr, "cannot generate 0 events", 1)?;
    dir.child("x.raw").assert(predicate::path::missing());
    Ok(())
}

#[test]
fn invalid_channel_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let channels = dir.child("channels.toml");
    channels.write_str("[[channel]]\nfile = \"a.raw\"\nenvelope = \"tbm11\"\n")?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("-c").arg(channels.path());
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("FATAL ERROR"));

    match_on_out_no_case(&cmd.output()?.stderr, "invalid channel file", 1)?;
    Ok(())
}
