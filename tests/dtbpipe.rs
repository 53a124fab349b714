use crate::util::*;
mod util;

#[test]
fn decode_generated_tbm08b() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b"], 500)?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&file).arg("-t").arg("tbm08b");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("REPORT"))
        .stdout(predicate::str::contains("Valid events"))
        .stdout(predicate::str::contains("DECODING ERRORS").not());

    assert_no_errors_or_warn(&cmd.output()?.stderr)?;
    Ok(())
}

#[test]
fn decode_two_channels() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let layout = ["-t", "tbm09", "-r", "psi46digv21respin"];
    let ch0 = generate_raw_file(&dir, "ch0.raw", &layout, 200)?;
    let ch1 = generate_raw_file(&dir, "ch1.raw", &layout, 300)?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&ch0)
        .arg(&ch1)
        .args(layout)
        .arg("-S")
        .arg("stdout")
        .arg("-D")
        .arg("json");
    cmd.assert().success();

    let output = cmd.output()?;
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["events"], 500);
    assert_eq!(stats["channel"].as_array().unwrap().len(), 2);
    assert_eq!(stats["channel"][0]["events"], 200);
    assert_eq!(stats["channel"][1]["channel"], 1);
    let valid = stats["total"]["info_events_valid"].as_u64().unwrap();
    let empty = stats["total"]["info_events_empty"].as_u64().unwrap();
    assert_eq!(valid + empty, 500);
    Ok(())
}

#[test]
fn stats_written_to_toml_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "emu"], 100)?;
    let stats_file = dir.child("stats.toml");

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&file)
        .arg("-t")
        .arg("emu")
        .arg("-S")
        .arg(stats_file.path())
        .arg("-D")
        .arg("toml");
    cmd.assert().success();

    stats_file.assert(predicate::str::contains("events = 100"));
    stats_file.assert(predicate::str::contains("[[channel]]"));
    Ok(())
}

#[test]
fn view_raw_records() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b", "-n", "2"], 25)?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&file)
        .args(["-t", "tbm08b", "-n", "2"])
        .arg("view")
        .arg("raw");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("REPORT").not());

    match_on_output(&cmd.output()?.stdout, r"(?m)^  0: \[A0", 25)?;
    Ok(())
}

#[test]
fn view_decoded_events() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b"], 12)?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&file).args(["-t", "tbm08b"]).arg("view").arg("events");
    cmd.assert().success();

    match_on_output(&cmd.output()?.stdout, r"(?m)^  0: ====== [0-9A-F]{4} ======", 12)?;
    Ok(())
}

#[test]
fn decode_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b"], 40)?;

    let mut cmd = assert_cmd::Command::cargo_bin(BIN)?;
    let output = cmd
        .args(["-t", "tbm08b", "-S", "stdout", "-D", "json"])
        .pipe_stdin(&file)?
        .output()?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["events"], 40);
    Ok(())
}

#[test]
fn wrong_chain_length_reports_missing_rocs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b"], 10)?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&file).args(["-t", "tbm08b", "-n", "6", "-E", "7"]);
    cmd.assert()
        .code(7)
        .stdout(predicate::str::contains("DECODING ERRORS"))
        .stdout(predicate::str::contains("missing"));

    match_on_out_no_case(&cmd.output()?.stderr, "token chain length", 10)?;
    Ok(())
}

#[test]
fn max_tolerate_errors_stops_early() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b"], 5000)?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg(&file)
        .args(["-t", "tbm08b", "-n", "6", "-e", "1", "-v", "4"])
        .args(["-S", "stdout", "-D", "json"]);
    let output = cmd.output()?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert!(stats["total"]["errors_roc_missing"].as_u64().unwrap() >= 1);
    match_on_out_no_case(&output.stderr, "reached maximum tolerated errors", 1)?;
    Ok(())
}

#[test]
fn channel_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    generate_raw_file(&dir, "ch0.raw", &["-t", "tbm08b", "-n", "4"], 60)?;
    generate_raw_file(&dir, "ch5.raw", &["-t", "emu", "-r", "psi46digv2"], 80)?;
    let channels = dir.child("channels.toml");
    channels.write_str(
        r#"
[[channel]]
file = "ch0.raw"
channel = 0
envelope = "tbm08b"
chain_length = 4

[[channel]]
file = "ch5.raw"
channel = 5
envelope = "emu"
device = "psi46digv2"
"#,
    )?;

    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.arg("-c")
        .arg(channels.path())
        .args(["-S", "stdout", "-D", "json"]);
    let output = cmd.output()?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["events"], 140);
    assert_eq!(stats["channel"][1]["channel"], 5);
    assert_eq!(stats["total"]["errors_roc_missing"], 0);
    Ok(())
}
