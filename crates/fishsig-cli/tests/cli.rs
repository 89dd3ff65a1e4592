use std::process::Command;

fn fishsig() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fishsig"))
}

#[test]
fn prints_one_csv_row_per_iteration() {
    let output = fishsig()
        .args(["3", "16", "2", "8", "3", "--repetitions", "8", "--seed", "1"])
        .output()
        .expect("failed to run fishsig");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf-8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("setup_us,"));
    for row in &lines[1..] {
        let size = row.rsplit(',').next().expect("row has columns");
        // ceil(8 / 4) + 8 * (72 + ceil((8 + 18 + 16) / 8))
        assert_eq!(size, "626");
    }
}

#[test]
fn verbose_report() {
    let output = fishsig()
        .args(["2", "8", "1", "4", "2", "--verbose", "--seed", "2"])
        .env("FISHSIG_REPETITIONS", "4")
        .output()
        .expect("failed to run fishsig");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf-8");
    assert!(stdout.contains("Iteration 0:"));
    assert!(stdout.contains("Iteration 1:"));
    assert!(stdout.contains("Average over 2 runs:"));
    assert!(stdout.contains("signature size"));
}

#[test]
fn rejects_too_many_sboxes() {
    let output = fishsig()
        .args(["11", "32", "2", "8", "1"])
        .output()
        .expect("failed to run fishsig");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
