use assert_cmd::cargo_bin_cmd;

/// Run tepes with default settings, checking that it succeeds
#[allow(dead_code)]
pub fn assert_tepes_runs(args: &[&str]) {
    cargo_bin_cmd!("tepes")
        .env("TEPES_USE_DEFAULT_SETTINGS", "1")
        .args(args)
        .assert()
        .success();
}

/// Run tepes with default settings, checking that it fails
#[allow(dead_code)]
pub fn assert_tepes_fails(args: &[&str]) {
    cargo_bin_cmd!("tepes")
        .env("TEPES_USE_DEFAULT_SETTINGS", "1")
        .args(args)
        .assert()
        .failure();
}

/// Run tepes with default settings and return its standard output
#[allow(dead_code)]
pub fn get_tepes_stdout(args: &[&str]) -> String {
    let output = cargo_bin_cmd!("tepes")
        .env("TEPES_USE_DEFAULT_SETTINGS", "1")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());

    String::from_utf8(output.stdout).unwrap()
}
