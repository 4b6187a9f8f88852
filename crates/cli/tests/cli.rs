#[test]
fn prints_help() {
    assert_cmd::Command::cargo_bin("shelf-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}
