//! Binary-level tests: exit codes, output files, determinism.

use assert_cmd::Command;
use std::fs;

fn mphgen() -> Command {
    Command::cargo_bin("mphgen").expect("binary should build")
}

#[test]
fn rejects_small_expansion_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hash.c");

    mphgen()
        .arg("-c")
        .arg("1.0")
        .arg("-o")
        .arg(&out)
        .write_stdin("a\nb\nc\n")
        .assert()
        .failure()
        .code(1);

    assert!(!out.exists(), "no output file may be left behind");
}

#[test]
fn generates_source_and_map() {
    let dir = tempfile::tempdir().unwrap();
    let keys = dir.path().join("keys.txt");
    let out = dir.path().join("hash.c");
    let map = dir.path().join("hash.map");
    fs::write(&keys, "alpha\nbeta\ngamma\ndelta\n").unwrap();

    mphgen()
        .arg("-n")
        .arg("lookup")
        .arg("-s")
        .arg("-o")
        .arg(&out)
        .arg("-m")
        .arg(&map)
        .arg(&keys)
        .assert()
        .success();

    let src = fs::read_to_string(&out).unwrap();
    assert!(src.contains("static uint32_t\nlookup(const void"));
    assert!(src.contains("popcount32"));

    let ranks: Vec<u32> = fs::read_to_string(&map)
        .unwrap()
        .lines()
        .map(|l| l.parse().unwrap())
        .collect();
    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3]);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let keys = dir.path().join("keys.txt");
    fs::write(&keys, "one\ntwo\nthree\nfour\nfive\nsix\n").unwrap();

    let first = mphgen().arg(&keys).assert().success();
    let second = mphgen().arg(&keys).assert().success();
    assert_eq!(
        first.get_output().stdout,
        second.get_output().stdout
    );
}

#[test]
fn empty_input_fails() {
    mphgen().write_stdin("").assert().failure().code(1);
}
