use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("cmdgram-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn cmdgram() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cmdgram"));
    cmd.env_remove("CHAT_SERVER").env_remove("RUST_LOG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// `cmdgram init` into a fresh directory, returning the grammar path.
fn init_grammar(prefix: &str) -> (PathBuf, PathBuf) {
    let dir = make_temp_dir(prefix);
    let out = cmdgram()
        .arg("init")
        .arg(&dir)
        .output()
        .expect("failed to run cmdgram init");
    assert!(
        out.status.success(),
        "cmdgram init failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        stderr(&out),
    );
    let grammar = dir.join("grammar.json");
    (dir, grammar)
}

fn parse(grammar: &Path, extra: &[&str], args: &[&str]) -> Output {
    cmdgram()
        .arg("parse")
        .arg(grammar)
        .args(extra)
        .arg("--")
        .args(args)
        .output()
        .expect("failed to run cmdgram parse")
}

#[test]
fn help_works() {
    let out = cmdgram()
        .arg("--help")
        .output()
        .expect("failed to run cmdgram --help");
    assert!(
        out.status.success(),
        "cmdgram --help failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        stderr(&out),
    );
    let text = stdout(&out);
    assert!(
        text.contains("cmdgram") && text.contains("init") && text.contains("parse"),
        "unexpected help output:\n{text}"
    );
}

#[test]
fn init_writes_grammar_and_refuses_to_clobber() {
    let (dir, grammar) = init_grammar("init");
    assert!(grammar.is_file(), "grammar.json not created");

    let again = cmdgram().arg("init").arg(&dir).output().unwrap();
    assert!(!again.status.success(), "second init should fail");
    assert!(stderr(&again).contains("already exists"));

    let forced = cmdgram().arg("init").arg(&dir).arg("--force").output().unwrap();
    assert!(forced.status.success(), "{}", stderr(&forced));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn check_accepts_sample_and_rejects_duplicate_flag() {
    let (dir, grammar) = init_grammar("check");

    let out = cmdgram().arg("check").arg(&grammar).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("OK:"));

    let json = cmdgram()
        .arg("check")
        .arg(&grammar)
        .arg("--json")
        .output()
        .unwrap();
    let model: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(model["name"], "chat");
    assert_eq!(model["commands"][1]["fullCommand"], "post");

    let bad = dir.join("bad.json");
    fs::write(
        &bad,
        r#"{
  "name": "bad",
  "flags": [{ "name": "debug", "type": "bool" }],
  "commands": [{ "name": "run", "flags": [{ "name": "debug", "type": "bool" }] }]
}"#,
    )
    .unwrap();
    let out = cmdgram().arg("check").arg(&bad).output().unwrap();
    assert!(!out.status.success());
    assert!(
        stderr(&out).contains("duplicate long flag --debug"),
        "unexpected stderr:\n{}",
        stderr(&out)
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_prints_json_report() {
    let (dir, grammar) = init_grammar("parse-json");

    let out = parse(
        &grammar,
        &["--json"],
        &["post", "-d", "--image", "cat.png", "#general", "hello", "world"],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["command"], "post");
    assert_eq!(report["values"]["--debug"], true);
    assert_eq!(report["values"]["--server"], "127.0.0.1");
    assert_eq!(report["values"]["post --image"], "cat.png");
    assert_eq!(report["values"]["post <channel>"], "#general");
    assert_eq!(
        report["values"]["post <text>"],
        serde_json::json!(["hello", "world"])
    );
    assert!(report["values"].get("register <nick>").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_error_exits_with_status_one() {
    let (dir, grammar) = init_grammar("parse-error");

    let out = parse(&grammar, &[], &["nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("chat: error: no such command 'nope'"),
        "unexpected stderr:\n{}",
        stderr(&out)
    );

    let out = parse(&grammar, &[], &["register", "bob"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("required argument 'name' not provided"));

    let out = parse(&grammar, &[], &["post", "#general", "hi", "--image", "x.png", "more"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("chat: error: unexpected argument 'more'"),
        "unexpected stderr:\n{}",
        stderr(&out)
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_help_and_version_exit_cleanly() {
    let (dir, grammar) = init_grammar("parse-help");

    let out = parse(&grammar, &[], &["post", "--help"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("usage: chat post"), "unexpected usage:\n{text}");
    assert!(text.contains("--image=FILE"));

    let out = parse(&grammar, &[], &["--version"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "0.1.0");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn env_file_supplies_flag_default() {
    let (dir, grammar) = init_grammar("parse-env");
    let env_path = dir.join(".env");
    fs::write(&env_path, "CHAT_SERVER=10.0.0.7\n").unwrap();

    let env_arg = env_path.to_string_lossy().into_owned();
    let out = parse(&grammar, &["--json", "--env-file", &env_arg], &["register", "bob", "Bob"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["values"]["--server"], "10.0.0.7");
    assert_eq!(report["values"]["register <nick>"], "bob");

    let out = parse(
        &grammar,
        &["--json", "--env-file", &env_arg],
        &["--server", "192.168.0.1", "register", "bob", "Bob"],
    );
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["values"]["--server"], "192.168.0.1");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn usage_renders_command_path() {
    let (dir, grammar) = init_grammar("usage");

    let out = cmdgram()
        .arg("usage")
        .arg(&grammar)
        .arg("register")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).starts_with("usage: chat register <nick> <name>"));

    let out = cmdgram().arg("usage").arg(&grammar).output().unwrap();
    let text = stdout(&out);
    assert!(text.starts_with("usage: chat [<flags>] <command> [<args> ...]"));
    assert!(text.contains("Commands:"));

    let _ = fs::remove_dir_all(&dir);
}
