use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_unused-context");
const CONTEXT: &str = r#"{"name":"x","number":12,"site":"s"}"#;

struct CliTest {
    _dir: TempDir,
    template: PathBuf,
}

impl CliTest {
    fn with_template(source: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.html");
        fs::write(&template, source).unwrap();
        Self { _dir: dir, template }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(BIN)
            .arg("--template")
            .arg(&self.template)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stderr_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stderr).lines().map(String::from).collect()
}

#[test]
fn runtime_warning_reaches_stderr_by_default() {
    let t = CliTest::with_template("<p>nothing</p>");
    let out = t.run(&["--context", CONTEXT, "--debug", "--path", "/no_context"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "<p>nothing</p>\n");

    let lines = stderr_lines(&out);
    let user_warnings: Vec<_> = lines.iter().filter(|l| l.starts_with("UserWarning: ")).collect();
    assert_eq!(
        user_warnings,
        vec!["UserWarning: Request Context <Request: GET '/no_context'> had unused keys: {name, number}"]
    );
    // the log line is emitted on its own, next to the runtime warning
    assert_eq!(
        lines.iter().filter(|l| l.contains("WARN") && l.contains("had unused keys")).count(),
        1
    );
}

#[test]
fn quiet_when_tracking_is_off() {
    let t = CliTest::with_template("<p>nothing</p>");
    let out = t.run(&["--context", CONTEXT, "--path", "/no_context"]);
    assert!(out.status.success());
    assert!(stderr_lines(&out).is_empty(), "unexpected stderr: {:?}", stderr_lines(&out));
}

#[test]
fn non_object_context_is_rejected_before_rendering() {
    let t = CliTest::with_template("{{ name }}");
    for extra in [&[][..], &["--debug"][..]] {
        let mut args = vec!["--context", r#"["x"]"#];
        args.extend_from_slice(extra);
        let out = t.run(&args);
        assert!(!out.status.success());
        assert!(out.stdout.is_empty());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("config error: --context must be a JSON object"), "{stderr}");
        assert!(!stderr.contains("flatten error"), "{stderr}");
    }
}
