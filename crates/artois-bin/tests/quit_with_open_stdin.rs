use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[test]
fn quit_command_exits_while_stdin_stays_open() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("page.html");
    let mut child = Command::new(env!("CARGO_BIN_EXE_artois"))
        .current_dir(dir.path())
        .args(["--server", "http://127.0.0.1:1/", "--out"])
        .arg(&out)
        .arg("Hello")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn artois");

    // Hold the pipe open for the whole wait: only `:quit` may end the process.
    let mut stdin = child.stdin.take().expect("piped stdin");
    stdin.write_all(b":quit\n").unwrap();
    stdin.flush().unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    drop(stdin);

    let status = status.expect("artois still running after :quit");
    assert!(status.success(), "exit status {status:?}");
    let html = std::fs::read_to_string(&out).unwrap();
    assert!(html.contains("Hello"));
}
