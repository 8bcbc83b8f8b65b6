use std::process::{Command, Stdio};

fn streaming_service() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_streaming_service"));
    cmd.env_remove("ZED_CAPTURE_CONFIG")
        .env_remove("ZED_CAPTURE_STREAM_BITRATE")
        .env_remove("ZED_CAPTURE_STREAM_PORT")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn rejects_positional_arguments() {
    let output = streaming_service()
        .arg("unexpected")
        .env("ZED_CAPTURE_DEVICE", "stub://front")
        .output()
        .expect("run streaming_service");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn invalid_streaming_settings_fail_at_startup() {
    let output = streaming_service()
        .env("ZED_CAPTURE_DEVICE", "stub://front")
        .env("ZED_CAPTURE_STREAM_BITRATE", "10")
        .output()
        .expect("run streaming_service");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid streaming settings"));
}

#[test]
fn invalid_device_selector_fails() {
    let output = streaming_service()
        .env("ZED_CAPTURE_DEVICE", "front-camera")
        .output()
        .expect("run streaming_service");
    assert_eq!(output.status.code(), Some(1));
}

#[cfg(not(feature = "zed-sdk"))]
#[test]
fn camera_open_failure_exits_before_streaming() {
    let output = streaming_service()
        .env("ZED_CAPTURE_DEVICE", "0")
        .output()
        .expect("run streaming_service");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open camera"));
    assert!(!stderr.contains("streaming on port"));
}

#[cfg(unix)]
#[test]
fn interrupt_stops_streaming_cleanly() {
    use std::io::{BufRead, BufReader};
    use std::time::{Duration, Instant};

    let mut child = streaming_service()
        .env("ZED_CAPTURE_DEVICE", "stub://front?fps=100")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn streaming_service");

    let stderr = child.stderr.take().expect("stderr pipe");
    let mut lines = BufReader::new(stderr).lines();
    let ready = lines
        .by_ref()
        .map_while(Result::ok)
        .any(|line| line.contains("press Ctrl-C"));
    assert!(ready, "service never reported it was streaming");

    // SAFETY: signalling our own child process.
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);

    let drain = std::thread::spawn(move || {
        lines
            .map_while(Result::ok)
            .collect::<Vec<_>>()
            .join("\n")
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll child") {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("streaming_service did not stop after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(status.code(), Some(0));

    let rest = drain.join().expect("drain stderr");
    assert!(rest.contains("streaming disabled"));
    assert!(rest.contains("closed"));
}
