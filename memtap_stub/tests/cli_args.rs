//! CLI arg handling for the stub binary.
use std::process::Command;

#[test]
fn port_flags_are_accepted() {
    // Verify the port flags are accepted by ensuring the process starts
    // (then kill it quickly). Unlikely ports to avoid conflicts.
    let exe = env!("CARGO_BIN_EXE_memtap_stub");

    let mut child = Command::new(exe)
        .args(["--port", "9557"])
        .spawn()
        .expect("spawn stub");
    // Give it a moment to bind
    std::thread::sleep(std::time::Duration::from_millis(150));
    let _ = child.kill();
    let _ = child.wait();

    let mut child2 = Command::new(exe)
        .args(["-p", "9558"])
        .spawn()
        .expect("spawn stub");
    std::thread::sleep(std::time::Duration::from_millis(150));
    let _ = child2.kill();
    let _ = child2.wait();
}

#[test]
fn a_busy_port_fails_startup() {
    // Holding the port ourselves forces the stub's bind to fail, which is
    // the one startup path that terminates on its own.
    let holder = std::net::TcpListener::bind(("0.0.0.0", 0)).expect("reserve port");
    let port = holder.local_addr().expect("addr").port();

    let output = assert_cmd::Command::cargo_bin("memtap_stub")
        .unwrap()
        .args(["--port", &port.to_string()])
        .timeout(std::time::Duration::from_secs(10))
        .output()
        .expect("run stub");
    assert!(!output.status.success());
    let text = String::from_utf8_lossy(&output.stderr);
    assert!(text.contains("Error"), "stderr: {text}");
}
