use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{NamedTempFile, TempDir};

fn registry() -> Command {
    let mut cmd = Command::cargo_bin("anidb-registry").unwrap();
    // Keep the developer's own configuration out of the tests
    cmd.env(
        "XDG_CONFIG_HOME",
        std::env::temp_dir().join("anidb-registry-cli-tests-unconfigured"),
    )
    .env_remove("ANIDB_REGISTRY_SESSION");
    cmd
}

#[test]
fn test_version() {
    registry()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_render_creator() {
    registry()
        .args(["render", "creator", "718"])
        .assert()
        .success()
        .stdout("CREATOR creatorid=718\n");
}

#[test]
fn test_render_file_with_masks() {
    registry()
        .args([
            "render",
            "file",
            "--size",
            "233647104",
            "--ed2k",
            "C646D82A184A33F4E4F98AF39F29A044",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ed2k=c646d82a184a33f4e4f98af39f29a044&fmask=7F00C0D1F0&amask=00000000",
        ));
}

#[test]
fn test_render_rejects_invalid_hash() {
    registry()
        .args(["render", "file", "--size", "1", "--ed2k", "nothex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid command"));
}

#[test]
fn test_parse_not_found_from_file() {
    let capture = NamedTempFile::new().unwrap();
    fs::write(capture.path(), "345 NO SUCH CREATOR\n").unwrap();

    registry()
        .args(["parse", "creator", "--input"])
        .arg(capture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"not_found\""));
}

#[test]
fn test_parse_calendar_from_stdin() {
    registry()
        .args(["parse", "calendar"])
        .write_stdin("297 CALENDAR\n6622|1251417600|0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"anime_id\": 6622"));
}

#[test]
fn test_parse_group_status_requires_aid() {
    registry()
        .args(["parse", "group-status"])
        .write_stdin("225 GROUP STATUS\n1612|MDAN|1|9|784|2|1-9\n")
        .assert()
        .failure();

    registry()
        .args(["parse", "GROUPSTATUS", "--aid", "4896"])
        .write_stdin("225 GROUP STATUS\n1612|MDAN|1|9|784|2|1-9\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"group_name\": \"MDAN\""));
}

#[test]
fn test_parse_malformed_reply_fails() {
    registry()
        .args(["parse", "file"])
        .write_stdin("220 FILE\n572794|6107\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unexpected reply"));
}

#[test]
fn test_config_path_honors_xdg() {
    let config_home = TempDir::new().unwrap();
    registry()
        .env("XDG_CONFIG_HOME", config_home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("anidb-registry"))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_layers_file_and_env() {
    let config_home = TempDir::new().unwrap();
    let dir = config_home.path().join("anidb-registry");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("config.toml"),
        "[server]\nhost = \"udp.example.net\"\n",
    )
    .unwrap();

    registry()
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("ANIDB_REGISTRY_SERVER__PORT", "9100")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host = \"udp.example.net\""))
        .stdout(predicate::str::contains("port = 9100"))
        .stdout(predicate::str::contains("command_cooldown_secs = 5400"));
}

#[test]
fn test_query_requires_session() {
    registry()
        .args(["query", "calendar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--session"));
}

#[test]
fn test_query_reports_ban() {
    let server = match std::net::UdpSocket::bind("127.0.0.1:0") {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Skipping test_query_reports_ban: {e}");
            return;
        }
    };
    let port = server.local_addr().unwrap().port();
    let responder = std::thread::spawn(move || {
        let mut buf = [0u8; 1400];
        let (n, peer) = server.recv_from(&mut buf).unwrap();
        server.send_to(b"555 BANNED\nLeech\n", peer).unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    });

    registry()
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["query", "--session", "abc12", "creator", "718"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("communication suspended until"));

    assert_eq!(
        responder.join().unwrap(),
        "CREATOR creatorid=718&s=abc12&tag=T1"
    );
}
