use std::error::Error;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::{Pid, getpgrp};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use watchrun::errors::WatchrunError;
use watchrun::exec::{CommandSpec, ExitKind, ManagedProcess, terminate_group};
use watchrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn process(cmd: &str) -> ManagedProcess {
    ManagedProcess::new(CommandSpec::parse(cmd).expect("non-empty command"))
}

/// Write an executable script that records its own pid and then keeps
/// running, so tests can observe which instance is alive.
fn pid_script(dir: &Path, pids: &Path) -> TestResult {
    let script = dir.join("record.sh");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho $$ >> {}\nexec sleep 30\n", pids.display()),
    )?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

fn recorded_pids(pids: &Path) -> Vec<i32> {
    std::fs::read_to_string(pids)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| l.trim().parse().ok())
        .collect()
}

async fn wait_for_pids(pids: &Path, count: usize) -> Vec<i32> {
    with_timeout(async {
        loop {
            let recorded = recorded_pids(pids);
            if recorded.len() >= count {
                return recorded;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}

fn alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

#[test]
fn command_spec_splits_on_whitespace() {
    let spec = CommandSpec::parse("cargo  build --release").expect("some");
    assert_eq!(spec.program(), "cargo");
    assert_eq!(spec.args(), ["build", "--release"]);
    assert_eq!(spec.to_string(), "cargo build --release");

    assert!(CommandSpec::parse("").is_none());
    assert!(CommandSpec::parse("   ").is_none());
}

#[tokio::test]
async fn reports_exit_code_of_finished_process() -> TestResult {
    init_tracing();
    let cancel = CancellationToken::new();

    assert_eq!(process("true").execute(&cancel).await?, ExitKind::Exited(0));
    assert_eq!(
        process("false").execute(&cancel).await?,
        ExitKind::Exited(1)
    );

    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_an_error() {
    init_tracing();
    let cancel = CancellationToken::new();

    let err = process("watchrun-no-such-binary")
        .execute(&cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchrunError::Spawn { .. }));
}

#[tokio::test]
async fn unexpected_signal_is_an_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("die.sh");
    std::fs::write(&script, "#!/bin/sh\nkill -USR1 $$\n")?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

    let cancel = CancellationToken::new();
    let err = process(&script.display().to_string())
        .execute(&cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchrunError::UnexpectedSignal(_)));

    Ok(())
}

#[test]
fn kill_without_live_process_is_a_noop() {
    let proc = process("sleep 5");
    proc.kill();
    proc.kill();
}

#[test]
fn never_signals_own_process_group() {
    init_tracing();
    assert!(!terminate_group(getpgrp()));
}

#[tokio::test]
async fn teardown_timeout_kills_a_non_exiting_process() -> TestResult {
    init_tracing();
    let cancel = CancellationToken::new();
    let proc = process("sleep 30").with_teardown(Duration::from_millis(200));

    let started = Instant::now();
    let kind = with_timeout(proc.execute(&cancel)).await?;

    assert_eq!(kind, ExitKind::Killed);
    assert!(started.elapsed() >= Duration::from_millis(200));

    Ok(())
}

#[tokio::test]
async fn cancellation_kills_a_running_process() -> TestResult {
    init_tracing();
    let cancel = CancellationToken::new();
    let proc = process("sleep 30");

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    assert_eq!(with_timeout(proc.execute(&cancel)).await?, ExitKind::Killed);
    Ok(())
}

#[tokio::test]
async fn new_execution_replaces_a_still_running_one() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pids = dir.path().join("pids.txt");
    pid_script(dir.path(), &pids)?;

    let script: PathBuf = dir.path().join("record.sh");
    let proc = Arc::new(process(&script.display().to_string()));
    let cancel = CancellationToken::new();

    let first = tokio::spawn({
        let proc = Arc::clone(&proc);
        let cancel = cancel.clone();
        async move { proc.execute(&cancel).await }
    });
    let recorded = wait_for_pids(&pids, 1).await;
    assert!(alive(recorded[0]));

    let second = tokio::spawn({
        let proc = Arc::clone(&proc);
        let cancel = cancel.clone();
        async move { proc.execute(&cancel).await }
    });

    // The second call kills the first instance and waits for it before
    // spawning, so once the second pid shows up the first must be gone.
    let recorded = wait_for_pids(&pids, 2).await;
    assert!(!alive(recorded[0]));
    assert!(alive(recorded[1]));

    assert_eq!(with_timeout(first).await??, ExitKind::Killed);

    cancel.cancel();
    assert_eq!(with_timeout(second).await??, ExitKind::Killed);

    Ok(())
}
