//! End-to-end: a dispatch loop driving the real command runner.
//!
//! Two rapid triggering events, both surviving rate limiting, must produce
//! exactly two sequential primary executions, and the secondary instance
//! left running at the end must be the one launched by the second trigger.

use std::error::Error;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use watchrun::engine::{
    ChangeEvent, ChangeOp, DispatchLoop, DispatchOptions, RateLimiter,
};
use watchrun::exec::{CommandRunner, CommandSpec, ManagedProcess};
use watchrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn write_script(path: &Path, body: &str) -> TestResult {
    std::fs::write(path, body)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

fn lines_of(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

async fn wait_for_lines(path: &Path, count: usize) -> Vec<String> {
    with_timeout(async {
        loop {
            let lines = lines_of(path);
            if lines.len() >= count {
                return lines;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}

#[tokio::test]
async fn two_triggers_rerun_the_primary_and_replace_the_secondary() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let primary_log = dir.path().join("primary.log");
    let primary_script = dir.path().join("primary.sh");
    write_script(
        &primary_script,
        &format!("#!/bin/sh\necho run >> {}\n", primary_log.display()),
    )?;

    let secondary_pids = dir.path().join("pids.txt");
    let secondary_script = dir.path().join("secondary.sh");
    write_script(
        &secondary_script,
        &format!(
            "#!/bin/sh\necho $$ >> {}\nexec sleep 30\n",
            secondary_pids.display()
        ),
    )?;

    let runner = CommandRunner::new(
        Some(ManagedProcess::new(
            CommandSpec::parse(&primary_script.display().to_string()).expect("primary"),
        )),
        Some(ManagedProcess::new(
            CommandSpec::parse(&secondary_script.display().to_string()).expect("secondary"),
        )),
    );

    let (tx, rx) = mpsc::channel::<ChangeEvent>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(
        DispatchLoop::new(
            rx,
            RateLimiter::new(1, Duration::from_millis(100)),
            runner,
            DispatchOptions::default(),
            cancel.clone(),
        )
        .run(),
    );

    let change = |path: &Path| ChangeEvent {
        op: ChangeOp::Write,
        path: PathBuf::from(path),
    };

    tx.send(change(&primary_script)).await?;
    wait_for_lines(&primary_log, 1).await;
    wait_for_lines(&secondary_pids, 1).await;

    // Past the rate-limit window, so the second event is admitted too.
    sleep(Duration::from_millis(150)).await;
    tx.send(change(&primary_script)).await?;

    assert_eq!(wait_for_lines(&primary_log, 2).await.len(), 2);
    let pids: Vec<i32> = wait_for_lines(&secondary_pids, 2)
        .await
        .iter()
        .filter_map(|l| l.trim().parse().ok())
        .collect();

    // First secondary instance was killed and replaced by the second one.
    assert!(kill(Pid::from_raw(pids[0]), None).is_err());
    assert!(kill(Pid::from_raw(pids[1]), None).is_ok());

    cancel.cancel();
    drop(tx);
    with_timeout(handle).await??;

    Ok(())
}
