//! Job control against real processes.
//!
//! Every test forks children and the reaper collects with `waitpid(-1)`, so
//! tests run one at a time behind a process-wide lock: otherwise one test
//! would reap another test's children.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use jobsh_kernel::{Kernel, KernelConfig, ProcessState, ReapMode};
use jobsh_types::{JobId, JobStatus};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::getpgid;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Captures what the kernel writes for notices and `fg` headers.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn kernel_with(config: KernelConfig) -> (Kernel, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let kernel = Kernel::with_output(config, Box::new(buffer.clone())).expect("Failed to create kernel");
    (kernel, buffer)
}

fn test_kernel() -> (Kernel, SharedBuffer) {
    kernel_with(KernelConfig::embedded())
}

/// Reap repeatedly until `done` holds or the timeout passes.
fn wait_until(kernel: &mut Kernel, timeout: Duration, done: impl Fn(&Kernel) -> bool) -> bool {
    let start = Instant::now();
    loop {
        kernel.report();
        if done(kernel) {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Kill every job still in the table and reap it.
fn kill_all(kernel: &mut Kernel) {
    let groups: Vec<_> = kernel.jobs().iter().map(|job| job.pgid()).collect();
    for pgid in groups {
        let _ = killpg(pgid, Signal::SIGKILL);
    }
    assert!(
        wait_until(kernel, Duration::from_secs(5), |k| k.jobs().is_empty()),
        "jobs survived SIGKILL"
    );
}

// ============================================================================
// Background Pipelines
// ============================================================================

#[test]
fn background_pipeline_is_listed_then_finished() {
    let _serial = serial();
    let (mut kernel, notices) = test_kernel();

    let result = kernel.execute("sleep 0.3 | cat &");
    assert!(result.ok(), "launch failed: {:?}", result);
    assert_eq!(result.out, "Running: sleep 0.3 | cat\n");

    let listing = kernel.execute("jobs");
    assert_eq!(listing.out, "[1] sleep 0.3 | cat (running)\n");

    assert!(
        wait_until(&mut kernel, Duration::from_secs(5), |k| k.jobs().is_empty()),
        "background job never finished"
    );
    assert_eq!(notices.contents(), "Finished: sleep 0.3 | cat\n");
    assert_eq!(kernel.execute("jobs").out, "");
}

#[test]
fn stages_share_one_process_group() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();

    kernel.execute("sleep 5 | sleep 5 | sleep 5 &");
    let job = kernel.jobs().get(JobId(1)).expect("job registered");

    assert_eq!(job.processes().len(), 3);
    assert_eq!(job.pgid(), job.processes()[0].pid);
    for process in job.processes() {
        assert_eq!(getpgid(Some(process.pid)).expect("getpgid"), job.pgid());
    }

    kill_all(&mut kernel);
}

#[test]
fn job_ids_are_never_reused() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();

    kernel.execute("true");
    assert!(kernel.jobs().is_empty());

    kernel.execute("sleep 5 &");
    kernel.execute("sleep 5 &");
    let ids: Vec<_> = kernel.jobs().list().into_iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![JobId(2), JobId(3)]);

    kill_all(&mut kernel);

    kernel.execute("sleep 5 &");
    assert_eq!(kernel.jobs().list()[0].id, JobId(4));
    kill_all(&mut kernel);
}

#[test]
fn async_mode_waits_for_notification() {
    let _serial = serial();
    let (mut kernel, notices) = kernel_with(KernelConfig::embedded().with_reap_mode(ReapMode::Signal));

    kernel.execute("true &");
    std::thread::sleep(Duration::from_millis(300));

    // No SIGCHLD handler in embedded mode, so nothing has flagged a change.
    kernel.report();
    assert_eq!(kernel.jobs().len(), 1);
    assert_eq!(notices.contents(), "");

    kernel.reaper().notify();
    kernel.report();
    assert!(kernel.jobs().is_empty());
    assert_eq!(notices.contents(), "Finished: true\n");
}

// ============================================================================
// Foreground Pipelines
// ============================================================================

#[test]
fn foreground_pipeline_completes_and_is_removed() {
    let _serial = serial();
    let (mut kernel, notices) = test_kernel();

    let result = kernel.execute("false | true");
    assert!(result.ok(), "launch failed: {:?}", result);
    assert!(kernel.jobs().is_empty());

    kernel.report();
    // Foreground jobs never get a Finished notice.
    assert_eq!(notices.contents(), "");
}

#[test]
fn exec_failure_only_fails_the_child() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();

    let result = kernel.execute("definitely-not-a-command-jobsh-12345");
    assert!(result.ok(), "launch itself should succeed: {:?}", result);
    assert!(kernel.jobs().is_empty());
}

#[test]
fn redirections_reach_files() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out.txt");
    let copy = dir.path().join("copy.txt");

    kernel.execute(&format!("echo first > {}", out.display()));
    kernel.execute(&format!("echo second >> {}", out.display()));
    assert_eq!(std::fs::read_to_string(&out).expect("read"), "first\nsecond\n");

    kernel.execute(&format!("echo replaced > {}", out.display()));
    assert_eq!(std::fs::read_to_string(&out).expect("read"), "replaced\n");

    kernel.execute(&format!("cat < {} | tr a-z A-Z > {}", out.display(), copy.display()));
    assert_eq!(std::fs::read_to_string(&copy).expect("read"), "REPLACED\n");
    assert!(kernel.jobs().is_empty());
}

#[test]
fn missing_input_file_fails_the_stage() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.txt");
    let out = dir.path().join("out.txt");

    kernel.execute(&format!("cat < {} > {}", missing.display(), out.display()));
    assert!(kernel.jobs().is_empty());
    // The stage died before opening its output.
    assert!(!out.exists());
}

// ============================================================================
// Stopped Jobs, fg and bg
// ============================================================================

#[test]
fn stopped_foreground_job_stays_in_table() {
    let _serial = serial();
    let (mut kernel, notices) = test_kernel();

    let result = kernel.execute("sh -c 'kill -STOP $$'");
    assert_eq!(result.out, "Stopped: sh -c kill -STOP $$\n");

    let job = kernel.jobs().get(JobId(1)).expect("stopped job kept");
    assert!(job.is_stopped());
    assert!(!job.is_completed());
    assert_eq!(kernel.execute("jobs").out, "[1] sh -c kill -STOP $$ (stopped)\n");

    // Reaping does not remove a stopped job.
    kernel.report();
    assert_eq!(kernel.jobs().len(), 1);

    let resumed = kernel.execute("bg");
    assert!(resumed.ok(), "bg failed: {:?}", resumed);
    assert_eq!(resumed.out, "Running: sh -c kill -STOP $$\n");
    assert_eq!(kernel.jobs().list()[0].status, JobStatus::Running);

    assert!(
        wait_until(&mut kernel, Duration::from_secs(5), |k| k.jobs().is_empty()),
        "resumed job never finished"
    );
    assert_eq!(notices.contents(), "Finished: sh -c kill -STOP $$\n");
}

#[test]
fn partially_stopped_pipeline_is_stopped_as_a_whole() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();

    let result = kernel.execute("sleep 5 | sh -c 'kill -STOP 0'");
    assert_eq!(result.out, "Stopped: sleep 5 | sh -c kill -STOP 0\n");

    let job = kernel.jobs().get(JobId(1)).expect("stopped job kept");
    assert!(job.is_stopped());
    assert!(job
        .processes()
        .iter()
        .all(|p| p.state == ProcessState::Stopped));

    kill_all(&mut kernel);
}

#[test]
fn fg_restarts_stopped_job_and_waits() {
    let _serial = serial();
    let (mut kernel, notices) = test_kernel();

    kernel.execute("sh -c 'kill -STOP $$; exit 0'");
    assert_eq!(kernel.jobs().len(), 1);

    let result = kernel.execute("fg %1");
    assert!(result.ok(), "fg failed: {:?}", result);
    assert_eq!(
        notices.contents(),
        "sh -c kill -STOP $$; exit 0\nRestarting: sh -c kill -STOP $$; exit 0\n"
    );
    assert!(kernel.jobs().is_empty());
}

#[test]
fn fg_waits_for_running_background_job() {
    let _serial = serial();
    let (mut kernel, notices) = test_kernel();

    kernel.execute("sleep 0.2 &");
    let result = kernel.execute("fg");
    assert!(result.ok(), "fg failed: {:?}", result);
    assert!(kernel.jobs().is_empty());

    kernel.report();
    // Completed under fg, so there is nothing left to announce.
    assert_eq!(notices.contents(), "sleep 0.2\n");
}

#[test]
fn bg_on_running_job_changes_nothing() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();

    kernel.execute("sleep 5 &");
    let result = kernel.execute("bg 1");
    assert_eq!(result.code, 1);
    assert_eq!(result.err, "bg: job 1 is already running\n");

    let job = kernel.jobs().get(JobId(1)).expect("job");
    assert!(!job.is_stopped());
    assert!(job.is_background());

    kill_all(&mut kernel);
}

#[test]
fn bg_and_fg_without_jobs() {
    let _serial = serial();
    let (mut kernel, _notices) = test_kernel();

    assert_eq!(kernel.execute("bg").err, "bg: no current job\n");
    assert_eq!(kernel.execute("fg").err, "fg: no current job\n");
    assert_eq!(kernel.execute("fg 42").err, "fg: no such job: 42\n");
    assert_eq!(kernel.execute("bg abc").err, "bg: invalid job id: abc\n");
    assert_eq!(
        kernel.execute("fg 1 2").err,
        "fg: too many arguments\nusage: fg [job-id]\n"
    );
    assert_eq!(kernel.execute("jobs -l").code, 1);
}
