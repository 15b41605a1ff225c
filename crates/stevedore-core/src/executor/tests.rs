//! Tests for executor module

use super::*;
use crate::lifecycle::LifecycleOptions;
use crate::request::SandboxRequest;
use crate::runtime::{FrameStream, MockContainerRuntime, OutputFrame, StreamKind};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

fn handle() -> ContainerHandle {
    ContainerHandle::running("c0ffee", SandboxRequest::new("alpine"))
}

fn frames(items: Vec<Result<OutputFrame>>) -> FrameStream {
    futures::stream::iter(items).boxed()
}

/// Mock whose exec session emits `output` and exits with `exit_code`
fn session(output: fn() -> Vec<Result<OutputFrame>>, exit_code: i64) -> MockContainerRuntime {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .returning(|_, _| Ok("exec-1".to_string()));
    mock.expect_attach_exec()
        .withf(|exec_id| exec_id == "exec-1")
        .returning(move |_| Ok(frames(output())));
    mock.expect_inspect_exec()
        .withf(|exec_id| exec_id == "exec-1")
        .times(1)
        .returning(move |_| Ok(Some(exit_code)));
    mock
}

fn interleaved() -> Vec<Result<OutputFrame>> {
    vec![
        Ok(OutputFrame::stdout("out 1\n")),
        Ok(OutputFrame::stderr("err 1\n")),
        Ok(OutputFrame::stdout("out 2\n")),
        Ok(OutputFrame::stderr("err 2\n")),
    ]
}

#[tokio::test]
async fn test_run_wraps_command_in_shell() {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .withf(|id, spec| {
            id == "c0ffee"
                && spec.cmd == ["sh", "-c", "echo hello"]
                && spec.attach_stdout
                && spec.attach_stderr
                && spec.privileged
                && spec.env == ["GREETING=hi"]
        })
        .times(1)
        .returning(|_, _| Ok("exec-1".to_string()));
    mock.expect_attach_exec()
        .returning(|_| Ok(frames(vec![Ok(OutputFrame::stdout("hello\n"))])));
    mock.expect_inspect_exec().returning(|_| Ok(Some(0)));

    let manager = SandboxManager::new(Arc::new(mock));
    let request = ExecRequest::new("echo hello", Duration::from_secs(5))
        .env(vec!["GREETING=hi".to_string()])
        .privileged(true);
    let result = manager.run(&handle(), request).await;

    assert!(result.is_success());
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.transcript, "hello\n");
}

#[tokio::test]
async fn test_run_without_sinks_collects_everything() {
    let manager = SandboxManager::new(Arc::new(session(interleaved, 3)));

    let result = manager
        .run(&handle(), ExecRequest::new("./job.sh", Duration::from_secs(5)))
        .await;

    assert!(result.error.is_none());
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.transcript, "out 1\nerr 1\nout 2\nerr 2\n");
}

#[tokio::test]
async fn test_run_with_sinks_splits_streams() {
    let manager = SandboxManager::new(Arc::new(session(interleaved, 0)));
    let mut stdout: Vec<u8> = Vec::new();
    let mut stderr: Vec<u8> = Vec::new();

    let request = ExecRequest::new("./job.sh", Duration::from_secs(5))
        .stdout(&mut stdout)
        .stderr(&mut stderr);
    let result = manager.run(&handle(), request).await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(stdout, b"out 1\nout 2\n");
    assert_eq!(stderr, b"err 1\nerr 2\n");
    assert_eq!(result.transcript, "out 1\nerr 1\nout 2\nerr 2\n");
}

#[tokio::test]
async fn test_run_sinks_receive_exact_frames() {
    let manager = SandboxManager::new(Arc::new(session(interleaved, 0)));
    let mut stdout = tokio_test::io::Builder::new()
        .write(b"out 1\n")
        .write(b"out 2\n")
        .build();
    let mut stderr = tokio_test::io::Builder::new()
        .write(b"err 1\n")
        .write(b"err 2\n")
        .build();

    let request = ExecRequest::new("./job.sh", Duration::from_secs(5))
        .stdout(&mut stdout)
        .stderr(&mut stderr);
    let result = manager.run(&handle(), request).await;

    assert!(result.is_success());
}

#[tokio::test]
async fn test_run_single_sink_is_not_used() {
    let manager = SandboxManager::new(Arc::new(session(interleaved, 0)));
    let mut stdout: Vec<u8> = Vec::new();

    let request = ExecRequest::new("./job.sh", Duration::from_secs(5)).stdout(&mut stdout);
    let result = manager.run(&handle(), request).await;

    assert!(stdout.is_empty());
    assert_eq!(result.transcript, "out 1\nerr 1\nout 2\nerr 2\n");
}

#[tokio::test]
async fn test_run_console_frames_go_to_stdout() {
    let manager = SandboxManager::new(Arc::new(session(
        || vec![Ok(OutputFrame::new(StreamKind::Console, "tty\n"))],
        0,
    )));
    let mut stdout: Vec<u8> = Vec::new();
    let mut stderr: Vec<u8> = Vec::new();

    let request = ExecRequest::new("tty", Duration::from_secs(5))
        .stdout(&mut stdout)
        .stderr(&mut stderr);
    manager.run(&handle(), request).await;

    assert_eq!(stdout, b"tty\n");
    assert!(stderr.is_empty());
}

#[tokio::test]
async fn test_stream_error_is_not_fatal() {
    let manager = SandboxManager::new(Arc::new(session(
        || {
            vec![
                Ok(OutputFrame::stdout("partial\n")),
                Err(Error::Stream("connection reset".to_string())),
                Ok(OutputFrame::stdout("lost\n")),
            ]
        },
        137,
    )));

    let result = manager
        .run(&handle(), ExecRequest::new("yes", Duration::from_secs(5)))
        .await;

    assert!(result.error.is_none());
    assert_eq!(result.exit_code, 137);
    assert_eq!(result.transcript, "partial\n");
}

#[tokio::test]
async fn test_exec_create_failure() {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .times(1)
        .returning(|_, _| Err(Error::runtime("create_exec", "container is not running")));
    mock.expect_attach_exec().never();
    mock.expect_inspect_exec().never();

    let manager = SandboxManager::new(Arc::new(mock));
    let result = manager
        .run(&handle(), ExecRequest::new("true", Duration::from_secs(5)))
        .await;

    assert_eq!(result.exit_code, EXIT_CODE_UNKNOWN);
    assert!(matches!(result.error, Some(Error::Runtime { operation: "create_exec", .. })));
    assert!(result.transcript.is_empty());
}

#[tokio::test]
async fn test_exec_attach_failure() {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .returning(|_, _| Ok("exec-1".to_string()));
    mock.expect_attach_exec()
        .times(1)
        .returning(|_| Err(Error::runtime("start_exec", "hijack failed")));
    mock.expect_inspect_exec().never();

    let manager = SandboxManager::new(Arc::new(mock));
    let result = manager
        .run(&handle(), ExecRequest::new("true", Duration::from_secs(5)))
        .await;

    assert_eq!(result.exit_code, EXIT_CODE_UNKNOWN);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_exec_inspect_failure() {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .returning(|_, _| Ok("exec-1".to_string()));
    mock.expect_attach_exec()
        .returning(|_| Ok(frames(vec![Ok(OutputFrame::stdout("done\n"))])));
    mock.expect_inspect_exec()
        .times(1)
        .returning(|_| Err(Error::NotFound("exec-1".to_string())));

    let manager = SandboxManager::new(Arc::new(mock));
    let result = manager
        .run(&handle(), ExecRequest::new("true", Duration::from_secs(5)))
        .await;

    assert_eq!(result.exit_code, EXIT_CODE_UNKNOWN);
    assert!(matches!(result.error, Some(Error::NotFound(_))));
}

#[tokio::test]
async fn test_missing_exit_code_is_unknown() {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .returning(|_, _| Ok("exec-1".to_string()));
    mock.expect_attach_exec()
        .returning(|_| Ok(frames(Vec::new())));
    mock.expect_inspect_exec().returning(|_| Ok(None));

    let manager = SandboxManager::new(Arc::new(mock));
    let result = manager
        .run(&handle(), ExecRequest::new("true", Duration::from_secs(5)))
        .await;

    assert_eq!(result.exit_code, EXIT_CODE_UNKNOWN);
    assert!(result.error.is_none());
}

fn hanging_session() -> MockContainerRuntime {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_exec()
        .returning(|_, _| Ok("exec-1".to_string()));
    mock.expect_attach_exec().returning(|_| {
        let head = futures::stream::iter(vec![Ok(OutputFrame::stdout("tick\n"))]);
        Ok(head.chain(futures::stream::pending()).boxed())
    });
    mock.expect_inspect_exec().never();
    mock
}

#[tokio::test]
async fn test_timeout_returns_within_margin() {
    let mut mock = hanging_session();
    mock.expect_stop_container().never();
    let manager = SandboxManager::new(Arc::new(mock));

    let started = Instant::now();
    let result = manager
        .run(&handle(), ExecRequest::new("sleep 600", Duration::from_secs(1)))
        .await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    assert_eq!(result.exit_code, EXIT_CODE_UNKNOWN);
    assert!(matches!(result.error, Some(Error::Timeout(1000))));
    assert_eq!(result.transcript, "tick\n");
}

#[tokio::test]
async fn test_sub_second_timeout_keeps_milliseconds() {
    let manager = SandboxManager::new(Arc::new(hanging_session()));

    let result = manager
        .run(&handle(), ExecRequest::new("sleep 600", Duration::from_millis(250)))
        .await;

    assert!(matches!(result.error, Some(Error::Timeout(250))));
    assert_eq!(result.error.unwrap().to_string(), "timeout after 250ms");
}

#[tokio::test]
async fn test_timeout_stops_container_when_enabled() {
    let mut mock = hanging_session();
    mock.expect_stop_container()
        .withf(|id, _| id == "c0ffee")
        .times(1)
        .returning(|_, _| Ok(()));

    let options = LifecycleOptions {
        stop_on_exec_timeout: true,
        ..LifecycleOptions::default()
    };
    let manager = SandboxManager::with_options(Arc::new(mock), options);

    let result = manager
        .run(&handle(), ExecRequest::new("sleep 600", Duration::from_secs(1)))
        .await;

    assert!(matches!(result.error, Some(Error::Timeout(_))));
}
