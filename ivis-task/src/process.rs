//! Wiring a session to the real process streams

use ivis_config::IvisConfig;
use ivis_ipc::{IpcError, LineChannel};
use std::future::Future;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::Stdin;
use tracing::info;

use crate::error::{TaskError, TaskResult};
use crate::session::Session;

/// Channel used by a task process: responses on stdin, requests on the
/// configured request path
pub type ProcessChannel = LineChannel<Stdin, File>;

/// Open the request path and bootstrap from stdin.
///
/// Must be called at most once per process; stdin belongs to the returned
/// session from then on. Reads from stdin run on a blocking thread that
/// cannot be cancelled, so drive the task with [`block_on_task`] or the
/// runtime will not shut down until the host writes or closes stdin.
pub async fn connect(config: &IvisConfig) -> TaskResult<Session<ProcessChannel>> {
    let request_path = &config.channel.request_path;
    let writer = OpenOptions::new()
        .write(true)
        .open(request_path)
        .await
        .map_err(|e| TaskError::ChannelOpen {
            path: request_path.clone(),
            message: e.to_string(),
        })?;

    Session::bootstrap(tokio::io::stdin(), writer, config).await
}

/// Connect, then hand the session to `task`
pub async fn run_task<F, Fut>(config: &IvisConfig, task: F) -> TaskResult<()>
where
    F: FnOnce(Arc<Session<ProcessChannel>>) -> Fut,
    Fut: Future<Output = TaskResult<()>>,
{
    let session = Arc::new(connect(config).await?);
    task(session).await?;
    info!("Task finished");
    Ok(())
}

/// Run `future` to completion on a single-threaded runtime, then drop the
/// runtime without waiting for blocking work.
///
/// After a response timeout the stdin read is still parked on a blocking
/// thread; a plain runtime drop would wait for it.
pub fn block_on_task<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Process exit status for a failed task
pub fn exit_code(err: &TaskError) -> u8 {
    match err {
        TaskError::MalformedBootstrap { .. } | TaskError::Config(_) => 2,
        TaskError::ChannelOpen { .. }
        | TaskError::Ipc(IpcError::ChannelClosed)
        | TaskError::Ipc(IpcError::Desynchronized)
        | TaskError::Ipc(IpcError::Timeout(_)) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&TaskError::malformed("missing `params`")), 2);
        assert_eq!(exit_code(&TaskError::Ipc(IpcError::ChannelClosed)), 3);
        assert_eq!(
            exit_code(&TaskError::Ipc(IpcError::Timeout(Duration::from_secs(1)))),
            3
        );
        assert_eq!(
            exit_code(&TaskError::Ipc(IpcError::RemoteRequest("boom".to_string()))),
            1
        );
    }

    #[test]
    fn test_block_on_task_does_not_wait_for_blocking_reads() {
        let started = std::time::Instant::now();
        let output = block_on_task(async {
            // Stands in for a stdin read the host never answers
            let _ = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
            tokio::task::yield_now().await;
            7
        })
        .unwrap();

        assert_eq!(output, 7);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_connect_reports_unopenable_request_path() {
        let mut config = IvisConfig::default();
        config.channel.request_path = "/nonexistent/ivis/requests".to_string();

        match connect(&config).await {
            Err(TaskError::ChannelOpen { path, .. }) => {
                assert_eq!(path, "/nonexistent/ivis/requests")
            }
            Err(other) => panic!("expected ChannelOpen, got {:?}", other),
            Ok(_) => panic!("expected ChannelOpen, got a session"),
        }
    }
}
