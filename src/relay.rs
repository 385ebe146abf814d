//! Per-request task that pumps a generator's pipes through a [`StreamState`].

use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::launcher::GeneratorProcess;
use crate::translator::{Output, StreamState};

const READ_CHUNK: usize = 8 * 1024;
const OUTPUT_BUFFER: usize = 64;

/// The response side of a relay.
///
/// Dropping `guard` before the terminal output has been produced kills the
/// generator.
pub struct RelayHandle {
    pub outputs: mpsc::Receiver<Output>,
    pub guard: DropGuard,
}

pub fn spawn(process: GeneratorProcess, state: StreamState) -> RelayHandle {
    let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
    let cancel = CancellationToken::new();
    tokio::spawn(relay(process, state, tx, cancel.clone()));

    RelayHandle {
        outputs: rx,
        guard: cancel.drop_guard(),
    }
}

/// Drive the generator until it exits.
///
/// The output channel is closed as soon as the terminal response has been
/// delivered; the child is then left to finish on its own.
pub async fn relay(
    process: GeneratorProcess,
    mut state: StreamState,
    tx: mpsc::Sender<Output>,
    cancel: CancellationToken,
) {
    let GeneratorProcess {
        mut child,
        mut stdout,
        mut stderr,
    } = process;
    let mut sink = Some(tx);
    let mut stdout_buf = vec![0u8; READ_CHUNK];
    let mut stderr_buf = vec![0u8; READ_CHUNK];
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            _ = cancel.cancelled(), if !state.is_finished() => {
                terminate(&mut child, &state).await;
                return;
            }
            read = stdout.read(&mut stdout_buf), if stdout_open => {
                let outputs = match read {
                    Ok(0) => {
                        stdout_open = false;
                        state.on_stdout_end()
                    }
                    Ok(n) => state.on_stdout(&stdout_buf[..n]),
                    Err(err) => {
                        tracing::warn!("failed to read Gemini CLI stdout: {err}");
                        stdout_open = false;
                        state.on_stdout_end()
                    }
                };
                deliver(&mut sink, &state, outputs).await;
            }
            read = stderr.read(&mut stderr_buf), if stderr_open => {
                match read {
                    Ok(0) => {
                        stderr_open = false;
                        state.on_stderr_end();
                    }
                    Ok(n) => {
                        let chunk = &stderr_buf[..n];
                        tracing::warn!(
                            target: "gemini_bridge::stderr",
                            "stderr: {}",
                            String::from_utf8_lossy(chunk).trim_end()
                        );
                        state.on_stderr(chunk);
                    }
                    Err(err) => {
                        tracing::warn!("failed to read Gemini CLI stderr: {err}");
                        stderr_open = false;
                        state.on_stderr_end();
                    }
                }
            }
        }
    }

    let status = tokio::select! {
        _ = cancel.cancelled(), if !state.is_finished() => {
            terminate(&mut child, &state).await;
            return;
        }
        status = child.wait() => status,
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(err) => {
            tracing::warn!("failed to wait for Gemini CLI: {err}");
            None
        }
    };
    tracing::info!("Gemini CLI exited (model={}, code={code:?})", state.model());

    let outputs = state.on_exit(code);
    deliver(&mut sink, &state, outputs).await;
}

async fn deliver(
    sink: &mut Option<mpsc::Sender<Output>>,
    state: &StreamState,
    outputs: Vec<Output>,
) {
    if let Some(tx) = sink.as_ref() {
        for output in outputs {
            if tx.send(output).await.is_err() {
                break;
            }
        }
    }
    if state.is_finished() {
        sink.take();
    }
}

async fn terminate(child: &mut Child, state: &StreamState) {
    tracing::info!(
        "client went away before the response finished ({:?}); killing Gemini CLI",
        state.mode()
    );
    if let Err(err) = child.kill().await {
        tracing::warn!("failed to kill Gemini CLI: {err}");
    }
}
