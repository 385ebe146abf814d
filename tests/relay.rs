#![cfg(unix)]

use std::time::Duration;

use gemini_bridge::launcher::{launch, LaunchSpec};
use gemini_bridge::relay;
use gemini_bridge::translator::{Output, ResponseMode, StreamState};

fn sh(script: &str) -> LaunchSpec {
    LaunchSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn buffered_relay_delivers_one_terminal_output_and_closes() {
    let process = launch(&sh(
        r#"printf '%s\n' '{"type":"message","role":"assistant","content":"a"}' '{"type":"result"}' '{"type":"result"}'"#,
    ))
    .expect("spawn");
    let mut handle = relay::spawn(process, StreamState::new(ResponseMode::Buffered, "m"));

    match handle.outputs.recv().await {
        Some(Output::Completion(completion)) => {
            assert_eq!(completion.choices[0].message.content, "a");
        }
        other => panic!("unexpected output: {other:?}"),
    }
    assert!(handle.outputs.recv().await.is_none());
}

#[tokio::test]
async fn streaming_relay_ends_with_done() {
    let process = launch(&sh(
        r#"printf '%s\n' '{"type":"message","role":"assistant","content":"x"}'; echo 'Error executing tool read_file' >&2"#,
    ))
    .expect("spawn");
    let mut handle = relay::spawn(process, StreamState::new(ResponseMode::Streaming, "m"));

    let mut outputs = Vec::new();
    while let Some(output) = handle.outputs.recv().await {
        outputs.push(output);
    }

    assert!(matches!(
        outputs.as_slice(),
        [Output::Chunk(_), Output::Chunk(_), Output::Done]
    ));
}

#[tokio::test]
async fn dropping_the_handle_kills_the_generator() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());
    let process = launch(&sh(&script)).expect("spawn");
    let handle = relay::spawn(process, StreamState::new(ResponseMode::Streaming, "m"));

    let mut pid = String::new();
    for _ in 0..100 {
        if let Ok(contents) = std::fs::read_to_string(&pid_file) {
            if contents.ends_with('\n') {
                pid = contents.trim().to_string();
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!pid.is_empty(), "generator never started");
    assert!(process_alive(&pid));

    drop(handle);

    let mut alive = true;
    for _ in 0..100 {
        if !process_alive(&pid) {
            alive = false;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!alive, "generator outlived its request");
}
