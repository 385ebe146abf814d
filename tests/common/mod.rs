#![allow(dead_code)]

use gemini_bridge::config::BridgeConfig;
use gemini_bridge::server::router;

pub const API_KEY: &str = "sk-test";

/// A config whose "Gemini CLI" is `sh -c <script>`.
///
/// The generated arguments land in the script's positional parameters:
/// `$1`=`--prompt`, `$2`=prompt, `$3`=`--output-format`, `$4`=`stream-json`,
/// `$5`=`--model`, `$6`=model.
pub fn scripted_config(script: &str) -> BridgeConfig {
    BridgeConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_key: API_KEY.to_string(),
        cli_program: "sh".to_string(),
        cli_args: vec!["-c".to_string(), script.to_string(), "gemini".to_string()],
        default_model: "gemini-2.5-flash".to_string(),
        log_level: "DISABLED".to_string(),
    }
}

pub async fn start(config: BridgeConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind bridge");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(config)).await;
    });
    format!("http://{addr}")
}

pub async fn post_chat(base_url: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base_url}/v1/chat/completions"))
        .bearer_auth(API_KEY)
        .json(&body)
        .send()
        .await
        .expect("send request")
}

/// The `data:` payloads of an SSE body, in order.
pub fn sse_data(body: &str) -> Vec<String> {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .filter_map(|raw_event| {
            let data: Vec<&str> = raw_event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if data.is_empty() {
                None
            } else {
                Some(data.join("\n"))
            }
        })
        .collect()
}
