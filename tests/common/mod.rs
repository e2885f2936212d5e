//! Scripted stand-in for the IVIS host

#![allow(dead_code)]

use serde_json::{json, Value};
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Host end of the two task streams
pub struct FakeHost {
    requests: Lines<BufReader<DuplexStream>>,
    responses: DuplexStream,
}

/// Task end: what the task reads (its stdin) and writes (its request descriptor)
pub struct TaskStreams {
    pub stdin: DuplexStream,
    pub requests: DuplexStream,
}

pub fn connect() -> (FakeHost, TaskStreams) {
    let (host_responses, task_stdin) = duplex(PIPE_CAPACITY);
    let (task_requests, host_requests) = duplex(PIPE_CAPACITY);

    let host = FakeHost {
        requests: BufReader::new(host_requests).lines(),
        responses: host_responses,
    };
    let task = TaskStreams {
        stdin: task_stdin,
        requests: task_requests,
    };
    (host, task)
}

pub fn bootstrap_payload(state: Option<Value>) -> Value {
    let mut payload = json!({
        "es": {"host": "localhost", "port": 9200},
        "params": {"sigSet": "temp1", "window": 5},
        "entities": {"signalSets": {"temp1": {"id": 1, "index": "signal_set_1"}}},
        "owned": {"signalSets": {"derived": {}}}
    });
    if let Some(state) = state {
        payload["state"] = state;
    }
    payload
}

impl FakeHost {
    pub async fn write_line(&mut self, value: &Value) {
        let line = format!("{}\n", value);
        self.responses.write_all(line.as_bytes()).await.unwrap();
    }

    pub async fn write_raw(&mut self, raw: &str) {
        self.responses.write_all(raw.as_bytes()).await.unwrap();
    }

    /// Next request line parsed as JSON, `None` once the task hung up
    pub async fn next_request(&mut self) -> Option<Value> {
        let line = self.requests.next_line().await.unwrap()?;
        Some(serde_json::from_str(&line).unwrap())
    }

    /// Answer one request per scripted reply and collect what was asked
    pub fn serve(mut self, replies: Vec<Value>) -> JoinHandle<Vec<Value>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            for reply in replies {
                let Some(request) = self.next_request().await else {
                    break;
                };
                seen.push(request);
                self.write_line(&reply).await;
            }
            seen
        })
    }

    /// Echo every request back inside `{"echo": ...}` until the task hangs up
    pub fn serve_echo(mut self) -> JoinHandle<Vec<Value>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(request) = self.next_request().await {
                self.write_line(&json!({ "echo": request })).await;
                seen.push(request);
            }
            seen
        })
    }
}
