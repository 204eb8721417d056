//! Mock provider for testing and offline runs
//!
//! Speaks the same JSON shapes as the Hunyuan API without any network
//! calls. Every submitted job replays its own copy of a status script; the
//! last scripted status repeats once the script runs out. Downloads of
//! `mock://` URLs return a minimal valid GLB.

use crate::provider::{ApiStatus, RemoteApi, ResultFile, QUERY_ACTION, SUBMIT_ACTION};
use hy3d_core::{Hy3dError, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

pub const MOCK_MODEL_URL: &str = "mock://model.glb";

/// One scripted poll response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStatus {
    Wait,
    Run,
    Fail { code: String, message: String },
    Done(Vec<ResultFile>),
}

impl MockStatus {
    pub fn fail(code: &str, message: &str) -> Self {
        MockStatus::Fail {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// `Done` with a single GLB result at `url`
    pub fn done_glb(url: &str) -> Self {
        MockStatus::Done(vec![ResultFile {
            file_type: "GLB".to_string(),
            url: url.to_string(),
            preview_url: None,
        }])
    }

    fn to_response(&self, job_id: &str) -> Value {
        match self {
            MockStatus::Wait => json!({ "Status": "WAIT", "JobId": job_id }),
            MockStatus::Run => json!({ "Status": "RUN", "JobId": job_id }),
            MockStatus::Fail { code, message } => json!({
                "Status": "FAIL",
                "JobId": job_id,
                "ErrorCode": code,
                "ErrorMessage": message,
            }),
            MockStatus::Done(files) => json!({
                "Status": "DONE",
                "JobId": job_id,
                "ResultFile3Ds": files
                    .iter()
                    .map(|f| json!({
                        "Type": f.file_type,
                        "Url": f.url,
                        "PreviewImageUrl": f.preview_url.clone().unwrap_or_default(),
                    }))
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub action: String,
    pub payload: Value,
}

#[derive(Debug, Clone)]
enum MockDownload {
    Body(Vec<u8>),
    Status(u16),
}

#[derive(Debug, Default)]
struct MockState {
    script: Vec<MockStatus>,
    jobs: HashMap<String, VecDeque<MockStatus>>,
    submit_failures: HashMap<usize, (String, String)>,
    query_error: Option<(String, String)>,
    downloads: HashMap<String, MockDownload>,
    submits: usize,
    calls: Vec<RecordedCall>,
}

/// A scripted stand-in for the remote API
pub struct MockApi {
    state: Mutex<MockState>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Jobs go WAIT, RUN, then DONE with one GLB at `mock://model.glb`
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                script: vec![
                    MockStatus::Wait,
                    MockStatus::Run,
                    MockStatus::done_glb(MOCK_MODEL_URL),
                ],
                ..Default::default()
            }),
        }
    }

    /// Replace the status script replayed by every new job
    pub fn with_statuses(self, statuses: Vec<MockStatus>) -> Self {
        self.lock().script = statuses;
        self
    }

    /// Make the `index`-th submission (0-based) fail with a remote error
    pub fn fail_submission(self, index: usize, code: &str, message: &str) -> Self {
        self.lock()
            .submit_failures
            .insert(index, (code.to_string(), message.to_string()));
        self
    }

    /// Make every status query fail with a remote error
    pub fn with_query_error(self, code: &str, message: &str) -> Self {
        self.lock().query_error = Some((code.to_string(), message.to_string()));
        self
    }

    pub fn with_download(self, url: &str, body: Vec<u8>) -> Self {
        self.lock()
            .downloads
            .insert(url.to_string(), MockDownload::Body(body));
        self
    }

    pub fn with_download_status(self, url: &str, status: u16) -> Self {
        self.lock()
            .downloads
            .insert(url.to_string(), MockDownload::Status(status));
        self
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, action: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.action == action).count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn error_response(code: &str, message: &str) -> Value {
    json!({
        "Response": {
            "Error": { "Code": code, "Message": message },
            "RequestId": uuid::Uuid::new_v4().to_string(),
        }
    })
}

fn ok_response(mut body: Value) -> Value {
    body["RequestId"] = json!(uuid::Uuid::new_v4().to_string());
    json!({ "Response": body })
}

impl RemoteApi for MockApi {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> ApiStatus {
        ApiStatus::Available
    }

    fn call(&self, action: &str, payload: &Value) -> Result<Value> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            action: action.to_string(),
            payload: payload.clone(),
        });

        match action {
            SUBMIT_ACTION => {
                let index = state.submits;
                state.submits += 1;
                if let Some((code, message)) = state.submit_failures.get(&index) {
                    return Ok(error_response(code, message));
                }
                let job_id = format!("mock-job-{}", index + 1);
                let script: VecDeque<MockStatus> = state.script.iter().cloned().collect();
                state.jobs.insert(job_id.clone(), script);
                Ok(ok_response(json!({ "JobId": job_id })))
            }
            QUERY_ACTION => {
                if let Some((code, message)) = &state.query_error {
                    return Ok(error_response(code, message));
                }
                let job_id = payload
                    .get("JobId")
                    .and_then(|j| j.as_str())
                    .unwrap_or_default()
                    .to_string();
                let Some(remaining) = state.jobs.get_mut(&job_id) else {
                    return Ok(error_response(
                        "ResourceNotFound",
                        &format!("Job {} does not exist", job_id),
                    ));
                };
                let status = if remaining.len() > 1 {
                    remaining.pop_front()
                } else {
                    remaining.front().cloned()
                };
                match status {
                    Some(status) => Ok(ok_response(status.to_response(&job_id))),
                    None => Ok(ok_response(json!({ "Status": "WAIT", "JobId": job_id }))),
                }
            }
            other => Ok(error_response(
                "InvalidAction",
                &format!("Unsupported action {}", other),
            )),
        }
    }

    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let scripted = self.lock().downloads.get(url).cloned();
        let body = match scripted {
            Some(MockDownload::Status(code)) => {
                return Err(Hy3dError::Download(format!("HTTP {} for {}", code, url)));
            }
            Some(MockDownload::Body(body)) => body,
            None if url.starts_with("mock://") => minimal_glb_bytes(),
            None => return Err(Hy3dError::Download(format!("HTTP 404 for {}", url))),
        };
        sink.write_all(&body)?;
        Ok(body.len() as u64)
    }
}

/// A minimal valid glTF 2.0 binary holding a single triangle
pub fn minimal_glb_bytes() -> Vec<u8> {
    let json = json!({
        "asset": { "version": "2.0", "generator": "hy3d-mock" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "indices": 1
            }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "max": [1.0, 1.0, 0.0],
                "min": [-1.0, 0.0, 0.0]
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR",
                "max": [2],
                "min": [0]
            }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{ "byteLength": 44 }]
    });

    // Chunks are 4-byte aligned: JSON padded with spaces, BIN with zeros
    let mut json_chunk = json.to_string().into_bytes();
    json_chunk.resize((json_chunk.len() + 3) & !3, b' ');

    let vertices: [f32; 9] = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin_chunk = Vec::with_capacity(44);
    for v in &vertices {
        bin_chunk.extend_from_slice(&v.to_le_bytes());
    }
    for i in &indices {
        bin_chunk.extend_from_slice(&i.to_le_bytes());
    }
    bin_chunk.resize((bin_chunk.len() + 3) & !3, 0);

    let total_len = 12 + 8 + json_chunk.len() as u32 + 8 + bin_chunk.len() as u32;

    let mut out = Vec::with_capacity(total_len as usize);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    out.extend_from_slice(&bin_chunk);
    out
}
