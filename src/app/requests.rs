//! Outbound request logic
//!
//! Each accepted submit spawns exactly one task on the app's runtime. The
//! task pushes a generation-tagged completion into the flow's inbox and asks
//! egui for a repaint; `App::poll_completions` applies it on the next frame.
//! Failures reach the UI as one generic message, the cause goes to the log.

use super::App;
use crate::constants::{GENERATE_FAILED_MSG, GENERATE_PATH, PREDICT_FAILED_MSG};
use crate::session::{GenerateCompletion, PredictCompletion};
use crate::types::{GenerateRequest, PredictionResponse};
use eframe::egui;
use tracing::{info, warn};

async fn send_predict(
    client: &reqwest::Client,
    url: &str,
    file_name: String,
    bytes: Vec<u8>,
) -> Result<String, String> {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let body: PredictionResponse = response.json().await.map_err(|e| e.to_string())?;
    Ok(body.prediction.display())
}

async fn send_generate(
    client: &reqwest::Client,
    url: &str,
    body: GenerateRequest,
) -> Result<Vec<u8>, String> {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    // A 2xx with a body that is not an image is still a malformed payload
    image::load_from_memory(&bytes).map_err(|e| format!("payload did not decode: {}", e))?;
    Ok(bytes.to_vec())
}

impl App {
    pub fn submit_predict(&mut self, ctx: &egui::Context) {
        let Some(job) = self.predict.begin_submit() else {
            return;
        };

        let url = format!("{}{}", self.server_url_str.trim_end_matches('/'), job.kind.predict_path());
        info!(url = %url, kind = job.kind.wire_name(), bytes = job.bytes.len(), "Submitting prediction request");

        let client = self.client.clone();
        let inbox = self.predict_inbox.clone();
        let ctx = ctx.clone();
        let generation = job.generation;

        self.runtime.spawn(async move {
            let started = std::time::Instant::now();
            let result = send_predict(&client, &url, job.file_name, job.bytes).await;
            let result = match result {
                Ok(prediction) => {
                    info!(elapsed_ms = started.elapsed().as_millis() as u64, prediction = %prediction, "Prediction received");
                    Ok(prediction)
                }
                Err(e) => {
                    warn!(error = %e, url = %url, "Prediction request failed");
                    Err(PREDICT_FAILED_MSG.to_string())
                }
            };
            inbox.lock().unwrap().push(PredictCompletion { generation, result });
            ctx.request_repaint();
        });
    }

    pub fn submit_generate(&mut self, ctx: &egui::Context) {
        let Some(job) = self.generate.begin_submit() else {
            return;
        };

        let url = format!("{}{}", self.server_url_str.trim_end_matches('/'), GENERATE_PATH);
        info!(url = %url, kind = job.kind.wire_name(), percentage = job.percentage, "Submitting generate request");

        let body = GenerateRequest {
            percentage: job.percentage,
            kind: job.kind.wire_name(),
        };
        let client = self.client.clone();
        let inbox = self.generate_inbox.clone();
        let ctx = ctx.clone();
        let generation = job.generation;

        self.runtime.spawn(async move {
            let started = std::time::Instant::now();
            let result = send_generate(&client, &url, body).await;
            let result = match result {
                Ok(png) => {
                    info!(elapsed_ms = started.elapsed().as_millis() as u64, bytes = png.len(), "Generated image received");
                    Ok(png)
                }
                Err(e) => {
                    warn!(error = %e, url = %url, "Generate request failed");
                    Err(GENERATE_FAILED_MSG.to_string())
                }
            };
            inbox.lock().unwrap().push(GenerateCompletion { generation, result });
            ctx.request_repaint();
        });
    }
}
