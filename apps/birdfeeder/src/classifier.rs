//! # Classifier Module
//!
//! Client for the Edge TPU classification backend.
//!
//! The model runs out of process next to the accelerator. The daemon POSTs
//! each JPEG frame and receives raw `(id, score)` pairs; resizing to the
//! model's input tensor happens on the backend.
//!
//! ```text
//! POST {inference_url}/v1/classify?model=birds.tflite&device=usb:0&top_k=3
//! content-type: image/jpeg
//!
//! {"classes":[{"id":17,"score":0.83984375}]}
//! ```

use crate::error::AppError;
use crate::source::Frame;
use birdfeeder_core::{ModelSpec, RawClass};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Backend request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can score a frame.
pub trait Classifier {
    fn classify(
        &mut self,
        frame: &Frame,
    ) -> impl Future<Output = Result<Vec<RawClass>, AppError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classes: Vec<RawClass>,
}

/// HTTP client for the classification backend.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    base_url: String,
    model: ModelSpec,
    top_k: usize,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(base_url: impl Into<String>, model: ModelSpec, top_k: usize) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            top_k: top_k.max(1),
            client,
        })
    }

    #[must_use]
    pub fn model(&self) -> &ModelSpec {
        &self.model
    }
}

impl Classifier for HttpClassifier {
    async fn classify(&mut self, frame: &Frame) -> Result<Vec<RawClass>, AppError> {
        let url = format!("{}/v1/classify", self.base_url);

        let mut query = vec![
            ("model", self.model.path.clone()),
            ("top_k", self.top_k.to_string()),
        ];
        if let Some(device) = &self.model.device {
            query.push(("device", device.clone()));
        }

        let response = self
            .client
            .post(&url)
            .query(&query)
            .header(CONTENT_TYPE, "image/jpeg")
            .body(frame.jpeg.clone())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Inference(format!("{status}: {}", body.trim())));
        }

        let parsed: ClassifyResponse = serde_json::from_str(&body)?;
        Ok(parsed.classes)
    }
}
