//! Hosted Roboflow model provider.
//!
//! Each call POSTs the encoded image as a single multipart `file` part to
//! `{base_url}/{model_id}?api_key={key}` and expects HTTP 200 with a JSON
//! `predictions` list. There are no retries; a failed call fails that image.

use std::io::Read;
use std::time::Duration;

use url::Url;

use crate::detect::backend::{InferenceProvider, ProviderError};
use crate::detect::result::{parse_predictions, DetectionSet};
use crate::frame::UploadedImage;

const MAX_RESPONSE_BYTES: u64 = 8 * 1024 * 1024;
const MULTIPART_BOUNDARY: &str = "cornsight-9f3b1c7e2d4a";

/// Connection settings for one hosted model.
#[derive(Clone, Debug)]
pub struct RoboflowConfig {
    /// Endpoint root, e.g. `https://detect.roboflow.com`.
    pub base_url: String,
    /// Provider-assigned model identifier, `<project>/<version>`.
    pub model_id: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct RoboflowProvider {
    agent: ureq::Agent,
    endpoint: Url,
    model_id: String,
    requests: u64,
}

impl RoboflowProvider {
    pub fn new(config: RoboflowConfig) -> Result<Self, ProviderError> {
        let endpoint = endpoint_url(&config.base_url, &config.model_id, &config.api_key)?;
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self {
            agent,
            endpoint,
            model_id: config.model_id,
            requests: 0,
        })
    }

    /// Number of requests sent so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl InferenceProvider for RoboflowProvider {
    fn name(&self) -> &'static str {
        "roboflow"
    }

    fn infer(&mut self, image: &UploadedImage) -> Result<DetectionSet, ProviderError> {
        let body = multipart_body(&image.name, &image.bytes);
        let content_type = format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY);
        self.requests += 1;
        log::debug!(
            "posting {} ({} bytes) to model {}",
            image.name,
            image.bytes.len(),
            self.model_id
        );

        let response = match self
            .agent
            .post(self.endpoint.as_str())
            .set("Content-Type", &content_type)
            .send_bytes(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(ProviderError::Status { status }),
            Err(ureq::Error::Transport(transport)) => {
                return Err(ProviderError::Transport(transport.to_string()))
            }
        };
        // ureq only errors on 4xx/5xx; anything else that isn't 200 is still a failure.
        if response.status() != 200 {
            return Err(ProviderError::Status {
                status: response.status(),
            });
        }

        let mut raw = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut raw)
            .map_err(|e| ProviderError::Transport(format!("read response body: {}", e)))?;
        parse_predictions(&raw)
    }
}

fn endpoint_url(base_url: &str, model_id: &str, api_key: &str) -> Result<Url, ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::Config(format!(
            "no API key configured for model {}",
            model_id
        )));
    }
    let mut url = Url::parse(base_url)
        .map_err(|e| ProviderError::Config(format!("invalid base url {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::Config(format!("base url {} cannot carry a path", base_url)))?
        .pop_if_empty()
        .extend(model_id.split('/').filter(|segment| !segment.is_empty()));
    url.query_pairs_mut().append_pair("api_key", api_key);
    Ok(url)
}

fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let file_name: String = file_name
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_carries_model_path_and_key() {
        let url = endpoint_url("https://detect.roboflow.com", "corn-grayleafspot2/22", "k3y")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://detect.roboflow.com/corn-grayleafspot2/22?api_key=k3y"
        );

        let nested = endpoint_url("http://127.0.0.1:9001/infer/", "testing-cmpv3/1", "a b")
            .unwrap();
        assert_eq!(
            nested.as_str(),
            "http://127.0.0.1:9001/infer/testing-cmpv3/1?api_key=a+b"
        );
    }

    #[test]
    fn endpoint_requires_key() {
        let err = endpoint_url("https://detect.roboflow.com", "m/1", "  ").unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[test]
    fn multipart_wraps_file_part() {
        let body = multipart_body("leaf \"1\".jpg", &[0xFF, 0xD8, 0xFF, 0xD9]);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with(&format!("--{}\r\n", MULTIPART_BOUNDARY)));
        assert!(text.contains("name=\"file\"; filename=\"leaf _1_.jpg\""));
        assert!(text.ends_with(&format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY)));
        let header_end = body.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        assert_eq!(&body[header_end..header_end + 4], &[0xFF, 0xD8, 0xFF, 0xD9]);
    }
}
