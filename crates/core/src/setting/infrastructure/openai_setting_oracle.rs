use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, ImageResult};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::setting::domain::setting_oracle::{OracleError, SettingOracle};
use crate::shared::constants::{
    AFFIRMATIVE_ANSWERS, DEFAULT_ORACLE_BASE_URL, DEFAULT_ORACLE_MODEL,
    DEFAULT_ORACLE_TIMEOUT_SECS, ORACLE_MAX_TOKENS,
};
use crate::video::domain::frame_loader::{EncodedImage, FrameLoadError, FrameLoader};

const SYSTEM_PROMPT: &str =
    "You are an assistant that compares two images to determine if they show the same setting.";

const COMPARE_PROMPT: &str = "Decide whether the two images below show the same setting. \
A setting is a location where some action takes place; a video that moves between places \
has several settings. Take people's pose, hairstyle, clothes and the background lighting \
into account. Answer only 'Yes' or 'No'.";

/// MIME types vision endpoints accept as inline image data.
const INLINE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiOracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenAiOracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_ORACLE_BASE_URL.to_string(),
            model: DEFAULT_ORACLE_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECS),
        }
    }
}

/// Asks a multimodal chat model whether two frames share a setting.
///
/// Both frames are sent inline as base64 data URLs in a single user
/// message. The reply is affirmative when, trimmed and lower-cased, it is
/// one of [`AFFIRMATIVE_ANSWERS`]; anything else is a "no".
pub struct OpenAiSettingOracle {
    client: reqwest::blocking::Client,
    config: OpenAiOracleConfig,
    loader: Box<dyn FrameLoader>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiSettingOracle {
    pub fn new(
        config: OpenAiOracleConfig,
        loader: Box<dyn FrameLoader>,
    ) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OracleError::Request)?;
        Ok(Self {
            client,
            config,
            loader,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn load(&self, path: &Path) -> Result<EncodedImage, OracleError> {
        let frame_error = |source| OracleError::FrameLoad {
            path: path.to_path_buf(),
            source,
        };
        let image = self.loader.load(path).map_err(frame_error)?;
        inline_image(image).map_err(|source| {
            frame_error(FrameLoadError::Decode {
                path: path.to_path_buf(),
                source,
            })
        })
    }

    fn request_body(&self, first: &EncodedImage, second: &EncodedImage) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": COMPARE_PROMPT },
                        image_part(first),
                        image_part(second),
                    ],
                },
            ],
            "max_tokens": ORACLE_MAX_TOKENS,
        })
    }
}

/// Passes endpoint-friendly formats through and re-encodes anything else
/// (BMP, TIFF, ...) as PNG.
fn inline_image(image: EncodedImage) -> ImageResult<EncodedImage> {
    if INLINE_MIME_TYPES.contains(&image.mime_type) {
        return Ok(image);
    }
    let decoded = image::load_from_memory(&image.bytes)?;
    let mut bytes = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    log::debug!("Re-encoded {} frame as PNG for the oracle", image.mime_type);
    Ok(EncodedImage {
        bytes,
        mime_type: ImageFormat::Png.to_mime_type(),
    })
}

fn image_part(image: &EncodedImage) -> Value {
    let url = format!(
        "data:{};base64,{}",
        image.mime_type,
        STANDARD.encode(&image.bytes)
    );
    json!({
        "type": "image_url",
        "image_url": { "url": url, "detail": "high" },
    })
}

fn map_transport_error(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout
    } else {
        OracleError::Request(e)
    }
}

/// Whether a free-text oracle reply means "same setting".
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    AFFIRMATIVE_ANSWERS.contains(&answer.as_str())
}

impl SettingOracle for OpenAiSettingOracle {
    fn same_setting(&self, frame: &Path, other: &Path) -> Result<bool, OracleError> {
        let first = self.load(frame)?;
        let second = self.load(other)?;
        let body = self.request_body(&first, &second);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout
            } else {
                OracleError::MalformedResponse(e.to_string())
            }
        })?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::MalformedResponse("no message content".into()))?;

        let same = is_affirmative(&content);
        log::debug!(
            "oracle: {} vs {} -> {:?} ({})",
            frame.display(),
            other.display(),
            content.trim(),
            same
        );
        Ok(same)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves `image` for every path.
    struct StubLoader {
        image: EncodedImage,
    }

    impl StubLoader {
        fn png() -> Self {
            Self {
                image: EncodedImage {
                    bytes: vec![1, 2, 3],
                    mime_type: "image/png",
                },
            }
        }

        fn bmp() -> Self {
            let mut bytes = Vec::new();
            image::RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9]))
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp)
                .unwrap();
            Self {
                image: EncodedImage {
                    bytes,
                    mime_type: "image/bmp",
                },
            }
        }
    }

    impl FrameLoader for StubLoader {
        fn load(&self, _path: &Path) -> Result<EncodedImage, FrameLoadError> {
            Ok(self.image.clone())
        }
    }

    struct MissingLoader;

    impl FrameLoader for MissingLoader {
        fn load(&self, path: &Path) -> Result<EncodedImage, FrameLoadError> {
            Err(FrameLoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        }
    }

    /// Mock chat completions endpoint. The server runs on its own thread;
    /// the runtime is only used to drive setup and inspection.
    struct MockEndpoint {
        server: MockServer,
        runtime: tokio::runtime::Runtime,
    }

    impl MockEndpoint {
        fn start(response: ResponseTemplate) -> Self {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let server = runtime.block_on(async {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .and(path("/v1/chat/completions"))
                    .and(header("authorization", "Bearer sk-test"))
                    .respond_with(response)
                    .mount(&server)
                    .await;
                server
            });
            Self { server, runtime }
        }

        fn oracle(&self, loader: Box<dyn FrameLoader>, timeout: Duration) -> OpenAiSettingOracle {
            let config = OpenAiOracleConfig {
                api_key: "sk-test".into(),
                base_url: format!("{}/v1", self.server.uri()),
                timeout,
                ..Default::default()
            };
            OpenAiSettingOracle::new(config, loader).unwrap()
        }

        fn request_bodies(&self) -> Vec<Value> {
            self.runtime
                .block_on(self.server.received_requests())
                .unwrap_or_default()
                .iter()
                .map(|r| serde_json::from_slice(&r.body).unwrap())
                .collect()
        }
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(
            json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] }),
        )
    }

    fn compare(oracle: &OpenAiSettingOracle) -> Result<bool, OracleError> {
        oracle.same_setting(Path::new("a.png"), Path::new("b.png"))
    }

    #[rstest]
    #[case("Yes", true)]
    #[case("yes.", true)]
    #[case("  TRUE  ", true)]
    #[case("True.", true)]
    #[case("No", false)]
    #[case("Yes, they do.", false)]
    #[case("", false)]
    fn test_is_affirmative(#[case] answer: &str, #[case] expected: bool) {
        assert_eq!(is_affirmative(answer), expected);
    }

    #[test]
    fn test_affirmative_reply_is_same_setting() {
        let endpoint = MockEndpoint::start(completion("Yes."));
        let oracle = endpoint.oracle(Box::new(StubLoader::png()), Duration::from_secs(5));

        assert!(compare(&oracle).unwrap());

        let bodies = endpoint.request_bodies();
        assert_eq!(bodies.len(), 1);
        let body = &bodies[0];
        assert_eq!(body["model"], DEFAULT_ORACLE_MODEL);
        assert_eq!(body["max_tokens"], ORACLE_MAX_TOKENS);
        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AQID");
        assert_eq!(parts[2]["image_url"]["detail"], "high");
    }

    #[test]
    fn test_negative_reply_is_different_setting() {
        let endpoint = MockEndpoint::start(completion("No"));
        let oracle = endpoint.oracle(Box::new(StubLoader::png()), Duration::from_secs(5));

        assert!(!compare(&oracle).unwrap());
    }

    #[test]
    fn test_http_error_status() {
        let endpoint = MockEndpoint::start(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })),
        );
        let oracle = endpoint.oracle(Box::new(StubLoader::png()), Duration::from_secs(5));

        let err = compare(&oracle).unwrap_err();
        assert!(matches!(err, OracleError::Status { status: 500, .. }));
    }

    #[test]
    fn test_missing_content_is_malformed() {
        let endpoint =
            MockEndpoint::start(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })));
        let oracle = endpoint.oracle(Box::new(StubLoader::png()), Duration::from_secs(5));

        let err = compare(&oracle).unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }

    #[test]
    fn test_slow_server_times_out() {
        let endpoint = MockEndpoint::start(completion("Yes").set_delay(Duration::from_secs(3)));
        let oracle = endpoint.oracle(Box::new(StubLoader::png()), Duration::from_millis(200));

        let err = compare(&oracle).unwrap_err();
        assert!(matches!(err, OracleError::Timeout));
    }

    #[test]
    fn test_bmp_frames_are_sent_as_png() {
        let endpoint = MockEndpoint::start(completion("No"));
        let oracle = endpoint.oracle(Box::new(StubLoader::bmp()), Duration::from_secs(5));

        assert!(!compare(&oracle).unwrap());

        let bodies = endpoint.request_bodies();
        let url = bodies[0]["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        let data = url.strip_prefix("data:image/png;base64,").unwrap();
        let png = STANDARD.decode(data).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_inline_formats_pass_through_untouched() {
        let original = EncodedImage {
            bytes: vec![0xff, 0xd8, 0xff],
            mime_type: "image/jpeg",
        };
        assert_eq!(inline_image(original.clone()).unwrap(), original);
    }

    #[test]
    fn test_undecodable_non_inline_frame_is_frame_error() {
        let loader = StubLoader {
            image: EncodedImage {
                bytes: b"BMnope".to_vec(),
                mime_type: "image/bmp",
            },
        };
        let oracle = OpenAiSettingOracle::new(
            OpenAiOracleConfig {
                base_url: "http://127.0.0.1:9".into(),
                ..Default::default()
            },
            Box::new(loader),
        )
        .unwrap();

        let err = compare(&oracle).unwrap_err();
        assert!(matches!(
            err,
            OracleError::FrameLoad {
                source: FrameLoadError::Decode { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_unloadable_frame_fails_before_request() {
        let oracle = OpenAiSettingOracle::new(
            OpenAiOracleConfig {
                base_url: "http://127.0.0.1:9".into(),
                ..Default::default()
            },
            Box::new(MissingLoader),
        )
        .unwrap();

        let err = oracle
            .same_setting(Path::new("gone.png"), Path::new("b.png"))
            .unwrap_err();
        assert!(matches!(err, OracleError::FrameLoad { .. }));
    }
}
