//! Azure Speech text-to-speech client.
//!
//! Sends SSML to the regional `cognitiveservices/v1` endpoint and returns the
//! encoded audio bytes.

use crate::{build_http_client, Error};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Azure Speech synthesis client.
#[derive(Clone)]
pub struct AzureSpeech {
    client: reqwest::Client,
    region: String,
    api_key: String,
}

impl AzureSpeech {
    /// Create a client for the given region (e.g. `eastasia`) and subscription key.
    pub fn new(region: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            region: region.into(),
            api_key: api_key.into(),
        })
    }

    /// Replace the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    /// Synthesize `text` with the named neural voice and return the audio bytes.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, Error> {
        let headers = self.build_headers()?;
        let body = build_ssml(text, voice);

        tracing::debug!(voice, chars = text.chars().count(), "requesting speech synthesis");

        let response = self
            .client
            .post(self.synthesis_url())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn synthesis_url(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        )
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/ssml+xml"));
        headers.insert(USER_AGENT, HeaderValue::from_static("bedtime"));
        headers.insert(
            "Ocp-Apim-Subscription-Key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert(
            "X-Microsoft-OutputFormat",
            HeaderValue::from_static(OUTPUT_FORMAT),
        );
        Ok(headers)
    }
}

/// Build the SSML document for a single voice.
pub fn build_ssml(text: &str, voice: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
        voice_locale(voice),
        escape_xml(voice),
        escape_xml(text)
    )
}

/// Locale prefix of a voice name: `zh-CN-XiaoxiaoNeural` -> `zh-CN`.
fn voice_locale(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(second)) => &voice[..second],
        _ => "en-US",
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
