//! Speech-to-text backends.

use rollcall_hw::Utterance;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SttError {
    #[error("speech service request failed: {0}")]
    Request(String),
    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("audio encoding failed: {0}")]
    Encode(String),
}

/// Converts one utterance to text. An empty string means nothing intelligible was heard.
pub trait SttBackend: Send + Sync {
    fn transcribe(&self, utterance: &Utterance) -> Result<String, SttError>;
}

/// OpenAI-compatible transcription API (`POST {base_url}/audio/transcriptions`).
#[derive(Debug, Clone)]
pub struct HttpStt {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl HttpStt {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SttError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SttError::Request(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'))
    }
}

impl SttBackend for HttpStt {
    fn transcribe(&self, utterance: &Utterance) -> Result<String, SttError> {
        if utterance.is_empty() {
            return Ok(String::new());
        }

        let wav = encode_wav(utterance)?;
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| SttError::Request(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| SttError::Request(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(SttError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = res
            .json()
            .map_err(|e| SttError::Request(format!("invalid response: {e}")))?;
        tracing::debug!(transcript = %parsed.text, "transcription received");
        Ok(parsed.text.trim().to_string())
    }
}

/// Encode mono f32 PCM as 16-bit WAV.
pub fn encode_wav(utterance: &Utterance) -> Result<Vec<u8>, SttError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: utterance.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)
            .map_err(|e| SttError::Encode(e.to_string()))?;
        for &s in &utterance.samples {
            let sample = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer
                .write_sample(sample)
                .map_err(|e| SttError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| SttError::Encode(e.to_string()))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_header_and_length() {
        let utterance = Utterance { samples: vec![0.0, 1.0, -1.0], sample_rate: 16000 };
        let wav = encode_wav(&utterance).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 3 samples * 2 bytes
        assert_eq!(wav.len(), 44 + 6);

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let stt = HttpStt::new("http://localhost:9000/v1/", "k", "whisper-1", Duration::from_secs(1)).unwrap();
        assert_eq!(stt.endpoint(), "http://localhost:9000/v1/audio/transcriptions");
    }

    #[test]
    fn test_empty_utterance_skips_request() {
        // Unroutable base URL: a request would fail, so Ok proves none was made.
        let stt = HttpStt::new("http://127.0.0.1:9", "k", "m", Duration::from_millis(50)).unwrap();
        assert_eq!(stt.transcribe(&Utterance::default()).unwrap(), "");
    }
}
