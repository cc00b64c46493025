//! Roll-number extraction and the tagged speech result.

use crate::stt::{SttBackend, SttError};
use rollcall_hw::Utterance;

/// Outcome of one spoken roll-call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// A transcript was obtained; its last word is the roll number.
    Recognized { transcript: String, roll_number: String },
    /// Nothing intelligible was heard.
    NoSpeech,
    /// The transcription service could not be reached or refused the request.
    ServiceError(String),
}

impl SpeechOutcome {
    /// Short machine-readable tag, used in dashboard notices.
    pub fn tag(&self) -> &'static str {
        match self {
            SpeechOutcome::Recognized { .. } => "recognized",
            SpeechOutcome::NoSpeech => "no-speech",
            SpeechOutcome::ServiceError(_) => "service-error",
        }
    }
}

/// The last whitespace-delimited token of a transcript.
pub fn extract_roll_number(transcript: &str) -> Option<&str> {
    transcript.split_whitespace().last()
}

/// Transcribe an utterance and pull out the roll number.
pub fn recognize_roll(stt: &dyn SttBackend, utterance: &Utterance) -> SpeechOutcome {
    match stt.transcribe(utterance) {
        Ok(transcript) => match extract_roll_number(&transcript).map(str::to_string) {
            Some(roll_number) => SpeechOutcome::Recognized {
                transcript,
                roll_number,
            },
            None => SpeechOutcome::NoSpeech,
        },
        Err(e) => {
            tracing::warn!(error = %e, "speech transcription failed");
            SpeechOutcome::ServiceError(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStt(Result<String, String>);

    impl SttBackend for FixedStt {
        fn transcribe(&self, _: &Utterance) -> Result<String, SttError> {
            self.0.clone().map_err(SttError::Request)
        }
    }

    #[test]
    fn test_extract_last_token() {
        assert_eq!(extract_roll_number("roll number 42"), Some("42"));
        assert_eq!(extract_roll_number("  17  "), Some("17"));
        assert_eq!(extract_roll_number("   "), None);
        assert_eq!(extract_roll_number(""), None);
    }

    #[test]
    fn test_recognized() {
        let outcome = recognize_roll(&FixedStt(Ok("my roll number is A12".into())), &Utterance::default());
        assert_eq!(
            outcome,
            SpeechOutcome::Recognized {
                transcript: "my roll number is A12".into(),
                roll_number: "A12".into(),
            }
        );
        assert_eq!(outcome.tag(), "recognized");
    }

    #[test]
    fn test_empty_transcript_is_no_speech() {
        let outcome = recognize_roll(&FixedStt(Ok(String::new())), &Utterance::default());
        assert_eq!(outcome, SpeechOutcome::NoSpeech);
    }

    #[test]
    fn test_service_failure_is_distinct() {
        let outcome = recognize_roll(&FixedStt(Err("connection refused".into())), &Utterance::default());
        assert!(matches!(outcome, SpeechOutcome::ServiceError(ref msg) if msg.contains("connection refused")));
        assert_eq!(outcome.tag(), "service-error");
    }
}
