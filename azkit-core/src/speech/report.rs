use super::types::{CancellationReason, SynthesisResult};

/// Lines printed for a synthesis outcome.
pub fn describe(text: &str, result: &SynthesisResult) -> Vec<String> {
    match result {
        SynthesisResult::Completed(_) => {
            vec![format!("Speech synthesized for text [{text}]")]
        }
        SynthesisResult::Canceled(details) => {
            let mut lines = vec![format!("Speech synthesis canceled: {}", details.reason)];
            if details.reason == CancellationReason::Error {
                lines.push(format!("Error details: {}", details.error_details));
            }
            lines
        }
    }
}
