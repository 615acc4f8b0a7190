//! Ensemble transcript assembly and truncation.
//!
//! Up to three per-track transcripts are fused into one labelled document
//! for the language model. The labels are part of the wire format the
//! prompts were tuned against and must not change.
use serde::Deserialize;

/// Label above the managed transcription text in a dual-track document.
pub const AWS_LABEL: &str = "[AWS Transcribe 转录]";

/// Label above the Whisper text in a dual-track document.
pub const WHISPER_LABEL: &str = "[Whisper 转录]";

/// Label above the speaker-tagged FunASR block.
pub const FUNASR_LABEL: &str = "[FunASR 转录（含说话人标签）]";

/// Per-side character budget when both machine labels are present.
const DUAL_SIDE_LIMIT: usize = 60_000;

/// Character budget for the FunASR block after its label.
const FUNASR_LIMIT: usize = 60_000;

/// Character budget for a single-source transcript.
const SINGLE_LIMIT: usize = 120_000;

/// Hard cap on the final composed transcript, the language model port's
/// tolerance bound.
const GLOBAL_LIMIT: usize = 200_000;

#[derive(Deserialize)]
struct TranscribeOutput {
    results: TranscribeResults,
}

#[derive(Deserialize)]
struct TranscribeResults {
    transcripts: Vec<TranscribeText>,
}

#[derive(Deserialize)]
struct TranscribeText {
    transcript: String,
}

#[derive(Deserialize)]
struct SpeakerPayload {
    #[serde(default)]
    segments: Vec<SpeakerSegment>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct SpeakerSegment {
    #[serde(default)]
    speaker: String,
    #[serde(default)]
    text: String,
}

/// Extract plain text from a fetched transcript. The managed service wraps
/// its text in `{results:{transcripts:[{transcript}]}}`; anything else is
/// treated as text as-is.
pub fn extract_plain_text(raw: &[u8]) -> String {
    if let Ok(output) = serde_json::from_slice::<TranscribeOutput>(raw) {
        if let Some(first) = output.results.transcripts.into_iter().next() {
            return first.transcript;
        }
    }
    String::from_utf8_lossy(raw).into_owned()
}

/// Render a FunASR payload as one `[<speaker>] <text>` line per speaker
/// turn, coalescing adjacent segments with an identical speaker tag.
/// Falls back to the payload's plain `text` when it carries no segments.
pub fn render_speaker_lines(raw: &[u8]) -> Option<String> {
    let payload: SpeakerPayload = serde_json::from_slice(raw).ok()?;

    if payload.segments.is_empty() {
        return payload.text.filter(|t| !t.is_empty());
    }

    let mut lines: Vec<(String, String)> = Vec::new();
    for segment in payload.segments {
        match lines.last_mut() {
            Some((speaker, text)) if *speaker == segment.speaker => {
                text.push_str(&segment.text);
            }
            _ => lines.push((segment.speaker, segment.text)),
        }
    }

    let rendered = lines
        .iter()
        .map(|(speaker, text)| format!("[{speaker}] {text}"))
        .collect::<Vec<_>>()
        .join("\n");
    Some(rendered)
}

/// Combine the machine-track texts. Both present get their labels; a single
/// survivor is used bare.
pub fn compose_machine_part(aws: Option<String>, whisper: Option<String>) -> Option<String> {
    match (aws, whisper) {
        (Some(aws), Some(whisper)) => Some(format!(
            "{AWS_LABEL}\n{aws}\n\n{WHISPER_LABEL}\n{whisper}"
        )),
        (Some(aws), None) => Some(aws),
        (None, Some(whisper)) => Some(whisper),
        (None, None) => None,
    }
}

/// Label the speaker-tagged block, bounding the body first.
pub fn compose_speaker_part(rendered: &str) -> String {
    format!("{FUNASR_LABEL}\n{}", take_chars(rendered, FUNASR_LIMIT))
}

/// Bound the composed transcript. Three modes: a speaker-only document trims
/// the block after its label, a dual-track document trims each side of the
/// Whisper label, anything else trims the whole string. A final global cap
/// bounds the pathological case where every source is long.
pub fn truncate_transcript(text: &str) -> String {
    let bounded = if text.contains(AWS_LABEL) && text.contains(WHISPER_LABEL) {
        match text.split_once(WHISPER_LABEL) {
            Some((left, right)) => format!(
                "{}{WHISPER_LABEL}{}",
                take_chars(left, DUAL_SIDE_LIMIT),
                take_chars(right, DUAL_SIDE_LIMIT)
            ),
            None => take_chars(text, SINGLE_LIMIT).to_string(),
        }
    } else if let Some(body) = text.strip_prefix(FUNASR_LABEL) {
        let body = body.strip_prefix('\n').unwrap_or(body);
        format!("{FUNASR_LABEL}\n{}", take_chars(body, FUNASR_LIMIT))
    } else {
        take_chars(text, SINGLE_LIMIT).to_string()
    };

    take_chars(&bounded, GLOBAL_LIMIT).to_string()
}

/// First `limit` characters of `s`, by character count rather than bytes.
fn take_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
