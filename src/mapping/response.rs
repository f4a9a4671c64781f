//! Parsing and allow-list validation of model responses.
//!
//! Model output is untrusted. Each completion must parse into
//! [`CapabilityResponse`] or the run fails; individual matches naming a
//! capability outside the taxonomy are dropped with a warning.

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::llm::RawCompletion;
use crate::mapping::types::{CapabilityMatch, CodeArtifact, Taxonomy};

/// The JSON object the model is instructed to return.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityResponse {
    pub matched_capabilities: Vec<ReportedCapability>,
}

/// One match as reported by the model, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedCapability {
    pub capability: String,
    pub description: String,
}

/// A reported match that named a capability outside the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedMatch {
    pub artifact_id: String,
    pub reported: ReportedCapability,
}

/// Output of [`ResponseValidator::validate`].
#[derive(Debug, Default)]
pub struct ValidatedMatches {
    /// Accepted matches, in artifact order then reported order.
    pub matches: Vec<CapabilityMatch>,
    pub rejected: Vec<RejectedMatch>,
}

/// Case-insensitive allow-list check over model responses.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    allowed: HashSet<String>,
}

impl ResponseValidator {
    pub fn new(taxonomy: &Taxonomy) -> Self {
        let allowed = taxonomy.names().map(str::to_lowercase).collect();
        Self { allowed }
    }

    pub fn is_allowed(&self, capability: &str) -> bool {
        self.allowed.contains(&capability.to_lowercase())
    }

    /// Validate completions against their artifacts. `completions[i]` must
    /// belong to `artifacts[i]`.
    pub fn validate(
        &self,
        artifacts: &[CodeArtifact],
        completions: &[RawCompletion],
    ) -> Result<ValidatedMatches, MappingError> {
        if artifacts.len() != completions.len() {
            return Err(MappingError::CompletionCountMismatch {
                expected: artifacts.len(),
                actual: completions.len(),
            });
        }

        let mut out = ValidatedMatches::default();

        for (artifact, completion) in artifacts.iter().zip(completions) {
            let response = parse_response(&artifact.id, &completion.content)?;

            for reported in response.matched_capabilities {
                if self.is_allowed(&reported.capability) {
                    out.matches.push(CapabilityMatch {
                        artifact_id: artifact.id.clone(),
                        capability: reported.capability,
                        description: reported.description,
                    });
                } else {
                    let content = serde_json::to_string(&reported).unwrap_or_default();
                    tracing::warn!(
                        artifact_id = %artifact.id,
                        content = %content,
                        "skipping business capability content, not in the provided business capabilities"
                    );
                    out.rejected.push(RejectedMatch {
                        artifact_id: artifact.id.clone(),
                        reported,
                    });
                }
            }
        }

        Ok(out)
    }
}

/// Parse one completion's content into a [`CapabilityResponse`].
///
/// Surrounding whitespace, a Markdown code fence and raw control characters
/// inside string values are tolerated. Anything else that is not the exact
/// expected shape is a [`MappingError::MalformedResponse`].
pub fn parse_response(artifact_id: &str, content: &str) -> Result<CapabilityResponse, MappingError> {
    let trimmed = content.trim();
    parse_lenient(trimmed)
        .or_else(|_| parse_lenient(strip_code_fence(trimmed)))
        .map_err(|e| MappingError::MalformedResponse {
            artifact_id: artifact_id.to_string(),
            reason: e.to_string(),
        })
}

fn parse_lenient(payload: &str) -> serde_json::Result<CapabilityResponse> {
    serde_json::from_str(&escape_control_chars(payload))
}

/// Return the body of the first ```` ``` ```` fence, minus an optional
/// `json` tag. The closing fence is the last one in `content`; it may sit on
/// the same line as the body.
fn strip_code_fence(content: &str) -> &str {
    let Some(open) = content.find("```") else {
        return content;
    };
    let mut body = &content[open + 3..];
    if body.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        body = &body[4..];
    }
    let body = match body.rfind("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim()
}

/// Escape control characters that appear raw inside JSON string literals.
/// Whitespace between tokens is left alone.
fn escape_control_chars(json: &str) -> Cow<'_, str> {
    if !json.bytes().any(|b| b < 0x20) {
        return Cow::Borrowed(json);
    }

    let mut out = String::with_capacity(json.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if !in_string {
            in_string = c == '"';
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
