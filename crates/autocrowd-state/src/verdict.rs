//! # Verification Verdicts
//!
//! A verdict is the output of an external verification collaborator (an AI
//! reviewer, a human panel). How it is computed is not this crate's
//! concern; it arrives as an already-resolved value and is applied to a
//! `Submitted` milestone as a pure input.

use autocrowd_core::{EvidenceRef, ValidationError};
use serde::{Deserialize, Serialize};

/// The collaborator's decision about a milestone submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Evidence demonstrates completion; release funds.
    Approved,
    /// Evidence does not demonstrate completion.
    Rejected,
    /// Inconclusive; backers decide by vote.
    Uncertain,
}

impl Verdict {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Uncertain => "uncertain",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict together with the collaborator's confidence and the evidence
/// it assessed.
///
/// The confidence is recorded for audit; it does not change which
/// transition the verdict triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVerdict")]
pub struct VerificationVerdict {
    verdict: Verdict,
    confidence: f64,
    evidence: EvidenceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
}

impl VerificationVerdict {
    /// Build a verdict, rejecting confidences outside `[0.0, 1.0]` (and NaN).
    pub fn new(
        verdict: Verdict,
        confidence: f64,
        evidence: EvidenceRef,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::InvalidConfidence(confidence));
        }
        Ok(Self {
            verdict,
            confidence,
            evidence,
            reasoning: None,
        })
    }

    /// Attach the collaborator's free-text reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// The decision.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Confidence in `[0.0, 1.0]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// The evidence the collaborator assessed.
    pub fn evidence(&self) -> &EvidenceRef {
        &self.evidence
    }

    /// Free-text reasoning, if provided.
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }
}

/// Wire shape of [`VerificationVerdict`], validated on the way in.
#[derive(Deserialize)]
struct RawVerdict {
    verdict: Verdict,
    confidence: f64,
    evidence: EvidenceRef,
    #[serde(default)]
    reasoning: Option<String>,
}

impl TryFrom<RawVerdict> for VerificationVerdict {
    type Error = ValidationError;

    fn try_from(raw: RawVerdict) -> Result<Self, Self::Error> {
        let verdict = Self::new(raw.verdict, raw.confidence, raw.evidence)?;
        Ok(match raw.reasoning {
            Some(reasoning) => verdict.with_reasoning(reasoning),
            None => verdict,
        })
    }
}
