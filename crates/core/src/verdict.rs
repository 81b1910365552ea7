//! Submission verdicts
//!
//! Internal verdict codes are a compressed view of the Judge0 status table:
//! Judge0 ids 1-6 map straight through, every runtime error flavour (7-14)
//! collapses into `RuntimeError` and the executor's internal error (15) becomes
//! `JudgementFailed`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
    JudgementFailed,
}

impl Verdict {
    pub const ALL: [Verdict; 8] = [
        Verdict::InQueue,
        Verdict::Processing,
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::TimeLimitExceeded,
        Verdict::CompilationError,
        Verdict::RuntimeError,
        Verdict::JudgementFailed,
    ];

    pub fn code(self) -> i16 {
        match self {
            Verdict::InQueue => 1,
            Verdict::Processing => 2,
            Verdict::Accepted => 3,
            Verdict::WrongAnswer => 4,
            Verdict::TimeLimitExceeded => 5,
            Verdict::CompilationError => 6,
            Verdict::RuntimeError => 7,
            Verdict::JudgementFailed => 8,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.code() == code)
    }

    /// Map a Judge0 status id onto an internal verdict.
    pub fn from_judge_status(status_id: i64) -> Self {
        match status_id {
            7..=14 => Verdict::RuntimeError,
            15 => Verdict::JudgementFailed,
            id => i16::try_from(id)
                .ok()
                .and_then(Self::from_code)
                .unwrap_or(Verdict::JudgementFailed),
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Verdict::InQueue => "In Queue",
            Verdict::Processing => "Processing",
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::CompilationError => "Compilation Error",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::JudgementFailed => "Judgement Failed",
        }
    }

    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display())
    }
}

// Verdicts travel over the wire as their integer code.
impl Serialize for Verdict {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.code())
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i16::deserialize(deserializer)?;
        Verdict::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown verdict code {}", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_status_passthrough() {
        assert_eq!(Verdict::from_judge_status(3), Verdict::Accepted);
        assert_eq!(Verdict::from_judge_status(4), Verdict::WrongAnswer);
        assert_eq!(Verdict::from_judge_status(5), Verdict::TimeLimitExceeded);
        assert_eq!(Verdict::from_judge_status(6), Verdict::CompilationError);
    }

    #[test]
    fn test_judge_runtime_errors_collapse() {
        for id in 7..=14 {
            assert_eq!(Verdict::from_judge_status(id), Verdict::RuntimeError);
        }
        assert_eq!(Verdict::from_judge_status(15), Verdict::JudgementFailed);
    }

    #[test]
    fn test_unknown_status_is_judgement_failed() {
        assert_eq!(Verdict::from_judge_status(0), Verdict::JudgementFailed);
        assert_eq!(Verdict::from_judge_status(42), Verdict::JudgementFailed);
        assert_eq!(Verdict::from_judge_status(-1), Verdict::JudgementFailed);
    }

    #[test]
    fn test_serializes_as_code() {
        let json = serde_json::to_string(&Verdict::Accepted).unwrap();
        assert_eq!(json, "3");
        let back: Verdict = serde_json::from_str("7").unwrap();
        assert_eq!(back, Verdict::RuntimeError);
        assert!(serde_json::from_str::<Verdict>("9").is_err());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(Verdict::InQueue.to_string(), "In Queue");
        assert_eq!(Verdict::JudgementFailed.display(), "Judgement Failed");
    }
}
