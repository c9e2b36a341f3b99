use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// Wire representation is the snake_case string on both the serde and
/// the `as_str`/`FromStr` paths, so a value parsed off the API
/// round-trips unchanged.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(DocumentType {
    Identification => "identification",
    Contract => "contract",
    KycForm => "kyc_form",
    FinancialStatement => "financial_statement",
    ProofOfAddress => "proof_of_address",
    Other => "other",
});

str_enum!(DocumentState {
    Draft => "draft",
    PendingReview => "pending_review",
    Published => "published",
    Rejected => "rejected",
});

str_enum!(ClientType {
    NaturalPerson => "natural_person",
    LegalPerson => "legal_person",
});

str_enum!(RiskLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(FlowState {
    InProgress => "in_progress",
    AwaitingSupervisor => "awaiting_supervisor",
    Approved => "approved",
    Returned => "returned",
});

str_enum!(RejectReason {
    InsufficientQuality => "insufficient_quality",
    IncompleteDocument => "incomplete_document",
    InconsistentInformation => "inconsistent_information",
    ExpiredDocument => "expired_document",
    WrongDocumentType => "wrong_document_type",
    Other => "other",
});

str_enum!(Urgency {
    Low => "low",
    Normal => "normal",
    High => "high",
    Critical => "critical",
});
