use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serde wire name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
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

str_enum!(FindingStatus {
    Normal => "NORMAL",
    Monitor => "MONITOR",
    Urgent => "URGENT",
});

impl FindingStatus {
    /// Tolerant mapping for model-written status strings.
    /// Case and surrounding whitespace are ignored; anything unknown is
    /// treated as MONITOR so it still lands in a tally.
    pub fn from_model_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Self::Normal,
            "URGENT" => Self::Urgent,
            _ => Self::Monitor,
        }
    }
}

str_enum!(QuestionPriority {
    Urgent => "URGENT",
    Important => "IMPORTANT",
    Followup => "FOLLOWUP",
});

impl QuestionPriority {
    pub fn from_model_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "URGENT" => Self::Urgent,
            "IMPORTANT" => Self::Important,
            _ => Self::Followup,
        }
    }
}

str_enum!(DocumentStatus {
    Uploaded => "uploaded",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(TrendDirection {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
});

str_enum!(RecoveryTier {
    Strict => "strict",
    Repaired => "repaired",
    Salvaged => "salvaged",
});
