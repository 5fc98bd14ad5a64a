use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{BackendError, ValidationError};

/// The closed set of document types an employee can submit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    IdProof,
    MedicalCertificate,
    TrainingCertificate,
    SafetyTraining,
    Other,
}

/// Categories every employee must have approved to be fully compliant.
pub const REQUIRED_CATEGORIES: [DocumentCategory; 4] = [
    DocumentCategory::IdProof,
    DocumentCategory::MedicalCertificate,
    DocumentCategory::TrainingCertificate,
    DocumentCategory::SafetyTraining,
];

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 5] = [
        DocumentCategory::IdProof,
        DocumentCategory::MedicalCertificate,
        DocumentCategory::TrainingCertificate,
        DocumentCategory::SafetyTraining,
        DocumentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::IdProof => "id_proof",
            DocumentCategory::MedicalCertificate => "medical_certificate",
            DocumentCategory::TrainingCertificate => "training_certificate",
            DocumentCategory::SafetyTraining => "safety_training",
            DocumentCategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::IdProof => "ID Proof",
            DocumentCategory::MedicalCertificate => "Medical Certificate",
            DocumentCategory::TrainingCertificate => "Training Certificate",
            DocumentCategory::SafetyTraining => "Safety Training Certificate",
            DocumentCategory::Other => "Other",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// Review state of a single document, and the effective state of a category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pending,
    Approved,
    Rejected,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Pending => "pending",
            ComplianceStatus::Approved => "approved",
            ComplianceStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ComplianceStatus::Pending),
            "approved" => Ok(ComplianceStatus::Approved),
            "rejected" => Ok(ComplianceStatus::Rejected),
            other => Err(format!("unknown compliance status '{other}'")),
        }
    }
}

/// An uploaded compliance document and its review state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub category: DocumentCategory,
    pub status: ComplianceStatus,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub file_size_bytes: i64,
    pub mime_type: String,
}

/// Row shape of the `documents` table; enums are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub category: String,
    pub status: String,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub file_size_bytes: i64,
    pub mime_type: String,
}

impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = BackendError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse::<DocumentCategory>()
            .map_err(|e| BackendError::Unknown(e.to_string()))?;
        let status = row
            .status
            .parse::<ComplianceStatus>()
            .map_err(BackendError::Unknown)?;
        Ok(DocumentRecord {
            id: row.id,
            owner_id: row.owner_id,
            file_name: row.file_name,
            file_url: row.file_url,
            category,
            status,
            description: row.description,
            uploaded_at: row.uploaded_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            file_size_bytes: row.file_size_bytes,
            mime_type: row.mime_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_accepts_known_values() {
        for category in DocumentCategory::ALL {
            assert_eq!(category.as_str().parse::<DocumentCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        let err = "passport".parse::<DocumentCategory>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownCategory("passport".to_string()));
    }

    #[test]
    fn test_other_is_not_required() {
        assert!(!REQUIRED_CATEGORIES.contains(&DocumentCategory::Other));
        assert_eq!(REQUIRED_CATEGORIES.len(), 4);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentCategory::MedicalCertificate).unwrap();
        assert_eq!(json, "\"medical_certificate\"");
    }

    #[test]
    fn test_row_with_bad_status_is_rejected() {
        let row = DocumentRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            file_name: "id.pdf".to_string(),
            file_url: "https://files/id.pdf".to_string(),
            category: "id_proof".to_string(),
            status: "archived".to_string(),
            description: None,
            uploaded_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            file_size_bytes: 10,
            mime_type: "application/pdf".to_string(),
        };
        assert!(DocumentRecord::try_from(row).is_err());
    }
}
