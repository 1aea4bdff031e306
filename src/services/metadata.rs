//! Credential metadata as pinned to IPFS and mirrored in `credentials.metadata`.
//!
//! Field names follow the NFT metadata convention (`name`, `description`,
//! `image`, `attributes`) with the academic payload under `credentialData`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::abi::keccak256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub name: String,
    pub marks: f64,
    pub max_marks: f64,
}

impl SubjectMark {
    pub fn percentage(&self) -> f64 {
        self.marks * 100.0 / self.max_marks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialData {
    pub student_name: String,
    pub student_wallet: String,
    pub institution_name: String,
    pub institution_wallet: String,
    pub credential_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub issue_date: NaiveDate,
    pub document_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<SubjectMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
    pub credential_data: CredentialData,
}

impl CredentialMetadata {
    /// Builds the metadata document; `document_uri` is the uploaded file.
    pub fn build(data: CredentialData, description: Option<String>) -> Self {
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{} issued by {} to {}",
                    data.title, data.institution_name, data.student_name
                )
            });

        let mut attributes = vec![
            Attribute {
                trait_type: "Credential Type".to_string(),
                value: data.credential_type.clone(),
            },
            Attribute {
                trait_type: "Institution".to_string(),
                value: data.institution_name.clone(),
            },
            Attribute {
                trait_type: "Issue Date".to_string(),
                value: data.issue_date.format("%Y-%m-%d").to_string(),
            },
        ];
        if let Some(field) = &data.field_of_study {
            attributes.push(Attribute {
                trait_type: "Field of Study".to_string(),
                value: field.clone(),
            });
        }
        if let Some(grade) = &data.grade {
            attributes.push(Attribute {
                trait_type: "Grade".to_string(),
                value: grade.clone(),
            });
        }

        Self {
            name: format!("{} - {}", data.title, data.student_name),
            description,
            image: data.document_uri.clone(),
            attributes,
            credential_data: data,
        }
    }

    /// Keccak-256 over the serialized metadata; the on-chain fingerprint.
    pub fn content_hash(&self) -> Result<[u8; 32], serde_json::Error> {
        Ok(keccak256(&serde_json::to_vec(self)?))
    }

    pub fn average_percentage(&self) -> Option<f64> {
        average_percentage(&self.credential_data.subjects)
    }
}

/// Mean of the per-subject percentages, `None` without subjects.
pub fn average_percentage(subjects: &[SubjectMark]) -> Option<f64> {
    if subjects.is_empty() {
        return None;
    }
    let total: f64 = subjects.iter().map(SubjectMark::percentage).sum();
    Some(total / subjects.len() as f64)
}

pub fn validate_subjects(subjects: &[SubjectMark]) -> Result<(), String> {
    for subject in subjects {
        if subject.name.trim().is_empty() {
            return Err("Subject name is required".to_string());
        }
        if !subject.max_marks.is_finite() || subject.max_marks <= 0.0 {
            return Err(format!("{}: maximum marks must be positive", subject.name));
        }
        if !subject.marks.is_finite() || subject.marks < 0.0 || subject.marks > subject.max_marks {
            return Err(format!(
                "{}: marks must be between 0 and {}",
                subject.name, subject.max_marks
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(name: &str, marks: f64) -> SubjectMark {
        SubjectMark {
            name: name.to_string(),
            marks,
            max_marks: 100.0,
        }
    }

    fn data(subjects: Vec<SubjectMark>) -> CredentialData {
        CredentialData {
            student_name: "Ada Lovelace".to_string(),
            student_wallet: "0xAbC0000000000000000000000000000000000123".to_string(),
            institution_name: "Analytical University".to_string(),
            institution_wallet: "0x1111111111111111111111111111111111111111".to_string(),
            credential_type: "Degree".to_string(),
            title: "B.Sc. Computer Science".to_string(),
            field_of_study: Some("Computer Science".to_string()),
            grade: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            document_uri: "ipfs://bafydoc".to_string(),
            subjects,
        }
    }

    #[test]
    fn metadata_layout() {
        let metadata = CredentialMetadata::build(
            data(vec![subject("Math", 85.0), subject("Physics", 78.0)]),
            None,
        );
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["name"], "B.Sc. Computer Science - Ada Lovelace");
        assert_eq!(json["image"], "ipfs://bafydoc");
        assert_eq!(json["credentialData"]["title"], "B.Sc. Computer Science");
        assert_eq!(json["credentialData"]["issueDate"], "2024-06-30");
        assert_eq!(json["credentialData"]["subjects"].as_array().unwrap().len(), 2);
        assert_eq!(json["credentialData"]["subjects"][0]["maxMarks"], 100.0);
        assert!(json["credentialData"].get("grade").is_none());
        assert_eq!(json["attributes"][3]["trait_type"], "Field of Study");
    }

    #[test]
    fn average_of_two_subjects() {
        let metadata = CredentialMetadata::build(
            data(vec![subject("Math", 85.0), subject("Physics", 78.0)]),
            None,
        );
        assert_eq!(metadata.average_percentage(), Some(81.5));
    }

    #[test]
    fn average_uses_each_subject_scale() {
        let subjects = vec![
            SubjectMark {
                name: "Lab".to_string(),
                marks: 45.0,
                max_marks: 50.0,
            },
            subject("Theory", 70.0),
        ];
        assert_eq!(average_percentage(&subjects), Some(80.0));
        assert_eq!(average_percentage(&[]), None);
    }

    #[test]
    fn subjects_are_omitted_when_empty() {
        let json = serde_json::to_value(CredentialMetadata::build(data(vec![]), None)).unwrap();
        assert!(json["credentialData"].get("subjects").is_none());

        let parsed: CredentialMetadata = serde_json::from_value(json).unwrap();
        assert!(parsed.credential_data.subjects.is_empty());
    }

    #[test]
    fn content_hash_tracks_content() {
        let a = CredentialMetadata::build(data(vec![subject("Math", 85.0)]), None);
        let mut b = a.clone();
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());

        b.credential_data.subjects[0].marks = 86.0;
        assert_ne!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }

    #[test]
    fn subject_validation() {
        assert!(validate_subjects(&[subject("Math", 85.0)]).is_ok());
        assert!(validate_subjects(&[subject("Math", 101.0)]).is_err());
        assert!(validate_subjects(&[subject("Math", -1.0)]).is_err());
        assert!(validate_subjects(&[subject(" ", 50.0)]).is_err());
        assert!(validate_subjects(&[SubjectMark {
            name: "Math".to_string(),
            marks: 0.0,
            max_marks: 0.0,
        }])
        .is_err());
    }
}
