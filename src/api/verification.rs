use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::state::AppState;
use crate::error::{AppError, Result};
use crate::services::{
    qr_generator,
    verifier::{extract_token_id_from_qr, CredentialDetails, VerificationOutcome},
};

#[derive(Debug, Deserialize)]
pub struct QrVerifyRequest {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct QrImageParams {
    pub format: Option<String>,
}

struct SubjectRow {
    name: String,
    marks: String,
    percentage: String,
}

#[derive(Template)]
#[template(path = "verify/result.html")]
struct VerifyPageTemplate {
    token_id: String,
    status: &'static str,
    title: String,
    student_name: String,
    student_wallet: String,
    institution_name: String,
    issuer_wallet: String,
    credential_type: String,
    issue_date: String,
    revoked_at: Option<String>,
    document_url: String,
    metadata_url: String,
    transaction_hash: String,
    subjects: Vec<SubjectRow>,
    average: Option<String>,
    qr_data_url: Option<String>,
    metadata_mismatch: bool,
}

impl VerifyPageTemplate {
    fn not_found(token_id: String) -> Self {
        Self {
            token_id,
            status: "not_found",
            title: String::new(),
            student_name: String::new(),
            student_wallet: String::new(),
            institution_name: String::new(),
            issuer_wallet: String::new(),
            credential_type: String::new(),
            issue_date: String::new(),
            revoked_at: None,
            document_url: String::new(),
            metadata_url: String::new(),
            transaction_hash: String::new(),
            subjects: Vec::new(),
            average: None,
            qr_data_url: None,
            metadata_mismatch: false,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/verify/qr", post(verify_qr))
        .route("/api/verify/:token_id", get(verify_token))
        .route("/api/verify/:token_id/qr", get(verification_qr))
        .route("/verify/:token_id", get(verify_page))
}

async fn verify_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Result<Json<VerificationOutcome>> {
    Ok(Json(state.verifier.verify_by_token_id(&token_id).await?))
}

async fn verify_qr(
    State(state): State<AppState>,
    Json(request): Json<QrVerifyRequest>,
) -> Result<Json<VerificationOutcome>> {
    Ok(Json(state.verifier.verify_qr_payload(&request.payload).await?))
}

/// QR code image encoding the public verification URL
async fn verification_qr(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    Query(params): Query<QrImageParams>,
) -> Result<Response> {
    let token_id = extract_token_id_from_qr(&token_id)
        .ok_or_else(|| AppError::Validation("Invalid token id".to_string()))?;
    let url = state.config.verification_url(&token_id);

    match params.format.as_deref().unwrap_or("svg") {
        "svg" => {
            let svg = qr_generator::generate_qr_svg(&url).map_err(anyhow::Error::from)?;
            Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
        }
        "png" => {
            let png = qr_generator::generate_qr_png(&url).map_err(anyhow::Error::from)?;
            Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
        }
        other => Err(AppError::Validation(format!(
            "Unsupported QR format '{other}', expected svg or png"
        ))),
    }
}

/// Public verification page
async fn verify_page(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Result<VerifyPageTemplate> {
    let outcome = state.verifier.verify_by_token_id(&token_id).await?;
    let status = outcome.status();

    let (credential, details, revoked_at) = match outcome {
        VerificationOutcome::NotFound { token_id } => {
            return Ok(VerifyPageTemplate::not_found(token_id))
        }
        VerificationOutcome::Valid {
            credential,
            details,
        } => (credential, details, None),
        VerificationOutcome::Revoked {
            credential,
            details,
            revoked_at,
        } => (
            credential,
            details,
            Some(
                revoked_at
                    .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "pending confirmation".to_string()),
            ),
        ),
    };

    let qr_data_url =
        match qr_generator::generate_qr_data_url(&state.config.verification_url(&credential.token_id)) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to render verification QR code");
                None
            }
        };

    let CredentialDetails {
        metadata,
        average_percentage,
        document_url,
        metadata_url,
        metadata_matches_chain,
    } = details;

    let mut page = VerifyPageTemplate {
        token_id: credential.token_id,
        status,
        title: String::new(),
        student_name: String::new(),
        student_wallet: credential.student_wallet_address,
        institution_name: String::new(),
        issuer_wallet: credential.issuer_wallet_address,
        credential_type: String::new(),
        issue_date: credential.issued_at.format("%Y-%m-%d").to_string(),
        revoked_at,
        document_url,
        metadata_url,
        transaction_hash: credential.blockchain_hash,
        subjects: Vec::new(),
        average: average_percentage.map(|avg| format!("{avg:.1}%")),
        qr_data_url,
        metadata_mismatch: metadata_matches_chain == Some(false),
    };

    if let Some(metadata) = metadata {
        let data = metadata.credential_data;
        page.title = data.title;
        page.student_name = data.student_name;
        page.institution_name = data.institution_name;
        page.credential_type = data.credential_type;
        page.issue_date = data.issue_date.format("%Y-%m-%d").to_string();
        page.subjects = data
            .subjects
            .iter()
            .map(|s| SubjectRow {
                name: s.name.clone(),
                marks: format!("{} / {}", s.marks, s.max_marks),
                percentage: format!("{:.1}%", s.percentage()),
            })
            .collect();
    }

    Ok(page)
}
