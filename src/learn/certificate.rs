//! Certificate issuance, retrieval and verification.
//!
//! Issuance is idempotent per learner and course: an existing certificate is
//! returned instead of generating another one, and concurrent requests are
//! serialized so only one of them can reach `generate_certificate`.

use bytes::Bytes;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::backend::{BackendError, LearnBackend};
use super::completion::CourseCompletionEvaluator;
use super::error::LearnError;
use super::store::ProgressSnapshot;
use super::types::{Certificate, CertificateVerification, Course};

pub struct CertificateIssuer {
    backend: Arc<dyn LearnBackend>,
    issued: Mutex<HashMap<(Uuid, Uuid), Certificate>>,
}

impl CertificateIssuer {
    pub fn new(backend: Arc<dyn LearnBackend>) -> Self {
        Self {
            backend,
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub async fn ensure_certificate(
        &self,
        user_id: Uuid,
        course: &Course,
        snapshot: &ProgressSnapshot,
    ) -> Result<Certificate, LearnError> {
        if !CourseCompletionEvaluator::is_completed(course, snapshot) {
            return Err(LearnError::CourseNotComplete(course.id));
        }

        let mut issued = self.issued.lock().await;
        if let Some(existing) = issued.get(&(user_id, course.id)) {
            return Ok(existing.clone());
        }

        let existing = self
            .backend
            .get_course_certificate(user_id, course.id)
            .await?
            .into_iter()
            .filter(|c| c.course_id == course.id)
            .min_by_key(|c| c.issued_at);

        let certificate = match existing {
            Some(certificate) => certificate,
            None => {
                let certificate = self.backend.generate_certificate(user_id, course.id).await?;
                info!(
                    "Issued certificate {} for course {} to user {}",
                    certificate.certificate_number, course.id, user_id
                );
                certificate
            }
        };

        issued.insert((user_id, course.id), certificate.clone());
        Ok(certificate)
    }

    pub async fn download(&self, user_id: Uuid, certificate_id: Uuid) -> Result<Bytes, LearnError> {
        self.backend
            .download_certificate(user_id, certificate_id)
            .await
            .map_err(|e| match e {
                BackendError::NotFound(_) => {
                    LearnError::CertificateNotFound(certificate_id.to_string())
                }
                other => {
                    warn!("Download of certificate {} failed: {}", certificate_id, other);
                    LearnError::DownloadFailed(other.to_string())
                }
            })
    }

    pub async fn verify(&self, certificate_number: &str) -> Result<CertificateVerification, LearnError> {
        let number = certificate_number.trim();
        if number.is_empty() {
            return Err(LearnError::Validation(
                "certificate number is required".to_string(),
            ));
        }

        let verification = match self.backend.verify_certificate(number).await? {
            Some(certificate) => CertificateVerification {
                is_valid: true,
                certificate: Some(certificate),
                message: "Certificate is valid".to_string(),
            },
            None => CertificateVerification {
                is_valid: false,
                certificate: None,
                message: "Certificate not found".to_string(),
            },
        };
        Ok(verification)
    }
}
