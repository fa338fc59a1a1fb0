//! Electronic sign-off of a finished document.
//!
//! The document is sealed with a SHA-256 digest and the signature is
//! recorded as `DOCUMENT_SIGN_OFF` under the signer's identity.

use std::{fs, path::Path};

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use evolv_contracts::{
    audit::{AuditAction, AuditEntry, ComplianceImpact},
    error::{EvolvError, EvolvResult},
};
use evolv_core::{Audited, DecisionRecorder};

pub const AGENT_NAME: &str = "SignOff";

/// A recorded signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignOffRecord {
    pub signature_id: Uuid,
    pub document: String,
    /// Lowercase hex SHA-256 of the signed bytes.
    pub document_sha256: String,
    pub signer: String,
    /// Meaning of signature, e.g. "Review and Approval".
    pub meaning: String,
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn document_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub struct SignOff {
    recorder: DecisionRecorder,
}

impl SignOff {
    pub fn new(recorder: DecisionRecorder) -> Self {
        Self { recorder }
    }

    /// Sign the file at `path`.
    ///
    /// Signer and meaning are checked before the file is read.
    pub fn sign_file(&self, path: &Path, signer: &str, meaning: &str) -> EvolvResult<Audited<SignOffRecord>> {
        let (signer, meaning) = check_signature(signer, meaning)?;
        let bytes = fs::read(path).map_err(|e| EvolvError::InvalidDocument {
            fields: vec!["document".to_string()],
            reason: format!("cannot read '{}': {e}", path.display()),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.sign_bytes(&name, &bytes, signer, meaning)
    }

    /// Sign an in-memory document.
    pub fn sign_bytes(
        &self,
        document: &str,
        bytes: &[u8],
        signer: &str,
        meaning: &str,
    ) -> EvolvResult<Audited<SignOffRecord>> {
        let (signer, meaning) = check_signature(signer, meaning)?;
        let record = SignOffRecord {
            signature_id: Uuid::new_v4(),
            document: document.to_string(),
            document_sha256: document_digest(bytes),
            signer: signer.to_string(),
            meaning: meaning.to_string(),
        };

        let logic = format!(
            "Document: {}; SHA-256: {}; Signer: {}; Meaning: {}; Signature: {}",
            record.document, record.document_sha256, record.signer, record.meaning, record.signature_id
        );
        let entry = AuditEntry::new(AGENT_NAME, AuditAction::DocumentSignOff, logic)
            .with_user(record.signer.clone())
            .with_impact(ComplianceImpact::ElectronicSignature);
        self.recorder.record(record, entry)
    }
}

fn check_signature<'a>(signer: &'a str, meaning: &'a str) -> EvolvResult<(&'a str, &'a str)> {
    let signer = signer.trim();
    let meaning = meaning.trim();
    let mut missing = Vec::new();
    if signer.is_empty() {
        missing.push("signer".to_string());
    }
    if meaning.is_empty() {
        missing.push("meaning".to_string());
    }
    if !missing.is_empty() {
        return Err(EvolvError::InvalidDocument {
            fields: missing,
            reason: "a signature requires a signer name and a meaning of signature".to_string(),
        });
    }
    Ok((signer, meaning))
}
