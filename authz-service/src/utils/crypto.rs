//! Seam for the external field-encryption collaborator.
//!
//! Company and user contact fields are encrypted immediately before writes
//! and decrypted immediately after reads. The cipher owns its key material;
//! this crate never logs plaintext sensitive fields.

use service_core::error::AppError;

/// Field-level encryption interface implemented by the deployment.
pub trait FieldCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, AppError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, AppError>;
}
