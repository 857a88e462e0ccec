/// Credential hashing and verification
///
/// Free functions over plain data; the cost factor comes from configuration
/// rather than any ambient lookup. bcrypt generates a unique salt per call.
use crate::error::{ApiError, ApiResult};

/// Lowest cost bcrypt accepts; used as the configuration floor and for
/// fast hashing in tests
pub const MIN_BCRYPT_COST: u32 = 4;

/// Hash a plaintext password. Hashing failure is fatal to the calling
/// operation and surfaces as an internal error.
pub fn hash_password(plaintext: &str, cost: u32) -> ApiResult<String> {
    bcrypt::hash(plaintext, cost)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored bcrypt digest
pub fn verify_password(plaintext: &str, hash: &str) -> ApiResult<bool> {
    bcrypt::verify(plaintext, hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))
}
