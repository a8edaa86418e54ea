use super::bucket::BucketError;
use super::claims::ClaimSet;

/// Per-request authorization state, stored in the request extensions.
///
/// Created by the claims layer with no bucket; the bucket layer sets the
/// active bucket once it is known to belong to the caller's groups.
#[derive(Debug, Clone)]
pub struct AuthContext {
    claims: ClaimSet,
    bucket: Option<String>,
}

impl AuthContext {
    pub fn new(claims: ClaimSet) -> Self {
        Self {
            claims,
            bucket: None,
        }
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// The authorized bucket, if authorization has run.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Make `bucket` the active bucket if one of the caller's groups names it
    /// exactly.
    pub fn authorize(&mut self, bucket: &str) -> Result<&str, BucketError> {
        if self.claims.is_empty() {
            return Err(BucketError::InvalidGroupsType);
        }

        let group = self
            .claims
            .find(bucket)
            .ok_or_else(|| BucketError::Forbidden(bucket.to_string()))?;
        Ok(self.bucket.insert(group.to_string()).as_str())
    }
}
