use crate::errors::ValidationError;

/// 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// `image/jpg` is not a registered type but some browsers send it for JPEGs.
pub const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png", "image/jpg"];

/// Checks an upload's size, then its MIME type.
pub fn validate(size_bytes: u64, mime_type: &str) -> Result<(), ValidationError> {
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size_bytes,
            limit_bytes: MAX_UPLOAD_BYTES,
        });
    }
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(ValidationError::UnsupportedType(mime_type.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_pdf() {
        assert!(matches!(
            validate(11_000_000, "application/pdf"),
            Err(ValidationError::FileTooLarge { size_bytes: 11_000_000, .. })
        ));
    }

    #[test]
    fn test_zip_is_unsupported() {
        assert_eq!(
            validate(1000, "application/zip"),
            Err(ValidationError::UnsupportedType("application/zip".to_string()))
        );
    }

    #[test]
    fn test_jpg_alias_is_accepted() {
        assert!(validate(1000, "image/jpg").is_ok());
    }

    #[test]
    fn test_limit_is_inclusive() {
        assert!(validate(MAX_UPLOAD_BYTES, "image/png").is_ok());
        assert!(validate(MAX_UPLOAD_BYTES + 1, "image/png").is_err());
    }

    #[test]
    fn test_size_is_checked_before_type() {
        assert!(matches!(
            validate(MAX_UPLOAD_BYTES + 1, "application/zip"),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_mime_match_is_exact() {
        assert!(validate(10, "Application/PDF").is_err());
        assert!(validate(10, "").is_err());
    }
}
