// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError variants, Display formatting, kinds, From impls
// ═══════════════════════════════════════════════════════════════════

use portfolio_tracker_core::errors::{CoreError, ErrorKind};

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn not_found() {
        let err = CoreError::NotFound {
            entity: "Fund".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "Fund not found: abc");
    }

    #[test]
    fn not_found_helper() {
        let err = CoreError::not_found("Portfolio", 42);
        assert_eq!(err.to_string(), "Portfolio not found: 42");
    }

    #[test]
    fn invalid_state() {
        let err = CoreError::InvalidState("cannot sell".into());
        assert_eq!(err.to_string(), "Invalid state: cannot sell");
    }

    #[test]
    fn validation_error() {
        let err = CoreError::ValidationError("shares must be positive".into());
        assert_eq!(err.to_string(), "Validation failed: shares must be positive");
    }

    #[test]
    fn external_source_failure() {
        let err = CoreError::ExternalSourceFailure {
            provider: "Yahoo Finance".into(),
            message: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "Quote source failure (Yahoo Finance): timeout"
        );
    }

    #[test]
    fn partial_failure() {
        let err = CoreError::PartialFailure { failed: 1, total: 3 };
        assert_eq!(
            err.to_string(),
            "Batch partially failed: 1 of 3 items failed"
        );
    }

    #[test]
    fn storage() {
        let err = CoreError::Storage("lock poisoned".into());
        assert_eq!(err.to_string(), "Storage error: lock poisoned");
    }

    #[test]
    fn invalid_file_format() {
        let err = CoreError::InvalidFileFormat("bad header".into());
        assert_eq!(err.to_string(), "Invalid file format: bad header");
    }

    #[test]
    fn unsupported_version() {
        let err = CoreError::UnsupportedVersion(99);
        assert_eq!(err.to_string(), "Unsupported file version: 99");
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}

// ── Kinds & retryability ────────────────────────────────────────────

mod kinds {
    use super::*;

    #[test]
    fn business_errors_map_to_their_kind() {
        assert_eq!(CoreError::not_found("Fund", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InvalidState("x".into()).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            CoreError::ValidationError("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CoreError::PartialFailure { failed: 1, total: 2 }.kind(),
            ErrorKind::PartialFailure
        );
    }

    #[test]
    fn network_counts_as_external_source_failure() {
        assert_eq!(
            CoreError::Network("x".into()).kind(),
            ErrorKind::ExternalSourceFailure
        );
    }

    #[test]
    fn snapshot_errors_are_storage() {
        for err in [
            CoreError::InvalidFileFormat("x".into()),
            CoreError::UnsupportedVersion(7),
            CoreError::Serialization("x".into()),
            CoreError::Deserialization("x".into()),
            CoreError::FileIO("x".into()),
            CoreError::Storage("x".into()),
        ] {
            assert_eq!(err.kind(), ErrorKind::Storage, "{err}");
        }
    }

    #[test]
    fn only_external_failures_are_retryable() {
        assert!(CoreError::ExternalSourceFailure {
            provider: "p".into(),
            message: "m".into(),
        }
        .is_retryable());
        assert!(CoreError::Network("x".into()).is_retryable());

        assert!(!CoreError::not_found("Fund", "x").is_retryable());
        assert!(!CoreError::InvalidState("x".into()).is_retryable());
        assert!(!CoreError::ValidationError("x".into()).is_retryable());
        assert!(!CoreError::PartialFailure { failed: 1, total: 1 }.is_retryable());
    }
}

// ── From conversions ────────────────────────────────────────────────

mod conversions {
    use super::*;

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::FileIO(ref m) if m.contains("no such file")));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn from_bincode_error() {
        let bin_err = bincode::deserialize::<String>(&[0xFF]).unwrap_err();
        let err: CoreError = bin_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[test]
    fn question_mark_propagates_io() {
        fn read_missing() -> Result<Vec<u8>, CoreError> {
            Ok(std::fs::read("/definitely/not/a/real/path.pftk")?)
        }
        assert!(matches!(read_missing(), Err(CoreError::FileIO(_))));
    }

    #[test]
    fn errors_are_debug() {
        let err = CoreError::UnsupportedVersion(3);
        assert!(format!("{err:?}").contains("UnsupportedVersion"));
    }
}
