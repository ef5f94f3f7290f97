// Tests for lib.rs core types
//
// Tests cover: interrupt handling, error display and cloning, and the
// WipeState classification helpers.

use super::*;

// ==================== INTERRUPT HANDLING TESTS ====================

#[test]
fn test_interrupt_flag_roundtrip() {
    reset_interrupted();
    assert!(!is_interrupted(), "Interrupt flag should initially be not set");
    set_interrupted();
    assert!(is_interrupted(), "Interrupt flag should be set");
    reset_interrupted();
    assert!(!is_interrupted());
}

// ==================== WIPE ERROR TESTS ====================

#[test]
fn test_wipe_error_io_display() {
    let err = WipeError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
    assert!(err.to_string().contains("I/O error"));
    assert!(err.to_string().contains("gone"));
}

#[test]
fn test_wipe_error_bad_path_display() {
    let err = WipeError::BadPath {
        path: PathBuf::from("/"),
    };
    assert!(err.to_string().contains("Bad path"));
}

#[test]
fn test_wipe_error_clone_preserves_io_kind() {
    let err = WipeError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "denied",
    ));
    match err.clone() {
        WipeError::Io(e) => {
            assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied);
            assert!(e.to_string().contains("denied"));
        }
        other => panic!("Unexpected clone result: {:?}", other),
    }
}

#[test]
fn test_wipe_error_clone_other_variants() {
    let err = WipeError::InvalidBufferLength(0);
    assert!(matches!(err.clone(), WipeError::InvalidBufferLength(0)));

    let err = WipeError::Entropy("rng".to_string());
    assert_eq!(err.clone().to_string(), err.to_string());
}

// ==================== WIPE STATE TESTS ====================

#[test]
fn test_wipe_state_terminal_classification() {
    assert!(!WipeState::Pending.is_terminal());
    assert!(!WipeState::Processing.is_terminal());
    assert!(!WipeState::Pausing.is_terminal());
    assert!(WipeState::Finished.is_terminal());
    assert!(WipeState::Canceled.is_terminal());
    assert!(WipeState::Failed.is_terminal());
    assert!(WipeState::Missing.is_terminal());
    assert!(WipeState::Unknown.is_terminal());
}

#[test]
fn test_wipe_state_abandoned_excludes_finished() {
    let abandoned: Vec<WipeState> = WipeState::ALL
        .iter()
        .copied()
        .filter(|s| s.is_abandoned())
        .collect();
    assert_eq!(
        abandoned,
        vec![
            WipeState::Canceled,
            WipeState::Failed,
            WipeState::Missing,
            WipeState::Unknown
        ]
    );
}

#[test]
fn test_wipe_state_busy() {
    let busy: Vec<WipeState> = WipeState::ALL
        .iter()
        .copied()
        .filter(|s| s.is_busy())
        .collect();
    assert_eq!(
        busy,
        vec![WipeState::Pending, WipeState::Processing, WipeState::Pausing]
    );
}

#[test]
fn test_wipe_state_serialization() {
    let json = serde_json::to_string(&WipeState::Pausing).unwrap();
    assert_eq!(json, "\"Pausing\"");
    let back: WipeState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, WipeState::Pausing);
}
