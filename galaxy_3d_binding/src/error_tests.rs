//! Unit tests for error.rs
//!
//! Covers Display output of every variant and `?` propagation through `Result`.

use crate::error::{Error, Result};

// ============================================================================
// DISPLAY
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkAllocateDescriptorSets returned -1000069000".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Backend error"));
    assert!(display.contains("-1000069000"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("image 1 row stride is smaller than a row".to_string());
    assert!(format!("{}", err).starts_with("Invalid resource: image 1"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("resource cache is already initialized".to_string());
    assert_eq!(
        format!("{}", err),
        "Initialization failed: resource cache is already initialized"
    );
}

#[test]
fn test_invalid_signature_display() {
    let err = Error::InvalidSignature("UAV 'g_Out' is visible in the vertex stage".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid pipeline resource signature"));
    assert!(display.contains("g_Out"));
}

#[test]
fn test_invalid_pipeline_state_display() {
    let err = Error::InvalidPipelineState("shader resource 'g_Tex' is not found".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid pipeline state"));
    assert!(display.contains("g_Tex"));
}

// ============================================================================
// TRAITS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::InvalidSignature("x".to_string());
    let as_dyn: &dyn std::error::Error = &err;
    assert!(as_dyn.source().is_none());
}

#[test]
fn test_error_debug_names_variant() {
    assert!(format!("{:?}", Error::OutOfMemory).contains("OutOfMemory"));
    assert!(format!("{:?}", Error::InvalidSignature("a".into())).contains("InvalidSignature"));
    assert!(format!("{:?}", Error::InvalidPipelineState("b".into())).contains("InvalidPipelineState"));
}

#[test]
fn test_error_clone_keeps_message() {
    let err = Error::InvalidPipelineState("two signatures use binding index 1".to_string());
    let copy = err.clone();
    assert_eq!(format!("{}", err), format!("{}", copy));
}

// ============================================================================
// PROPAGATION
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn build() -> Result<u32> {
        Err(Error::InvalidSignature("Desc.Resources[0].ArraySize must not be 0".to_string()))
    }

    fn outer() -> Result<u32> {
        let value = build()?;
        Ok(value + 1)
    }

    match outer() {
        Err(Error::InvalidSignature(msg)) => assert!(msg.contains("ArraySize")),
        other => panic!("unexpected result: {:?}", other),
    }
}
