//! Unit tests for the validation message callback
//!
//! Calls the callback directly with hand-built callback data. No GPU required.

use super::*;
use galaxy_3d_binding::galaxy3d::log::{LogEntry, Logger};
use serial_test::serial;
use std::sync::Arc;

#[derive(Clone, Default)]
struct TestLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String, String)>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries
            .lock()
            .unwrap()
            .push((entry.severity, entry.source.clone(), entry.message.clone()));
    }
}

fn send(severity: vk::DebugUtilsMessageSeverityFlagsEXT, message: &CStr) {
    let data = vk::DebugUtilsMessengerCallbackDataEXT {
        p_message_id_name: c"VUID-Test".as_ptr(),
        p_message: message.as_ptr(),
        ..Default::default()
    };
    let result = unsafe {
        vulkan_debug_callback(
            severity,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            &data,
            std::ptr::null_mut(),
        )
    };
    assert_eq!(result, vk::FALSE);
}

// ============================================================================
// SEVERITY MAPPING
// ============================================================================

#[test]
fn test_log_severity_mapping() {
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), LogSeverity::Error);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), LogSeverity::Warn);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), LogSeverity::Info);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), LogSeverity::Trace);
}

#[test]
fn test_message_type_name() {
    assert_eq!(message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), "Validation");
    assert_eq!(message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
    assert_eq!(message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}

#[test]
fn test_severity_flags() {
    let quiet = severity_flags(false);
    assert!(quiet.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
    assert!(!quiet.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
    assert!(severity_flags(true).contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

// ============================================================================
// CALLBACK
// ============================================================================

#[test]
#[serial]
fn test_callback_forwards_to_logger_and_counts() {
    reset_validation_stats();
    let logger = TestLogger::default();
    Engine::set_logger(logger.clone());

    send(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, c"descriptor set 0 is not bound");
    send(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, c"unused binding");
    Engine::reset_logger();

    let entries = logger.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, LogSeverity::Error);
    assert_eq!(entries[0].1, VALIDATION_SOURCE);
    assert_eq!(entries[0].2, "[Validation] VUID-Test: descriptor set 0 is not bound");
    assert_eq!(entries[1].0, LogSeverity::Warn);

    let stats = validation_stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.total(), 2);
}

#[test]
#[serial]
fn test_callback_marks_repeated_messages() {
    reset_validation_stats();
    let logger = TestLogger::default();
    Engine::set_logger(logger.clone());

    send(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, c"same message");
    send(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, c"same message");
    Engine::reset_logger();

    let entries = logger.entries.lock().unwrap();
    assert!(!entries[0].2.contains("[x"));
    assert!(entries[1].2.starts_with("[Validation] [x2]"));
}

#[test]
#[serial]
fn test_reset_validation_stats() {
    send(vk::DebugUtilsMessageSeverityFlagsEXT::INFO, c"info");
    reset_validation_stats();
    assert_eq!(validation_stats(), ValidationStats::default());
}
