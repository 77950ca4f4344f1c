//! Unit tests for the Engine state manager
//!
//! Tests initialization, configuration, the shader bytecode cache and logging APIs.
//!
//! IMPORTANT: ENGINE_STATE and LOGGER are global statics shared across all tests.
//! All tests are marked with #[serial] to run sequentially.

use crate::galaxy3d::{Config, Engine};
use crate::galaxy3d::log::{Logger, LogEntry, LogSeverity};
use crate::binding::ShaderStage;
use crate::pipeline::{Shader, ShaderDesc};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures the entries logged from `test*` sources
///
/// Other tests running concurrently log from `galaxy3d::*` sources and are ignored.
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        if !entry.source.starts_with("test") {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        let location = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(" @ {}:{}", file, line),
            _ => String::new(),
        };
        entries.push(format!("{:?} [{}] {}{}", entry.severity, entry.source, entry.message, location));
    }
}

fn install_test_logger() -> Arc<Mutex<Vec<String>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(TestLogger { entries: entries.clone() });
    entries
}

fn setup() {
    Engine::initialize().unwrap();
    Engine::reset_for_testing();
}

fn shader_desc(name: &str, code: Vec<u32>) -> ShaderDesc {
    ShaderDesc {
        name: name.to_string(),
        stage: ShaderStage::Compute,
        bytecode: code,
        resources: Vec::new(),
    }
}

// ============================================================================
// INITIALIZATION
// ============================================================================

#[test]
#[serial]
fn test_engine_initialize() {
    Engine::initialize().unwrap();
    assert!(Engine::is_initialized());
}

#[test]
#[serial]
fn test_multiple_initialize_calls_idempotent() {
    setup();
    Engine::set_config(Config { app_name: "Kept".to_string(), ..Config::default() }).unwrap();
    Engine::initialize().unwrap();
    Engine::initialize().unwrap();
    assert_eq!(Engine::config().app_name, "Kept");
    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_shutdown_clears_shader_cache() {
    setup();
    let shader = Shader::new(shader_desc("Cached", vec![1, 2, 3])).unwrap();
    assert_eq!(Engine::shader_cache().len(), 1);

    Engine::shutdown();
    assert!(Engine::shader_cache().is_empty());
    // Live shaders keep their bytecode
    assert_eq!(shader.bytecode().code(), &[1, 2, 3]);
}

#[test]
#[serial]
fn test_shutdown_idempotent() {
    setup();
    Engine::shutdown();
    Engine::shutdown();
    assert!(Engine::shader_cache().is_empty());
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
#[serial]
fn test_set_config() {
    setup();
    let config = Config {
        enable_validation: true,
        app_name: "Viewer".to_string(),
        app_version: (2, 1, 0),
        srb_allocation_granularity: 16,
    };
    Engine::set_config(config).unwrap();

    let active = Engine::config();
    assert!(active.enable_validation);
    assert_eq!(active.app_name, "Viewer");
    assert_eq!(active.app_version, (2, 1, 0));
    assert_eq!(active.srb_allocation_granularity, 16);
}

#[test]
#[serial]
fn test_reset_for_testing() {
    setup();
    Engine::set_config(Config { srb_allocation_granularity: 64, ..Config::default() }).unwrap();
    Shader::new(shader_desc("Temp", vec![9])).unwrap();

    Engine::reset_for_testing();
    assert_eq!(Engine::config().srb_allocation_granularity, 1);
    assert!(Engine::shader_cache().is_empty());
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.app_name, "Galaxy3D Application");
    assert_eq!(config.app_version, (1, 0, 0));
    assert_eq!(config.srb_allocation_granularity, 1);
}

// ============================================================================
// SHADER CACHE
// ============================================================================

#[test]
#[serial]
fn test_shaders_share_identical_bytecode() {
    setup();
    let a = Shader::new(shader_desc("A", vec![0x0723_0203, 7])).unwrap();
    let b = Shader::new(shader_desc("B", vec![0x0723_0203, 7])).unwrap();
    let c = Shader::new(shader_desc("C", vec![0x0723_0203, 8])).unwrap();

    assert!(Arc::ptr_eq(a.bytecode(), b.bytecode()));
    assert!(!Arc::ptr_eq(a.bytecode(), c.bytecode()));
    assert_eq!(Engine::shader_cache().len(), 2);
    Engine::reset_for_testing();
}

// ============================================================================
// LOGGING
// ============================================================================

#[test]
#[serial]
fn test_default_logger_logs_without_panic() {
    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "Info through the default logger".to_string());
    Engine::log(LogSeverity::Error, "test", "Error through the default logger".to_string());
}

#[test]
#[serial]
fn test_set_custom_logger() {
    let entries = install_test_logger();
    Engine::log(LogSeverity::Warn, "test::engine", "Careful".to_string());
    assert_eq!(entries.lock().unwrap().as_slice(), ["Warn [test::engine] Careful"]);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_to_default() {
    let entries = install_test_logger();
    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "Not captured".to_string());
    assert!(entries.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_log_detailed_with_file_line() {
    let entries = install_test_logger();
    Engine::log_detailed(LogSeverity::Error, "test", "Failed".to_string(), "signature.rs", 42);
    assert_eq!(entries.lock().unwrap()[0], "Error [test] Failed @ signature.rs:42");
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_error_macro_records_location() {
    setup();
    let entries = install_test_logger();
    crate::engine_error!("test::engine", "Engine error: {}", "simulated");
    let captured = entries.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].starts_with("Error [test::engine] Engine error: simulated @ "));
    Engine::reset_logger();
}
