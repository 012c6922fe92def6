// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use std::fs::File;

use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};

#[used]
#[cfg_attr(target_os = "linux", unsafe(link_section = ".init_array"))]
pub static INITIALIZE: extern "C" fn() = hostcrypto_log_init;

const TRACE_VAR: &str = "HOSTCRYPTO_TRACE";
const TRACE_LEVEL_VAR: &str = "HOSTCRYPTO_TRACE_LEVEL";

/* Unknown level names select the most verbose level */
fn trace_level(name: Option<&str>) -> LevelFilter {
    match name {
        None => LevelFilter::Error,
        Some("off") => LevelFilter::Off,
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some(_) => LevelFilter::Trace,
    }
}

/// Initializes a simple logger for tracing accelerator and driver errors,
/// based on the value of the environment variable HOSTCRYPTO_TRACE:
/// - stdout -> logs to standard output
/// - file -> any other value is interpreted as a file name to log into
/// - NOT PRESENT -> No tracing is initialized
///
/// If the logger can't be initialized (for example the log file can't be
/// created) tracing stays disabled and no error is reported.
///
/// The verbosity is set with HOSTCRYPTO_TRACE_LEVEL to one of off, error,
/// warn, info, debug or trace, and defaults to error.

#[unsafe(no_mangle)]
pub extern "C" fn hostcrypto_log_init() {
    let level = trace_level(std::env::var(TRACE_LEVEL_VAR).ok().as_deref());
    let target = match std::env::var(TRACE_VAR) {
        Ok(t) => t,
        Err(_) => return,
    };
    let ret = if target == "stdout" {
        SimpleLogger::init(level, Config::default())
    } else {
        match File::create(&target) {
            Ok(file) => WriteLogger::init(level, Config::default(), file),
            Err(_) => return,
        }
    };
    if ret.is_ok() {
        log::info!("hostcrypto tracing enabled at level {}", level);
    }
}

#[test]
pub fn test_init() {
    hostcrypto_log_init();
}

#[test]
pub fn test_trace_level() {
    assert_eq!(trace_level(None), LevelFilter::Error);
    assert_eq!(trace_level(Some("off")), LevelFilter::Off);
    assert_eq!(trace_level(Some("debug")), LevelFilter::Debug);
    assert_eq!(trace_level(Some("verbose")), LevelFilter::Trace);
}
