//! Emission of decode diagnostics through an injected logger.
//!
//! Decoders never call the global `log` macros: the caller hands a
//! `&dyn Log` to every entry point and records are routed to it directly.

use std::fmt;

use log::{Level, Log, Record};

pub(crate) const TARGET: &str = "rfbscope::decode";

pub(crate) fn emit(logger: &dyn Log, level: Level, args: fmt::Arguments<'_>) {
    let record = Record::builder()
        .level(level)
        .target(TARGET)
        .module_path_static(Some(module_path!()))
        .args(args)
        .build();
    if logger.enabled(record.metadata()) {
        logger.log(&record);
    }
}

pub(crate) fn debug(logger: &dyn Log, args: fmt::Arguments<'_>) {
    emit(logger, Level::Debug, args);
}

pub(crate) fn trace(logger: &dyn Log, args: fmt::Arguments<'_>) {
    emit(logger, Level::Trace, args);
}
