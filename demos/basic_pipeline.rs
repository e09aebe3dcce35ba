//! End-to-end pipeline: warnings to stderr as text, everything to a
//! rotating JSON-lines file under `logs/`.
//!
//! Run with `cargo run --example basic_pipeline`.

use log_pipeline::prelude::*;
use std::fmt;

const CONFIG: &str = r#"{
    "formatters": {
        "simple": {
            "kind": "line",
            "fmt": "%(levelname)s %(message)s"
        },
        "json": {
            "kind": "json",
            "fmt_keys": {
                "levelname": "level",
                "message": "message",
                "asctime": "timestamp",
                "name": "logger",
                "module": "module",
                "funcName": "function",
                "lineno": "line",
                "threadName": "thread_name"
            }
        }
    },
    "handlers": {
        "stderr": {
            "kind": "console",
            "target": "stderr",
            "formatter": "simple",
            "level": "WARNING"
        },
        "file_json": {
            "kind": "rotating_file",
            "path": "logs/my_app.log.jsonl",
            "formatter": "json",
            "level": "DEBUG",
            "max_bytes": 10000,
            "backup_count": 3
        }
    },
    "root": { "level": "DEBUG", "handlers": ["stderr", "file_json"] },
    "queue": { "level": "DEBUG" }
}"#;

#[derive(Debug)]
struct ZeroDivisionError;

impl fmt::Display for ZeroDivisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "division by zero")
    }
}

impl std::error::Error for ZeroDivisionError {}

fn divide(foo: i64, bar: i64) -> std::result::Result<i64, ZeroDivisionError> {
    foo.checked_div(bar).ok_or(ZeroDivisionError)
}

fn main() -> Result<()> {
    let pipeline = LoggingConfig::from_json_str(CONFIG)?.build()?;
    let logger = pipeline.logger("my_app");

    log_pipeline::info!(logger, "info message without extra");
    log_pipeline::info!(logger, "info message"; "foo" => "foo");

    let foo = 1;
    let bar = 0;
    let baz = match divide(foo, bar) {
        Ok(value) => value,
        Err(e) => {
            logger.emit(
                LogCall::new(LogLevel::Error, "zero division")
                    .error(&e)
                    .field("foo", foo)
                    .field("bar", bar),
            );
            0
        }
    };

    println!("{}", baz);
    pipeline.shutdown()
}
