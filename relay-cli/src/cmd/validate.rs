use std::path::Path;

use relay_core::{parse_document_str, validate_document, DocumentFormat, ParseError};
use relay_exec::Registry;
use serde::Serialize;

use crate::cmd::config::http_client;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    connections: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let parsed = match parse_document_str(&content, DocumentFormat::Auto) {
        Ok(p) => p,
        Err(ParseError::Json(e)) => {
            print_error(output.format, output.quiet, &format!("JSON parse failed: {e}"));
            return exit_codes::VALIDATION_FAILED;
        }
        Err(ParseError::Yaml(e)) => {
            print_error(output.format, output.quiet, &format!("YAML parse failed: {e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let mut errors: Vec<String> = match validate_document(&parsed.document) {
        Ok(()) => Vec::new(),
        Err(err) => err
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect(),
    };

    // Structural problems make connector construction meaningless.
    if errors.is_empty() {
        let http = match http_client(&output) {
            Ok(h) => h,
            Err(code) => return code,
        };
        let registration = Registry::new(http).register_connections(&parsed.document);
        errors.extend(
            registration
                .errors
                .iter()
                .map(|e| format!("connection `{}`: {}", e.connection, e.error)),
        );
    }

    let result = ValidateResult {
        valid: errors.is_empty(),
        format: format!("{:?}", parsed.format),
        connections: parsed.document.connections.len(),
        errors,
    };

    if output.format == OutputFormat::Text && !output.quiet {
        if result.valid {
            println!(
                "ok: valid connections document ({:?}, {} connections)",
                parsed.format, result.connections
            );
        } else {
            eprintln!("error: validation failed");
            for e in &result.errors {
                eprintln!("- {e}");
            }
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::VALIDATION_FAILED
    }
}
