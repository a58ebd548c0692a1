//! LabCheck CLI.

use std::io;
use std::path::Path;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use labcheck::analysis::{
    analyze_blood_file, analyze_blood_text_with, analyze_urine_file, analyze_urine_text,
    extract_results, read_report, respond, AnalysisError, AnalysisResponse, BloodRequest,
};
use labcheck::config::{APP_NAME, APP_VERSION};
use labcheck::intelligence::reference::{ReferenceError, ReferenceTable};
use labcheck::logging::{init_logging, LogConfig};
use labcheck::models::{Gender, UrineTestType};
use labcheck::pipeline::extraction::{ExtractionOptions, PlainTextExtractor};

mod cli;

use crate::cli::{BloodArgs, Cli, Command, ExtractArgs, UrineArgs};

const STDIN_ARG: &str = "-";

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    #[error("reference table: {0}")]
    Reference(#[from] ReferenceError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// 2 when the report had nothing to analyze, 1 for everything else.
    fn exit_code(&self) -> i32 {
        match self {
            Self::Analysis(AnalysisError::NoContent | AnalysisError::NoResults) => 2,
            _ => 1,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone());
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    let result = match &cli.command {
        Command::Blood(args) => run_blood(args, cli.json),
        Command::Urine(args) => run_urine(args, cli.json),
        Command::Extract(args) => run_extract(args, cli.json),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            report_error(&error, cli.json);
            error.exit_code()
        }
    };
    std::process::exit(exit_code);
}

fn run_blood(args: &BloodArgs, json: bool) -> Result<(), CliError> {
    let reference = args
        .reference_file
        .as_deref()
        .map(ReferenceTable::load_json)
        .transpose()?;
    let request = BloodRequest {
        gender: Gender::from_request(args.gender.as_deref()),
        reference: reference.as_ref(),
        extraction: ExtractionOptions {
            fuzzy_terms: args.fuzzy_terms,
        },
    };

    let stdin = read_stdin_if_requested(&args.input)?;
    let response = respond(Uuid::new_v4(), "blood", || match &stdin {
        Some(text) => analyze_blood_text_with(text, &request),
        None => analyze_blood_file(&PlainTextExtractor, &args.input, &request),
    })?;
    let text = response.data.recommendations.clone();
    emit(&response, &text, json)
}

fn run_urine(args: &UrineArgs, json: bool) -> Result<(), CliError> {
    let test_type = UrineTestType::from_request(args.test_type.as_deref());

    let stdin = read_stdin_if_requested(&args.input)?;
    let response = respond(Uuid::new_v4(), "urine", || match &stdin {
        Some(text) => analyze_urine_text(text, test_type),
        None => analyze_urine_file(&PlainTextExtractor, &args.input, test_type),
    })?;
    let text = response.data.report.clone();
    emit(&response, &text, json)
}

fn run_extract(args: &ExtractArgs, json: bool) -> Result<(), CliError> {
    let options = ExtractionOptions {
        fuzzy_terms: args.fuzzy_terms,
    };

    let stdin = read_stdin_if_requested(&args.input)?;
    let response = respond(Uuid::new_v4(), "extract", || {
        let text = match &stdin {
            Some(text) => text.clone(),
            None => read_report(&PlainTextExtractor, &args.input)?,
        };
        extract_results(&text, &options)
    })?;

    let lines: Vec<String> = response
        .data
        .iter()
        .map(|r| format!("{}: {} {}", r.test_key, r.value, r.unit).trim_end().to_string())
        .collect();
    emit(&response, &lines.join("\n"), json)
}

/// `Some(text)` when the input argument is `-`.
fn read_stdin_if_requested(input: &Path) -> io::Result<Option<String>> {
    if input.as_os_str() != STDIN_ARG {
        return Ok(None);
    }
    io::read_to_string(io::stdin()).map(Some)
}

fn emit<T: Serialize>(response: &AnalysisResponse<T>, text: &str, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

fn report_error(error: &CliError, json: bool) {
    match error {
        CliError::Analysis(e) if json => match serde_json::to_string_pretty(&e.body()) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("error: {error}"),
        },
        _ => eprintln!("error: {error}"),
    }
}
