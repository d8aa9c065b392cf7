//! Standalone integrity check for a persisted corpus directory.
//!
//! Usage: `verify_corpus [corpus_dir]` — defaults to the configured
//! corpus location. Exits non-zero when the store fails verification.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use policyforge::config::GeneratorConfig;
use policyforge::corpus::CorpusStore;

fn main() -> ExitCode {
    match run() {
        Ok(problems) if problems.is_empty() => {
            println!("Corpus verified: store is consistent.");
            ExitCode::SUCCESS
        }
        Ok(problems) => {
            eprintln!("Corpus verification found {} problem(s):", problems.len());
            for problem in problems {
                eprintln!("  - {}", problem);
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Corpus verification failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<Vec<String>> {
    let dir = match env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => GeneratorConfig::load()?.corpus_dir()?,
    };
    let store = CorpusStore::open(&dir)?;
    println!(
        "Opened corpus at {} with {} entr{}.",
        dir.display(),
        store.len(),
        if store.len() == 1 { "y" } else { "ies" }
    );
    for record in store.ledger_records() {
        println!(
            "  {:?} {} (cycles {})",
            record.status, record.title, record.reject_cycles
        );
    }
    Ok(store.verify())
}
