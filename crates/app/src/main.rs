use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sanctions_screen_core::{
    discover_list_documents, load_lists, ComplianceCase, Decision, ExtractionCache, ListDocument,
    ListLoad, LoadStatus, RecordStore, ScreeningCoordinator, ScreeningError, ScreeningOptions,
    SourceList,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sanctions-screen", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// MOHA domestic list PDF (tabular)
    #[arg(long)]
    moha: Option<PathBuf>,

    /// UNSCR 1267/1989/2253 (ISIL/Al-Qaida) list PDF
    #[arg(long = "unscr-1267")]
    unscr_1267: Option<PathBuf>,

    /// UNSCR 1988 (Taliban) list PDF
    #[arg(long = "unscr-1988")]
    unscr_1988: Option<PathBuf>,

    /// UNSCR 1718 (DPRK) list PDF
    #[arg(long = "unscr-1718")]
    unscr_1718: Option<PathBuf>,

    /// UNSCR 2231 (Iran) list PDF
    #[arg(long = "unscr-2231")]
    unscr_2231: Option<PathBuf>,

    /// Folder searched recursively for list PDFs, matched to lists by file name.
    #[arg(long, env = "SANCTIONS_LISTS_DIR")]
    lists_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the consolidated sanctions database.
    Records {
        /// Only print records from this list (moha, 1267, 1988, 1718, 2231).
        #[arg(long)]
        source: Option<SourceList>,
        /// Emit records as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Screen a customer or entity name against the loaded lists.
    Screen {
        /// Customer name / entity name
        #[arg(long)]
        query: String,
        /// Minimum score for a high-risk match.
        #[arg(long, env = "SANCTIONS_THRESHOLD", default_value_t = 80)]
        threshold: u8,
        /// Number of ranked candidates to keep.
        #[arg(long, env = "SANCTIONS_LIMIT", default_value_t = 10)]
        limit: usize,
        /// Write the STR draft (match) or search certificate (no match) here.
        #[arg(long)]
        report_out: Option<PathBuf>,
        /// Open an internal compliance case when the result is a match.
        #[arg(long, default_value_t = false)]
        log_case: bool,
        /// Emit the decision as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    fn explicit_lists(&self) -> Vec<(SourceList, &Path)> {
        [
            (SourceList::Moha, &self.moha),
            (SourceList::Unscr1267, &self.unscr_1267),
            (SourceList::Unscr1988, &self.unscr_1988),
            (SourceList::Unscr1718, &self.unscr_1718),
            (SourceList::Unscr2231, &self.unscr_2231),
        ]
        .into_iter()
        .filter_map(|(source, path)| path.as_deref().map(|path| (source, path)))
        .collect()
    }
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "sanctions-screen boot"
    );

    let documents = collect_documents(&cli)?;
    let mut cache = ExtractionCache::default();
    let loads = load_lists(&documents, &mut cache);
    report_loads(&loads);

    let store = RecordStore::from_loads(&loads);
    info!(records = store.len(), origin = ?store.origin(), "record store ready");

    match cli.command {
        Command::Records { source, json } => {
            let records = store
                .records()
                .iter()
                .filter(|record| source.map_or(true, |source| record.source == source))
                .collect::<Vec<_>>();

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("{}", store.status_line());
                for list in SourceList::ALL {
                    let count = store.count_by_source(list);
                    if count > 0 {
                        println!("  {list}: {count}");
                    }
                }
                for record in records {
                    println!(
                        "[{}] {} | aliases={} | dob={} | {} | {}",
                        record.reference_no,
                        record.name,
                        record.aliases_display(),
                        record.date_of_birth,
                        record.nationality,
                        record.source
                    );
                }
            }
        }
        Command::Screen {
            query,
            threshold,
            limit,
            report_out,
            log_case,
            json,
        } => {
            println!("{}", store.status_line());
            let coordinator =
                ScreeningCoordinator::new(store, ScreeningOptions { threshold, limit })?;

            let decision = match coordinator.screen(&query) {
                Ok(decision) => decision,
                Err(ScreeningError::EmptyQuery) => {
                    warn!("empty query; nothing screened");
                    println!("Please enter a name to screen.");
                    return Ok(());
                }
                Err(error) => return Err(error.into()),
            };

            info!(
                query = %decision.query,
                status = ?decision.status,
                high_risk = decision.matches.len(),
                "screening complete"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            } else {
                print_decision(&decision);
            }

            if log_case {
                match ComplianceCase::open(&decision, Utc::now()) {
                    Some(case) => {
                        info!(case_id = %case.case_id, reference_no = %case.reference_no, "compliance case opened");
                        println!("Internal compliance log updated: case {}", case.case_id);
                    }
                    None => println!("No match; no compliance case opened."),
                }
            }

            if let Some(path) = report_out {
                let export = decision.export(Utc::now());
                std::fs::write(&path, &export.body)
                    .with_context(|| format!("writing {} to {}", export.file_name, path.display()))?;
                println!("{} written to {}", export.file_name, path.display());
            }
        }
    }

    Ok(())
}

fn collect_documents(cli: &Cli) -> anyhow::Result<Vec<ListDocument>> {
    let mut documents = Vec::new();

    for (source, path) in cli.explicit_lists() {
        let document = ListDocument::from_path(source, path)
            .with_context(|| format!("reading {} from {}", source, path.display()))?;
        documents.push(document);
    }

    if let Some(folder) = &cli.lists_dir {
        let report = discover_list_documents(folder)?;
        for stray in &report.unclassified {
            warn!(path = %stray.path.display(), "pdf does not name a known list; skipped");
        }
        documents.extend(report.documents);
    }

    Ok(documents)
}

fn report_loads(loads: &[ListLoad]) {
    for load in loads {
        let path = load.fingerprint.source_path.as_deref().unwrap_or("<memory>");
        match &load.status {
            LoadStatus::Loaded => info!(
                list = %load.source(),
                path,
                checksum = %load.fingerprint.checksum,
                records = load.records.len(),
                "list loaded"
            ),
            LoadStatus::Unreadable { reason } => warn!(
                list = %load.source(),
                path,
                reason = %reason,
                "list unreadable; no data from this source"
            ),
        }

        let foreign = load.foreign_references();
        if !foreign.is_empty() {
            warn!(
                list = %load.source(),
                path,
                foreign = foreign.len(),
                first = foreign[0],
                "references outside this list's numbering; was the file uploaded under the right list?"
            );
        }

        for anomaly in &load.anomalies {
            warn!(
                list = %load.source(),
                page = anomaly.page,
                row = anomaly.row,
                reference_no = %anomaly.reference_no,
                cells = anomaly.cell_count,
                missing = ?anomaly.missing,
                "row narrower than the column map; check for a changed layout"
            );
        }
    }
}

fn print_decision(decision: &Decision) {
    println!("query: {}", decision.query);

    match &decision.top_match {
        Some(top) => {
            println!("RED ALERT: POTENTIAL MATCH FOUND. DO NOT EXECUTE TRANSACTION.");
            println!("Designated Name: {}", top.name);
            println!("Reference No: {}", top.reference_no);
            println!("Source List: {}", top.source);
            println!("Date of Birth: {}", top.date_of_birth);
            println!("Nationality: {}", top.nationality);
            println!("Other Info: {}", top.raw_excerpt);
        }
        None => {
            println!("NO MATCH FOUND. Standard Customer Due Diligence (CDD) applies.");
        }
    }

    for (rank, hit) in decision.ranked.iter().enumerate() {
        let marker = if hit.score >= decision.threshold { "!" } else { " " };
        println!(
            "{marker} {:>2}. score={:>3} [{}] {} ({})",
            rank + 1,
            hit.score,
            hit.record.reference_no,
            hit.record.name,
            hit.record.source
        );
    }

    println!("Required actions:");
    for action in decision.required_actions() {
        println!("  - {action}");
    }
}
