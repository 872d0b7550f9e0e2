use anyhow::{Context, Result};
use nbsync_core::{
    is_valid_fingerprint, render_template, DirectorySeedSource, SeedMode, SeedSource, SyncService,
};
use std::path::{Path, PathBuf};

const SHORT_HASH_LEN: usize = 12;

pub fn run_seed(store: &SyncService, dir: PathBuf, template_file: Option<String>) -> Result<()> {
    let mut source = DirectorySeedSource::new(dir);
    if let Some(file_name) = template_file {
        source = source.with_template_file(file_name);
    }
    let items = source
        .load()
        .with_context(|| format!("failed to load notebooks from {}", source.dir().display()))?;
    let report = store.seed(&items, SeedMode::Always)?;
    println!(
        "seeded {} notebooks: added={} updated={} total={}",
        report.total(),
        report.added,
        report.updated,
        store.count()?
    );
    Ok(())
}

pub fn run_list(store: &SyncService) -> Result<()> {
    for notebook in store.list()? {
        // Rows copied from foreign stores keep whatever hash they arrived with.
        let marker = if is_valid_fingerprint(&notebook.hash) {
            ""
        } else {
            " (foreign hash)"
        };
        println!(
            "{}\t{}\t{}{marker}",
            notebook.name,
            notebook.hash.chars().take(SHORT_HASH_LEN).collect::<String>(),
            notebook.updated_at
        );
    }
    Ok(())
}

pub fn run_template(store: &SyncService, author: &str, app: &str) -> Result<()> {
    let code = store.template_code()?;
    print!("{}", render_template(&code, author, app));
    Ok(())
}

pub fn run_export(store: &SyncService, out: &Path) -> Result<()> {
    let snapshot = store.download_snapshot()?;
    std::fs::write(out, &snapshot.bytes)
        .with_context(|| format!("failed to write snapshot to {}", out.display()))?;
    println!(
        "exported {} notebooks to {}",
        snapshot.notebook_count,
        out.display()
    );
    Ok(())
}

pub fn run_merge(store: &SyncService, snapshot: &Path) -> Result<()> {
    let bytes = std::fs::read(snapshot)
        .with_context(|| format!("failed to read snapshot {}", snapshot.display()))?;
    let summary = store.upload_snapshot(&bytes)?;
    print_warnings(&summary.warnings);
    println!(
        "merged: inserted={} unchanged={} total={}",
        summary.inserted, summary.unchanged, summary.notebook_count
    );
    Ok(())
}

pub(crate) fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}
