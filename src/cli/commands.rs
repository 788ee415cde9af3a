//! Command implementations for the tessera CLI.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::content_store::entry::TOC_FILE_NAME;
use crate::content_store::{ContentStore, ContentStoreConfig};

/// Execute a CLI command.
pub fn execute_command(args: TesseraArgs) -> Result<()> {
    match &args.command {
        Command::Store(store_args) => store_files(store_args, &args),
        Command::Get(get_args) => get_document(get_args, &args),
        Command::Delete(delete_args) => delete_document(delete_args, &args),
        Command::Info(info_args) => show_info(info_args, &args),
    }
}

fn open_store(path: &Path, config: ContentStoreConfig) -> Result<ContentStore> {
    ContentStore::open_dir(path, config)
        .with_context(|| format!("Failed to open content store at {}", path.display()))
}

fn open_existing_store(path: &Path) -> Result<ContentStore> {
    if !path.join(TOC_FILE_NAME).is_file() {
        bail!("No content store at {}", path.display());
    }
    open_store(path, ContentStoreConfig::default())
}

fn open_store_read_only(path: &Path) -> Result<ContentStore> {
    if !path.join(TOC_FILE_NAME).is_file() {
        bail!("No content store at {}", path.display());
    }
    ContentStore::open_dir_read_only(path)
        .with_context(|| format!("Failed to open content store at {}", path.display()))
}

/// Store each file as one document.
fn store_files(args: &StoreArgs, cli_args: &TesseraArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ContentStoreConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ContentStoreConfig::default(),
    };
    let store = open_store(&args.store_path, config)?;

    let start_time = Instant::now();
    let mut stored = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let id = store
            .store(&text)
            .with_context(|| format!("Failed to store {}", file.display()))?;
        info!("stored {} as document {id}", file.display());
        stored.push(StoredFile {
            path: file.display().to_string(),
            id,
            chars: text.chars().count(),
        });
    }
    store.close().context("Failed to close content store")?;

    output_result(
        "Documents stored successfully",
        &StoreResult {
            stored,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )?;
    Ok(())
}

/// Print a whole document or a character range of it.
fn get_document(args: &GetArgs, cli_args: &TesseraArgs) -> Result<()> {
    let store = open_store_read_only(&args.store_path)?;

    let Some(length) = store.doc_length(args.id) else {
        bail!("Document {} not found", args.id);
    };
    let start = args.start.unwrap_or(0);
    let end = args.end.unwrap_or(length);

    let text = if start == 0 && end == length {
        store.retrieve(args.id)?
    } else {
        store
            .retrieve_parts(args.id, &[start], &[end])?
            .into_iter()
            .next()
            .flatten()
    };
    let Some(text) = text else {
        bail!("Document {} not found", args.id);
    };

    output_text(
        &GetResult {
            id: args.id,
            start,
            end,
            text,
        },
        cli_args,
    )?;
    Ok(())
}

fn delete_document(args: &DeleteArgs, cli_args: &TesseraArgs) -> Result<()> {
    let store = open_existing_store(&args.store_path)?;
    store
        .delete(args.id)
        .with_context(|| format!("Failed to delete document {}", args.id))?;
    store.close().context("Failed to close content store")?;

    output_result(
        "Document deleted",
        &DeleteResult { id: args.id },
        cli_args,
    )?;
    Ok(())
}

fn show_info(args: &InfoArgs, cli_args: &TesseraArgs) -> Result<()> {
    let store = open_store_read_only(&args.store_path)?;

    let ids = store.doc_ids();
    let entries: Vec<EntryInfo> = ids
        .iter()
        .filter_map(|&id| store.doc_length(id).map(|chars| EntryInfo { id, chars }))
        .collect();
    let config = store.config();

    let info = StoreInfo {
        path: args.store_path.display().to_string(),
        documents: ids.len(),
        next_id: store.next_id(),
        data_files: store.data_file_count(),
        block_size_chars: config.block_size_chars,
        data_file_size_hint: config.data_file_size_hint,
        total_chars: entries.iter().map(|e| e.chars).sum(),
        entries: args.detailed.then_some(entries),
    };
    output_result("Content store", &info, cli_args)?;
    Ok(())
}
