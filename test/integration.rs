// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{edit_on, FolderFixture};

use anyhow::Result;
use libra::{
    config::{Registry, Settings},
    history::{clear_history, delete_entry_files, preselected_revs, SelectionPreset},
    listing::safe_list_files,
    meta::{load_meta, save_meta, HistoryEntry},
    path::registry_path,
    scan::{FolderScan, Scanner},
    track::{commit_revision, track_file, untrack, TrackError},
    version::BumpLevel,
};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;

#[sealed_test]
fn track_commit_scan_then_clear_minor_lines() -> Result<()> {
    let docs = FolderFixture::new(std::env::current_dir()?.join("docs"))?;
    docs.write("spec.docx", "draft")?;

    let mut meta = load_meta(docs.path())?;
    track_file(&mut meta, docs.path(), "spec.docx", &docs.ignore()?, &edit_on(10, "first draft"))?;
    commit_revision(&mut meta, docs.path(), "spec.docx", BumpLevel::Patch, &edit_on(11, "typos"))?;
    commit_revision(&mut meta, docs.path(), "spec.docx", BumpLevel::Patch, &edit_on(12, "figures"))?;
    commit_revision(&mut meta, docs.path(), "spec.docx", BumpLevel::Minor, &edit_on(13, "review"))?;
    commit_revision(&mut meta, docs.path(), "spec.docx", BumpLevel::Patch, &edit_on(14, "sign off"))?;
    save_meta(docs.path(), &meta)?;

    assert!(!docs.exists("spec.docx"));
    assert_eq!(docs.read("spec_rev1.1.1_20260214.docx")?, "draft");

    // Office lock file must not show up, nor break anything.
    docs.write("~$spec.docx", "lock")?;
    let scan = Scanner::default().scan(docs.path())?;
    let rows = scan.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "spec.docx");
    assert_eq!(rows[0].filename, "spec_rev1.1.1_20260214.docx");
    assert_eq!(rows[0].current_rev, "rev1.1.1_20260214");
    assert_eq!(rows[0].updated_at, "2026-02-14 09:30:00");
    assert_eq!(rows[0].updated_by, "alice");
    assert_eq!(rows[0].last_memo, "sign off");
    assert!(!rows[0].missing);

    let mut meta = load_meta(docs.path())?;
    let document = meta.get("spec.docx").unwrap();
    assert_eq!(
        preselected_revs(document, SelectionPreset::Patch),
        vec!["rev1.1.0_20260213".to_string()]
    );
    let revs = preselected_revs(document, SelectionPreset::Minor);
    assert_eq!(
        revs,
        vec![
            "rev1.0.0_20260210".to_string(),
            "rev1.0.1_20260211".to_string(),
            "rev1.0.2_20260212".to_string(),
        ]
    );

    let document = meta.get_mut("spec.docx").unwrap();
    let removed = clear_history(document, &revs);
    let deleted = delete_entry_files(docs.path(), document, &removed)?;
    assert_eq!(deleted.len(), 3);
    assert_eq!(
        document.history,
        vec![HistoryEntry::new("rev1.1.0_20260213", "spec_rev1.1.0_20260213.docx")]
    );
    save_meta(docs.path(), &meta)?;

    assert!(!docs.exists("spec_rev1.0.0_20260210.docx"));
    assert!(!docs.exists("spec_rev1.0.2_20260212.docx"));
    assert!(docs.exists("spec_rev1.1.0_20260213.docx"));
    assert!(docs.exists("spec_rev1.1.1_20260214.docx"));
    assert_eq!(load_meta(docs.path())?, meta);

    Ok(())
}

#[sealed_test]
fn untracked_document_is_pruned_on_next_scan() -> Result<()> {
    let docs = FolderFixture::new(std::env::current_dir()?.join("docs"))?;
    docs.write("plan.xlsx", "budget")?;
    docs.write("notes.txt", "loose")?;

    let mut meta = load_meta(docs.path())?;
    track_file(&mut meta, docs.path(), "plan.xlsx", &docs.ignore()?, &edit_on(10, ""))?;
    track_file(&mut meta, docs.path(), "notes.txt", &docs.ignore()?, &edit_on(10, ""))?;
    untrack(&mut meta, "plan.xlsx")?;
    save_meta(docs.path(), &meta)?;

    let scan = Scanner::default().scan(docs.path())?;
    let FolderScan::Present { meta, pruned, rows } = scan else {
        panic!("folder should be present");
    };
    assert_eq!(pruned, vec!["plan.xlsx".to_string()]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "notes.txt");
    assert!(meta.get("plan.xlsx").is_none());

    // Pruning was persisted, file itself stays.
    assert!(load_meta(docs.path())?.get("plan.xlsx").is_none());
    assert!(docs.exists("plan_rev1.0.0_20260210.xlsx"));

    Ok(())
}

#[sealed_test]
fn deleted_revision_file_is_flagged_not_dropped() -> Result<()> {
    let docs = FolderFixture::new(std::env::current_dir()?.join("docs"))?;
    docs.write("spec.docx", "draft")?;

    let mut meta = load_meta(docs.path())?;
    track_file(&mut meta, docs.path(), "spec.docx", &docs.ignore()?, &edit_on(10, ""))?;
    save_meta(docs.path(), &meta)?;
    std::fs::remove_file(docs.path().join("spec_rev1.0.0_20260210.docx"))?;

    let scan = Scanner::default().scan(docs.path())?;
    assert_eq!(scan.rows().len(), 1);
    assert!(scan.rows()[0].missing);
    assert_eq!(load_meta(docs.path())?, meta);

    Ok(())
}

#[sealed_test]
fn settings_ignore_rules_hide_files() -> Result<()> {
    let docs = FolderFixture::new(std::env::current_dir()?.join("docs"))?;
    docs.write("spec.docx", "draft")?;
    docs.write("spec.bak", "backup")?;

    let settings: Settings = "ignore = [\"*.bak\"]".parse()?;
    let scanner = Scanner::with_patterns(settings.ignore);
    let ignore = scanner.ignore_set(docs.path())?;
    assert_eq!(
        safe_list_files(docs.path(), &ignore)?,
        vec!["spec.docx".to_string()]
    );

    let mut meta = load_meta(docs.path())?;
    let result = track_file(&mut meta, docs.path(), "spec.bak", &ignore, &edit_on(10, ""));
    assert!(matches!(result, Err(TrackError::Ignored { .. })));
    track_file(&mut meta, docs.path(), "spec.docx", &ignore, &edit_on(10, ""))?;
    save_meta(docs.path(), &meta)?;

    let scan = scanner.scan(docs.path())?;
    assert_eq!(scan.rows().len(), 1);
    assert_eq!(scan.rows()[0].filename, "spec_rev1.0.0_20260210.docx");
    assert!(!scan.rows()[0].missing);
    assert!(docs.exists("spec.bak"));

    Ok(())
}

#[sealed_test]
fn missing_folder_is_reported_without_metadata() -> Result<()> {
    let config = std::env::current_dir()?.join("config");
    let gone = std::env::current_dir()?.join("gone");

    let mut registry = Registry::default();
    registry.add(&gone);
    registry.save(registry_path(&config))?;

    let scanner = Scanner::default();
    for folder in Registry::load(registry_path(&config))?.folders {
        assert_eq!(scanner.scan(&folder)?, FolderScan::Missing);
    }
    assert!(!gone.exists());

    Ok(())
}
