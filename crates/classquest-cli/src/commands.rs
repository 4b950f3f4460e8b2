//! Command execution.
//!
//! Each command returns the text to print so the formatting can be tested
//! without capturing stdout.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use classquest_core::{
    ClassQuestConfig, Decoded, DocumentFile, Session, avatar_stage_index, class_progress,
};
use classquest_progress::ProgressView;
use classquest_types::AppState;
use serde::Serialize;

use crate::cli::Command;

/// Run `command` and return its output.
pub async fn run(command: Command, config: &ClassQuestConfig) -> anyhow::Result<String> {
    match command {
        Command::Check { file, json } => check(&file, json).await,
        Command::Migrate { file, output } => migrate(&file, output.as_deref()).await,
        Command::Progress { file, json } => progress(file.as_deref(), json, config).await,
        Command::Import { file } => import(&file, config).await,
        Command::Export { output } => export(output.as_deref(), config).await,
    }
}

async fn read_document(file: &Path) -> anyhow::Result<Decoded> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    DocumentFile::decode_report(&text).with_context(|| format!("{} was rejected", file.display()))
}

async fn check(file: &Path, json: bool) -> anyhow::Result<String> {
    let decoded = read_document(file).await?;
    tracing::info!(
        path = %file.display(),
        repairs = decoded.repairs.len(),
        "Document checked"
    );
    if json {
        return Ok(serde_json::to_string_pretty(&CheckReport::from(&decoded))?);
    }
    Ok(render_check(&decoded))
}

async fn migrate(file: &Path, output: Option<&Path>) -> anyhow::Result<String> {
    let decoded = read_document(file).await?;
    let target = output.unwrap_or(file);
    DocumentFile::new(target).save(&decoded.state).await?;
    Ok(format!(
        "Wrote {} (version {} -> {}, {} repairs)",
        target.display(),
        decoded.stored_version,
        decoded.state.version,
        decoded.repairs.len()
    ))
}

async fn progress(
    file: Option<&Path>,
    json: bool,
    config: &ClassQuestConfig,
) -> anyhow::Result<String> {
    let state = match file {
        Some(file) => read_document(file).await?.state,
        None => Session::open(config).await?.state().clone(),
    };
    let report = ProgressReport::from(&state);
    if json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }
    Ok(render_progress(&report))
}

async fn import(file: &Path, config: &ClassQuestConfig) -> anyhow::Result<String> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut session = Session::open(config).await?;
    let repairs = session
        .import(&text)
        .with_context(|| format!("{} was rejected", file.display()))?;
    session.save().await?;

    let mut out = format!(
        "Imported {} students into {} ({} repairs)",
        session.state().students.len(),
        session.document().path().display(),
        repairs.len()
    );
    let unlinked = session.unlinked_asset_keys().await?;
    if !unlinked.is_empty() {
        tracing::warn!(count = unlinked.len(), "Imported document references missing media");
        let _ = write!(out, "\nMissing media, upload again: {}", unlinked.join(", "));
    }
    Ok(out)
}

async fn export(output: Option<&Path>, config: &ClassQuestConfig) -> anyhow::Result<String> {
    let session = Session::open(config).await?;
    let text = session.export()?;
    match output {
        Some(path) => {
            tokio::fs::write(path, text.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(format!("Exported to {}", path.display()))
        }
        None => Ok(text),
    }
}

/// Machine-readable result of `check`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    stored_version: u32,
    version: u32,
    students: usize,
    repairs: &'a [classquest_schema::FieldRepair],
}

impl<'a> From<&'a Decoded> for CheckReport<'a> {
    fn from(decoded: &'a Decoded) -> Self {
        Self {
            stored_version: decoded.stored_version,
            version: decoded.state.version,
            students: decoded.state.students.len(),
            repairs: &decoded.repairs,
        }
    }
}

fn render_check(decoded: &Decoded) -> String {
    let mut out = format!(
        "version {} -> {}, {} students",
        decoded.stored_version,
        decoded.state.version,
        decoded.state.students.len()
    );
    if decoded.repairs.is_empty() {
        out.push_str("\nclean: no repairs needed");
        return out;
    }
    let _ = write!(out, "\n{} repairs:", decoded.repairs.len());
    for repair in &decoded.repairs {
        let _ = write!(out, "\n  {repair}");
    }
    out
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentLine {
    id: String,
    alias: String,
    xp: i64,
    level: u32,
    avatar_stage: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressReport {
    class_name: String,
    progress: ProgressView,
    students: Vec<StudentLine>,
}

impl From<&AppState> for ProgressReport {
    fn from(state: &AppState) -> Self {
        let progress = class_progress(state);
        let thresholds = &state.settings.avatar_stage_thresholds;
        Self {
            class_name: state.settings.class_name.clone(),
            progress: ProgressView::project(&progress, &state.settings.class_stars_name),
            students: state
                .students
                .iter()
                .map(|s| StudentLine {
                    id: s.id.as_str().to_owned(),
                    alias: s.alias.clone(),
                    xp: s.xp,
                    level: s.level,
                    avatar_stage: avatar_stage_index(s.level, thresholds),
                })
                .collect(),
        }
    }
}

fn render_progress(report: &ProgressReport) -> String {
    let mut out = format!("{}: {}", report.class_name, report.progress.label);
    for student in &report.students {
        let _ = write!(
            out,
            "\n  {:<16} {:>6} XP  level {:<3} stage {}",
            student.alias,
            student.xp,
            student.level,
            student.avatar_stage.saturating_add(1)
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use classquest_schema::CURRENT_VERSION;

    use super::*;

    const LEGACY: &str = r#"{
        "version": 1,
        "settings": { "className": "5c", "classMilestoneStep": 500 },
        "students": [
            { "id": "a", "alias": "Ada", "xp": 620 },
            { "id": "b", "alias": "Ben", "xp": "130" }
        ]
    }"#;

    fn config_in(dir: &Path) -> ClassQuestConfig {
        let mut config = ClassQuestConfig::default();
        config.storage.document_path = dir.join("state.json");
        config.storage.blob_dir = dir.join("blobs");
        config
    }

    #[tokio::test(flavor = "current_thread")]
    async fn check_lists_repairs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        std::fs::write(&file, LEGACY).unwrap();

        let text = check(&file, false).await.unwrap();
        assert!(text.starts_with(&format!("version 1 -> {CURRENT_VERSION}, 2 students")));
        assert!(text.contains("students[1].xp: coerced"));

        let json: serde_json::Value =
            serde_json::from_str(&check(&file, true).await.unwrap()).unwrap();
        assert_eq!(json["storedVersion"], 1);
        assert_eq!(json["students"], 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn migrate_writes_a_clean_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        let out = dir.path().join("current.json");
        std::fs::write(&file, LEGACY).unwrap();

        migrate(&file, Some(&out)).await.unwrap();
        let text = check(&out, false).await.unwrap();
        assert!(text.contains("clean: no repairs needed"), "{text}");
        assert_eq!(std::fs::read_to_string(&file).unwrap(), LEGACY);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn progress_reports_stars_and_stages() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        std::fs::write(&file, LEGACY).unwrap();
        let config = config_in(dir.path());

        let text = progress(Some(&file), false, &config).await.unwrap();
        assert!(text.starts_with("5c: 1 Stars · 250 / 500 XP · 250 XP to go"), "{text}");
        assert!(text.contains("Ada"));

        let json: serde_json::Value =
            serde_json::from_str(&progress(Some(&file), true, &config).await.unwrap()).unwrap();
        assert_eq!(json["progress"]["stars"], 1);
        assert_eq!(json["students"][0]["level"], 7);
        assert_eq!(json["students"][0]["avatarStage"], 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn import_then_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        std::fs::write(&file, LEGACY).unwrap();
        let config = config_in(dir.path());

        let text = import(&file, &config).await.unwrap();
        assert!(text.starts_with("Imported 2 students"), "{text}");
        assert!(config.storage.document_path.exists());

        let exported = export(None, &config).await.unwrap();
        let decoded = DocumentFile::decode_report(&exported).unwrap();
        assert!(decoded.repairs.is_empty(), "{:?}", decoded.repairs);
        assert_eq!(decoded.state.settings.class_name, "5c");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejected_import_keeps_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, LEGACY).unwrap();
        std::fs::write(&bad, r#"{ "version": 77 }"#).unwrap();

        import(&good, &config).await.unwrap();
        let before = std::fs::read_to_string(&config.storage.document_path).unwrap();
        assert!(import(&bad, &config).await.is_err());
        assert_eq!(
            std::fs::read_to_string(&config.storage.document_path).unwrap(),
            before
        );
    }
}
