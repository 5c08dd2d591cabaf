//! Non-interactive pipeline commands.

use std::{future::ready, path::Path};

use anyhow::{Context, bail};
use colored::Colorize;
use tokio::fs;
use valveform::{
    data::{FieldState, FormState},
    html,
    session::ValveSession,
};

use crate::{
    ctx::{AppContext, ask},
    utils::columns,
};

/// Parses `key=value` assignments of the `set` command.
pub fn parse_assignments(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|a| match a.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => bail!("expected key=value, got `{a}`"),
        })
        .collect()
}

/// Reads a pipeline file for upload, returning its name and content.
pub async fn read_upload(path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let content = fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "pipeline.py".to_string());
    Ok((file_name, content))
}

fn value_cell(field: &FieldState) -> String {
    let text = field.current.as_text();
    let line = text.lines().collect::<Vec<_>>().join(" ");
    if line.is_empty() {
        "(empty)".to_string()
    } else {
        line
    }
}

/// Table rows describing each field of `form`.
pub fn field_rows(form: &FormState) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "KEY".to_string(),
        "TYPE".to_string(),
        "VALUE".to_string(),
    ]];
    for field in form.fields() {
        let mut kind = field.field_type.to_string();
        if field.nullable {
            kind.push('?');
        }
        rows.push(vec![field.key.clone(), kind, value_cell(field)]);
    }
    rows
}

impl AppContext {
    async fn load_session(&self, pipeline_id: &str) -> anyhow::Result<ValveSession> {
        let mut session = ValveSession::new();
        session
            .switch_to(&self.client, pipeline_id, &mut |_: &str| ready(true))
            .await
            .with_context(|| format!("failed to load valves of `{pipeline_id}`"))?;
        Ok(session)
    }

    /// `valvectl list`
    pub async fn list_pipelines(&self) -> anyhow::Result<()> {
        let pipelines = self.client.list_pipelines().await?;
        if pipelines.is_empty() {
            println!("{}", "No pipelines".yellow());
            return Ok(());
        }

        let mut rows = vec![vec![
            "ID".to_string(),
            "NAME".to_string(),
            "TYPE".to_string(),
            "URL".to_string(),
        ]];
        rows.extend(pipelines.iter().map(|p| {
            vec![
                p.id.clone(),
                p.display_name().to_string(),
                p.kind_label().to_string(),
                p.url_label().to_string(),
            ]
        }));

        let mut lines = columns(&rows).into_iter();
        if let Some(header) = lines.next() {
            println!("{}", header.bold());
        }
        for line in lines {
            println!("{line}");
        }
        Ok(())
    }

    /// `valvectl show <id>`
    pub async fn show_valves(&self, pipeline_id: &str) -> anyhow::Result<()> {
        let session = self.load_session(pipeline_id).await?;
        let Some(form) = session.form() else {
            bail!("no valves loaded for `{pipeline_id}`");
        };
        if form.is_empty() {
            println!("{}", html::NO_VALVES.yellow());
            return Ok(());
        }

        let mut lines = columns(&field_rows(form)).into_iter();
        if let Some(header) = lines.next() {
            println!("{}", header.bold());
        }
        for (line, field) in lines.zip(form.fields()) {
            if field.invalid {
                println!("{}", line.red());
            } else {
                println!("{line}");
            }
        }
        Ok(())
    }

    /// `valvectl render <id> [-o file]`
    pub async fn render_valves(
        &self,
        pipeline_id: &str,
        output: Option<&Path>,
    ) -> anyhow::Result<()> {
        let session = self.load_session(pipeline_id).await?;
        let Some(form) = session.form() else {
            bail!("no valves loaded for `{pipeline_id}`");
        };
        let markup = html::render_form(form);

        match output {
            Some(path) => {
                fs::write(path, markup)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("{} {}", "Wrote".green(), path.display());
            }
            None => print!("{markup}"),
        }
        Ok(())
    }

    /// `valvectl set <id> key=value...`
    ///
    /// Assignments go through the same input path as the editors, so the
    /// saved document is typed exactly as an interactive save would be.
    pub async fn set_valves(&self, pipeline_id: &str, assignments: &[String]) -> anyhow::Result<()> {
        let assignments = parse_assignments(assignments)?;
        let mut session = self.load_session(pipeline_id).await?;
        let Some(form) = session.form_mut() else {
            bail!("no valves loaded for `{pipeline_id}`");
        };

        for (key, value) in &assignments {
            form.set_text(key, value)?;
            form.blur(key)?;
        }

        if !session.has_unsaved_changes() {
            println!("{}", "Nothing to change".yellow());
            return Ok(());
        }

        session.save(&self.client).await?;
        println!("{} valves of {pipeline_id}", "Saved".green());
        Ok(())
    }

    /// `valvectl upload <file>`
    pub async fn upload_pipeline(&self, path: &Path) -> anyhow::Result<()> {
        let (file_name, content) = read_upload(path).await?;
        self.client.upload_pipeline(&file_name, content).await?;
        println!("{} {}", "Uploaded".green(), path.display());
        Ok(())
    }

    /// `valvectl delete <id> [--yes]`
    pub async fn delete_pipeline(&self, pipeline_id: &str, yes: bool) -> anyhow::Result<()> {
        if !yes && !ask(&format!("Delete pipeline `{pipeline_id}`?")).await {
            println!("Cancelled");
            return Ok(());
        }
        self.client.delete_pipeline(pipeline_id).await?;
        println!("{} {pipeline_id}", "Deleted".green());
        Ok(())
    }
}
