//! Interactive valve editor.
//!
//! Alternates between the terminal form ([`valveform::ui::edit_form`]) and
//! backend calls: the form is shown, the chosen action runs against the
//! server, and the form comes back with the result in its status line.

use anyhow::Result;
use colored::Colorize;
use valveform::{
    api::Pipeline,
    session::{SwitchOutcome, ValveSession},
    ui::{self, EditAction},
};

use crate::ctx::{AppContext, ask};

/// Handler for the `edit` command.
pub struct EditHandler;

impl EditHandler {
    /// Runs the editor, starting at `pipeline_id` or at a picker.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline list cannot be fetched or the
    /// terminal UI fails. Load and save failures are shown in the editor.
    pub async fn handle_edit(ctx: &AppContext, pipeline_id: Option<String>) -> Result<()> {
        let pipelines = ctx.client.list_pipelines().await?;
        if pipelines.is_empty() && pipeline_id.is_none() {
            println!("{}", "No pipelines".yellow());
            return Ok(());
        }

        let Some(first) = pipeline_id.or_else(|| ui::pick_pipeline(&pipelines, None)) else {
            return Ok(());
        };

        let mut session = ValveSession::new();
        let mut notice = Self::switch(ctx, &mut session, &first).await;

        loop {
            let Some(current) = session.selected().map(str::to_string) else {
                break;
            };

            let Some(form) = session.form().cloned() else {
                if let Some(msg) = notice.take() {
                    eprintln!("{}", msg.red());
                }
                match ui::pick_pipeline(&pipelines, Some(&current)) {
                    Some(next) => {
                        notice = Self::switch(ctx, &mut session, &next).await;
                        continue;
                    }
                    None => break,
                }
            };

            let title = format!("Valves: {}", Self::title(&pipelines, &current));
            let outcome = ui::edit_form(&title, form, notice.take().as_deref())?;
            if let Some(form) = session.form_mut() {
                *form = outcome.form;
            }

            match outcome.action {
                EditAction::Save => {
                    notice = Some(match session.save(&ctx.client).await {
                        Ok(()) => {
                            info!("saved valves of {current}");
                            "Saved".to_string()
                        }
                        Err(e) => {
                            error!("saving valves of {current} failed: {e}");
                            format!("Save failed: {e}")
                        }
                    });
                }
                EditAction::Switch => {
                    let Some(next) = ui::pick_pipeline(&pipelines, Some(&current)) else {
                        continue;
                    };
                    if next != current {
                        notice = Self::switch(ctx, &mut session, &next).await;
                    }
                }
                EditAction::Quit => break,
            }
        }
        Ok(())
    }

    /// Switch pipelines; returns the notice for the next editor round.
    async fn switch(ctx: &AppContext, session: &mut ValveSession, id: &str) -> Option<String> {
        match session.switch_to(&ctx.client, id, &mut ask).await {
            Ok(SwitchOutcome::Declined) => Some("Switch cancelled".to_string()),
            Ok(SwitchOutcome::Superseded) => {
                warn!("response for {id} arrived after a newer selection");
                None
            }
            Ok(_) => None,
            Err(e) => {
                error!("loading valves of {id} failed: {e}");
                Some(format!("Failed to load valves of {id}: {e}"))
            }
        }
    }

    fn title(pipelines: &[Pipeline], id: &str) -> String {
        match pipelines.iter().find(|p| p.id == id) {
            Some(p) if p.display_name() != id => format!("{} ({id})", p.display_name()),
            _ => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title() {
        let pipelines = vec![
            Pipeline {
                id: "rate_limit".into(),
                name: "Rate Limit".into(),
                kind: Some("filter".into()),
                url: None,
            },
            Pipeline {
                id: "echo".into(),
                name: String::new(),
                kind: None,
                url: None,
            },
        ];
        assert_eq!(EditHandler::title(&pipelines, "rate_limit"), "Rate Limit (rate_limit)");
        assert_eq!(EditHandler::title(&pipelines, "echo"), "echo");
        assert_eq!(EditHandler::title(&pipelines, "gone"), "gone");
    }
}
