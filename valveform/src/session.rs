//! Pipeline selection and valve save orchestration.
//!
//! A [`ValveSession`] owns the form of the selected pipeline. Every selection
//! bumps a generation counter and hands out a [`Ticket`]; a fetched form is
//! only mounted if its ticket is still the latest one, so a slow response for
//! a pipeline the user already left can never overwrite the newer form.
//!
//! ```rust,no_run
//! use valveform::{api::{ApiConfig, PipelineClient}, session::ValveSession};
//!
//! # async fn demo() -> valveform::Result<()> {
//! let api = PipelineClient::new(&ApiConfig::new("http://localhost:8000"))?;
//! let mut session = ValveSession::new();
//! session.switch_to(&api, "rate_limit", &mut |_: &str| async { true }).await?;
//! if let Some(form) = session.form_mut() {
//!     form.set_text("priority", "3")?;
//! }
//! session.save(&api).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use crate::{
    api::ValveApi,
    data::{FormState, SpecMap, ValveValues, coerce::serialize_form},
    error::{Result, ValveError},
};

/// Question asked before discarding unsaved edits.
pub const UNSAVED_PROMPT: &str =
    "You have unsaved changes. Switch pipeline and discard them?";

/// Awaited yes/no decision from the user.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> impl Future<Output = bool>;
}

impl<F, Fut> Confirm for F
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = bool>,
{
    fn confirm(&mut self, message: &str) -> impl Future<Output = bool> {
        self(message)
    }
}

/// Proof of a selection, checked when its data arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub pipeline_id: String,
    generation: u64,
}

/// Spec and values fetched for a ticket, not yet mounted.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub ticket: Ticket,
    pub specs: SpecMap,
    pub values: ValveValues,
}

/// Result of [`ValveSession::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Selection accepted; fetch with this ticket.
    Pending(Ticket),
    /// Empty id: nothing is selected any more.
    Cleared,
    /// The user kept the unsaved edits; the previous selection stands.
    Declined,
}

/// Result of [`ValveSession::switch_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Loaded,
    Cleared,
    Declined,
    /// A newer selection was made while this one was loading.
    Superseded,
}

/// Selected pipeline and its mounted form.
///
/// Saving borrows the session mutably, so at most one save is in flight
/// and no selection can change underneath it.
#[derive(Debug, Default)]
pub struct ValveSession {
    selected: Option<String>,
    form: Option<FormState>,
    generation: u64,
}

impl ValveSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        self.form.as_mut()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.form.as_ref().is_some_and(FormState::has_unsaved_changes)
    }

    /// Whether `ticket` belongs to the latest selection.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// Change the selected pipeline.
    ///
    /// With unsaved edits the user is asked first; declining leaves the
    /// session untouched. Accepting unmounts the current form.
    pub async fn select<C: Confirm>(&mut self, pipeline_id: &str, confirm: &mut C) -> Selection {
        if self.has_unsaved_changes() && !confirm.confirm(UNSAVED_PROMPT).await {
            info!("kept unsaved changes of {:?}", self.selected);
            return Selection::Declined;
        }

        self.generation += 1;
        self.form = None;

        if pipeline_id.is_empty() {
            self.selected = None;
            return Selection::Cleared;
        }

        self.selected = Some(pipeline_id.to_string());
        Selection::Pending(self.ticket(pipeline_id))
    }

    fn ticket(&self, pipeline_id: &str) -> Ticket {
        Ticket {
            pipeline_id: pipeline_id.to_string(),
            generation: self.generation,
        }
    }

    /// Fetch spec, then values, for a ticket.
    pub async fn fetch<A: ValveApi>(api: &A, ticket: Ticket) -> Result<Loaded> {
        let specs = api.valve_spec(&ticket.pipeline_id).await?;
        let values = api.valves(&ticket.pipeline_id).await?;
        debug!(
            "fetched {} valves / {} specs for {}",
            values.len(),
            specs.len(),
            ticket.pipeline_id
        );
        Ok(Loaded {
            ticket,
            specs,
            values,
        })
    }

    /// Mount fetched data unless a newer selection superseded it.
    pub fn install(&mut self, loaded: Loaded) -> bool {
        if !self.is_current(&loaded.ticket) {
            warn!(
                "dropping stale valves of {} (generation {}, current {})",
                loaded.ticket.pipeline_id, loaded.ticket.generation, self.generation
            );
            return false;
        }
        self.form = Some(FormState::build(&loaded.values, &loaded.specs));
        true
    }

    /// Select a pipeline and load its form.
    pub async fn switch_to<A: ValveApi, C: Confirm>(
        &mut self,
        api: &A,
        pipeline_id: &str,
        confirm: &mut C,
    ) -> Result<SwitchOutcome> {
        let ticket = match self.select(pipeline_id, confirm).await {
            Selection::Pending(ticket) => ticket,
            Selection::Cleared => return Ok(SwitchOutcome::Cleared),
            Selection::Declined => return Ok(SwitchOutcome::Declined),
        };
        let loaded = Self::fetch(api, ticket).await?;
        if self.install(loaded) {
            Ok(SwitchOutcome::Loaded)
        } else {
            Ok(SwitchOutcome::Superseded)
        }
    }

    /// Reload the selected pipeline, replacing the form.
    pub async fn reload<A: ValveApi>(&mut self, api: &A) -> Result<()> {
        let pipeline_id = self.selected.clone().ok_or(ValveError::NoSelection)?;
        self.generation += 1;
        let loaded = Self::fetch(api, self.ticket(&pipeline_id)).await?;
        self.install(loaded);
        Ok(())
    }

    /// Submit the edited form.
    ///
    /// The spec is fetched again so nullability reflects the backend at
    /// save time. Any conversion error aborts before the update request;
    /// a failed request leaves the form as it was. On success the form is
    /// reloaded from the backend.
    pub async fn save<A: ValveApi>(&mut self, api: &A) -> Result<()> {
        let pipeline_id = self.selected.clone().ok_or(ValveError::NoSelection)?;
        self.submit(api, &pipeline_id).await?;

        if let Some(form) = self.form.as_mut() {
            form.mark_saved();
        }
        info!("valves of {pipeline_id} saved");
        self.reload(api).await
    }

    async fn submit<A: ValveApi>(&self, api: &A, pipeline_id: &str) -> Result<()> {
        let form = self.form.as_ref().ok_or(ValveError::NoSelection)?;
        let specs = api.valve_spec(pipeline_id).await?;
        let payload = serialize_form(form, &specs)?;
        debug!("submitting valves of {pipeline_id}: {payload:?}");
        api.update_valves(pipeline_id, &payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_without_changes_needs_no_prompt() {
        let mut session = ValveSession::new();
        let mut asked = 0;
        let outcome = tokio_test::block_on(session.select("a", &mut |_: &str| {
            asked += 1;
            async { false }
        }));
        assert!(matches!(outcome, Selection::Pending(ref t) if t.pipeline_id == "a"));
        assert_eq!(asked, 0);
        assert_eq!(session.selected(), Some("a"));
    }

    #[test]
    fn test_empty_selection_clears() {
        let mut session = ValveSession::new();
        let mut yes = |_: &str| async { true };
        tokio_test::block_on(session.select("a", &mut yes));
        let outcome = tokio_test::block_on(session.select("", &mut yes));
        assert_eq!(outcome, Selection::Cleared);
        assert_eq!(session.selected(), None);
        assert!(session.form().is_none());
    }

    #[test]
    fn test_stale_ticket_is_not_installed() {
        let mut session = ValveSession::new();
        let mut yes = |_: &str| async { true };
        let Selection::Pending(first) = tokio_test::block_on(session.select("a", &mut yes)) else {
            panic!("expected a ticket");
        };
        let Selection::Pending(second) = tokio_test::block_on(session.select("b", &mut yes)) else {
            panic!("expected a ticket");
        };
        assert!(!session.is_current(&first));
        assert!(session.is_current(&second));

        let stale = Loaded {
            ticket: first,
            specs: SpecMap::default(),
            values: ValveValues::new(),
        };
        assert!(!session.install(stale));
        assert!(session.form().is_none());

        let fresh = Loaded {
            ticket: second,
            specs: SpecMap::default(),
            values: ValveValues::new(),
        };
        assert!(session.install(fresh));
        assert!(session.form().is_some());
    }
}
