use std::{
    collections::HashMap,
    future::{Ready, ready},
    sync::Mutex,
};

use serde_json::{Value, json};
use valveform::{
    ValveError,
    api::{ValveApi, api_error},
    data::{FieldInput, SpecMap, ValveValues},
    session::{Selection, SwitchOutcome, ValveSession},
};

#[derive(Default)]
struct FakeApi {
    specs: Mutex<HashMap<String, Value>>,
    values: Mutex<HashMap<String, Value>>,
    updates: Mutex<Vec<(String, ValveValues)>>,
    spec_calls: Mutex<usize>,
    reject_update: Option<(u16, &'static str)>,
}

impl FakeApi {
    fn with_pipeline(self, id: &str, specs: Value, values: Value) -> Self {
        self.specs.lock().unwrap().insert(id.to_string(), specs);
        self.values.lock().unwrap().insert(id.to_string(), values);
        self
    }

    fn set_specs(&self, id: &str, specs: Value) {
        self.specs.lock().unwrap().insert(id.to_string(), specs);
    }

    fn updates(&self) -> Vec<(String, ValveValues)> {
        self.updates.lock().unwrap().clone()
    }

    fn spec_calls(&self) -> usize {
        *self.spec_calls.lock().unwrap()
    }
}

impl ValveApi for FakeApi {
    async fn valve_spec(&self, pipeline_id: &str) -> valveform::Result<SpecMap> {
        *self.spec_calls.lock().unwrap() += 1;
        let doc = self.specs.lock().unwrap().get(pipeline_id).cloned();
        match doc {
            Some(doc) => Ok(SpecMap::from_json(doc)),
            None => Err(api_error(404, br#"{"detail": "pipeline not found"}"#)),
        }
    }

    async fn valves(&self, pipeline_id: &str) -> valveform::Result<ValveValues> {
        let doc = self.values.lock().unwrap().get(pipeline_id).cloned();
        match doc {
            Some(Value::Object(map)) => Ok(map),
            _ => Err(api_error(404, b"")),
        }
    }

    async fn update_valves(
        &self,
        pipeline_id: &str,
        valves: &ValveValues,
    ) -> valveform::Result<Value> {
        if let Some((status, detail)) = self.reject_update {
            let body = json!({ "detail": detail }).to_string();
            return Err(api_error(status, body.as_bytes()));
        }
        self.updates
            .lock()
            .unwrap()
            .push((pipeline_id.to_string(), valves.clone()));
        self.values
            .lock()
            .unwrap()
            .insert(pipeline_id.to_string(), Value::Object(valves.clone()));
        Ok(json!({"status": "success"}))
    }
}

fn rate_limit_specs() -> Value {
    json!({
        "pipelines": {"type": "array", "title": "Pipelines"},
        "priority": {"anyOf": [{"type": "integer"}, {"type": "null"}]},
        "requests_per_minute": {"anyOf": [{"type": "integer"}, {"type": "null"}]},
        "enabled": {"type": "boolean"},
        "headers": {"type": "object"},
        "ratio": {"type": "number"},
    })
}

fn rate_limit_values() -> Value {
    json!({
        "pipelines": ["*"],
        "priority": 0,
        "requests_per_minute": 10,
        "enabled": true,
        "headers": {},
        "ratio": 0.5,
    })
}

fn api() -> FakeApi {
    FakeApi::default()
        .with_pipeline("rate_limit", rate_limit_specs(), rate_limit_values())
        .with_pipeline("echo", json!({}), json!({"prefix": ">"}))
}

fn yes() -> impl FnMut(&str) -> Ready<bool> {
    |_: &str| ready(true)
}

fn no() -> impl FnMut(&str) -> Ready<bool> {
    |_: &str| ready(false)
}

async fn loaded(api: &FakeApi, id: &str) -> ValveSession {
    let mut session = ValveSession::new();
    let outcome = session.switch_to(api, id, &mut yes()).await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Loaded);
    session
}

#[tokio::test]
async fn save_submits_typed_document_once() {
    let api = api();
    let mut session = loaded(&api, "rate_limit").await;

    let form = session.form_mut().unwrap();
    form.set_text("pipelines", "a, b, c").unwrap();
    form.set_text("priority", "").unwrap();
    form.set_text("requests_per_minute", "").unwrap();
    form.set_input("enabled", FieldInput::Checked(false)).unwrap();
    form.set_text("ratio", "2").unwrap();
    assert!(session.has_unsaved_changes());

    session.save(&api).await.unwrap();

    let updates = api.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "rate_limit");
    assert_eq!(
        Value::Object(updates[0].1.clone()),
        json!({
            "pipelines": ["a", "b", "c"],
            "priority": 0,
            "requests_per_minute": null,
            "enabled": false,
            "headers": {},
            "ratio": 2,
        })
    );

    assert!(!session.has_unsaved_changes());
    let form = session.form().unwrap();
    assert_eq!(
        form.field("pipelines").unwrap().current,
        FieldInput::text("[\n  \"a\",\n  \"b\",\n  \"c\"\n]")
    );
    assert_eq!(form.field("enabled").unwrap().current, FieldInput::Checked(false));
}

#[tokio::test]
async fn invalid_json_aborts_before_request() {
    let api = api();
    let mut session = loaded(&api, "rate_limit").await;
    session
        .form_mut()
        .unwrap()
        .set_text("headers", "{\"x\": ")
        .unwrap();

    let err = session.save(&api).await.unwrap_err();
    assert!(matches!(err, ValveError::InvalidJson { ref key, .. } if key == "headers"));
    assert!(api.updates().is_empty());
    assert!(session.has_unsaved_changes());
}

#[tokio::test]
async fn rejected_update_keeps_form() {
    let api = FakeApi {
        reject_update: Some((400, "valves rejected")),
        ..api()
    };
    let mut session = loaded(&api, "rate_limit").await;
    session.form_mut().unwrap().set_text("ratio", "0.75").unwrap();

    let err = session.save(&api).await.unwrap_err();
    assert_eq!(err.to_string(), "valves rejected");
    assert!(session.has_unsaved_changes());
    assert_eq!(
        session.form().unwrap().field("ratio").unwrap().current,
        FieldInput::text("0.75")
    );
}

#[tokio::test]
async fn save_reads_nullability_at_save_time() {
    let api = api();
    let mut session = loaded(&api, "rate_limit").await;
    session.form_mut().unwrap().set_text("ratio", "").unwrap();

    api.set_specs(
        "rate_limit",
        json!({"ratio": {"anyOf": [{"type": "number"}, {"type": "null"}]}}),
    );
    let calls_before = api.spec_calls();
    session.save(&api).await.unwrap();

    assert!(api.spec_calls() > calls_before);
    assert_eq!(api.updates()[0].1["ratio"], Value::Null);
}

#[tokio::test]
async fn switching_with_unsaved_changes_asks_first() {
    let api = api();
    let mut session = loaded(&api, "rate_limit").await;
    session.form_mut().unwrap().set_text("ratio", "9").unwrap();

    let outcome = session.switch_to(&api, "echo", &mut no()).await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Declined);
    assert_eq!(session.selected(), Some("rate_limit"));
    assert!(session.has_unsaved_changes());

    let outcome = session.switch_to(&api, "echo", &mut yes()).await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Loaded);
    assert_eq!(session.selected(), Some("echo"));
    assert!(!session.has_unsaved_changes());
    assert!(session.form().unwrap().field("prefix").is_some());
}

#[tokio::test]
async fn late_response_for_old_selection_is_dropped() {
    let api = api();
    let mut session = ValveSession::new();

    let Selection::Pending(first) = session.select("rate_limit", &mut yes()).await else {
        panic!("expected a ticket");
    };
    let Selection::Pending(second) = session.select("echo", &mut yes()).await else {
        panic!("expected a ticket");
    };

    let (old, new) = tokio::join!(
        ValveSession::fetch(&api, first),
        ValveSession::fetch(&api, second)
    );
    assert!(session.install(new.unwrap()));
    assert!(!session.install(old.unwrap()));

    let form = session.form().unwrap();
    assert!(form.field("prefix").is_some());
    assert!(form.field("priority").is_none());
}

#[tokio::test]
async fn save_without_selection_fails() {
    let api = api();
    let mut session = ValveSession::new();
    assert!(matches!(
        session.save(&api).await,
        Err(ValveError::NoSelection)
    ));
    assert!(api.updates().is_empty());
}

#[tokio::test]
async fn failed_load_leaves_no_form() {
    let api = api();
    let mut session = ValveSession::new();
    let err = session.switch_to(&api, "missing", &mut yes()).await.unwrap_err();
    assert_eq!(err.to_string(), "pipeline not found");
    assert_eq!(session.selected(), Some("missing"));
    assert!(session.form().is_none());
    assert!(!session.has_unsaved_changes());
}

#[tokio::test]
async fn failed_save_can_be_retried() {
    let api = api();
    let mut session = loaded(&api, "rate_limit").await;
    let form = session.form_mut().unwrap();
    form.set_text("headers", "{").unwrap();
    assert!(session.save(&api).await.is_err());

    session.form_mut().unwrap().set_text("headers", "{\"x\": 1}").unwrap();
    session.save(&api).await.unwrap();

    let updates = api.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1["headers"], json!({"x": 1}));
    assert!(!session.has_unsaved_changes());
}
