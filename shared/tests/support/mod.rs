#![allow(dead_code)]

use crux_core::capability::Operation;
use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use serde_json::{json, Value};

use health_report_core::capabilities::{
    BearerToken, IdentityOperation, IdentityOutput, MultipartOperation, MultipartRequest,
    MultipartResponse, MultipartResult, SubscriptionId, TimerOperation, TimerOutput,
};
use health_report_core::model::UserId;
use health_report_core::{App, Effect, Event, Model, ReportId, Session};

pub type Tester = AppTester<App, Effect>;

pub const TOKEN: &str = "header.payload.signature";

/// Effects of one step, split by capability.
#[derive(Default)]
pub struct Effects {
    pub http: Vec<Request<HttpRequest>>,
    pub multipart: Vec<Request<MultipartOperation>>,
    pub identity: Vec<Request<IdentityOperation>>,
    pub timer: Vec<Request<TimerOperation>>,
    pub renders: usize,
}

impl Effects {
    fn from_vec(effects: Vec<Effect>) -> Self {
        let mut out = Self::default();
        for effect in effects {
            match effect {
                Effect::Http(r) => out.http.push(r),
                Effect::Multipart(r) => out.multipart.push(r),
                Effect::Identity(r) => out.identity.push(r),
                Effect::Timer(r) => out.timer.push(r),
                Effect::Render(_) => out.renders += 1,
            }
        }
        out
    }

    fn extend(&mut self, other: Effects) {
        self.http.extend(other.http);
        self.multipart.extend(other.multipart);
        self.identity.extend(other.identity);
        self.timer.extend(other.timer);
        self.renders += other.renders;
    }

    /// No request to the outside world, renders aside.
    pub fn is_quiet(&self) -> bool {
        self.http.is_empty()
            && self.multipart.is_empty()
            && self.identity.is_empty()
            && self.timer.is_empty()
    }

    pub fn take_http(&mut self) -> Request<HttpRequest> {
        assert_eq!(self.http.len(), 1, "expected exactly one http request");
        self.http.remove(0)
    }

    pub fn take_multipart(&mut self) -> Request<MultipartOperation> {
        assert_eq!(self.multipart.len(), 1, "expected exactly one upload");
        self.multipart.remove(0)
    }

    pub fn take_identity(&mut self) -> Request<IdentityOperation> {
        assert_eq!(self.identity.len(), 1, "expected exactly one identity request");
        self.identity.remove(0)
    }

    pub fn take_timer(&mut self) -> Request<TimerOperation> {
        assert_eq!(self.timer.len(), 1, "expected exactly one timer request");
        self.timer.remove(0)
    }
}

/// Sends an event and feeds every resulting event back in.
pub fn send(app: &Tester, model: &mut Model, event: Event) -> Effects {
    let update = app.update(event, model);
    let mut effects = Effects::from_vec(update.effects);
    for event in update.events {
        effects.extend(send(app, model, event));
    }
    effects
}

pub fn resolve<Op: Operation>(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<Op>,
    output: Op::Output,
) -> Effects {
    let update = app.resolve(request, output).expect("request should resolve");
    let mut effects = Effects::from_vec(update.effects);
    for event in update.events {
        effects.extend(send(app, model, event));
    }
    effects
}

pub fn session() -> Session {
    Session {
        user_id: UserId::new("user-1"),
        display_name: Some("Ada Lovelace".into()),
        email: Some("ada@example.com".into()),
        photo_url: None,
    }
}

pub fn other_session() -> Session {
    Session {
        user_id: UserId::new("user-2"),
        display_name: Some("Grace Hopper".into()),
        email: None,
        photo_url: None,
    }
}

pub fn report_json(id: u64) -> Value {
    json!({
        "id": id,
        "report_type": "lab",
        "report_date": "2024-03-01",
        "file_url": format!("https://cdn.example.com/reports/{id}.png"),
        "ai_summary": "All values within range."
    })
}

pub fn reports_response(ids: &[u64]) -> HttpResult {
    let body: Vec<Value> = ids.iter().copied().map(report_json).collect();
    HttpResult::Ok(HttpResponse::ok().json(&body).build())
}

pub fn status(code: u16) -> HttpResult {
    HttpResult::Ok(HttpResponse::status(code).build())
}

pub fn upload_response(code: u16, body: &Value) -> MultipartResult {
    Ok(MultipartResponse::new(code, serde_json::to_vec(body).unwrap()))
}

pub fn report_ids(model: &Model) -> Vec<String> {
    model.reports().iter().map(|r| r.id.to_string()).collect()
}

pub fn id(value: &str) -> ReportId {
    ReportId::new(value)
}

/// Header lookup on an outgoing `crux_http` request, ignoring name case.
pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

pub fn multipart_request(request: &Request<MultipartOperation>) -> &MultipartRequest {
    let MultipartOperation::Send(inner) = &request.operation;
    inner
}

// --- Flow steps ---

/// Mounts and answers the subscription with `current`.
pub fn mount(app: &Tester, model: &mut Model, current: Option<Session>) -> Effects {
    let mut effects = send(app, model, Event::Mounted);
    let mut subscribe = effects.take_identity();
    assert_eq!(subscribe.operation, IdentityOperation::Subscribe);
    resolve(
        app,
        model,
        &mut subscribe,
        Ok(IdentityOutput::Subscribed {
            subscription: SubscriptionId("sub-1".into()),
            current,
        }),
    )
}

/// Fires the pending settle timer.
pub fn settle(app: &Tester, model: &mut Model, effects: &mut Effects) -> Effects {
    let mut timer = effects.take_timer();
    let TimerOperation::Start { id, .. } = timer.operation.clone() else {
        panic!("expected a timer start");
    };
    resolve(app, model, &mut timer, TimerOutput::Fired { id })
}

/// Answers the pending token request with a valid token.
pub fn mint(app: &Tester, model: &mut Model, effects: &mut Effects) -> Effects {
    let mut request = effects.take_identity();
    assert!(matches!(
        request.operation,
        IdentityOperation::MintToken { .. }
    ));
    resolve(
        app,
        model,
        &mut request,
        Ok(IdentityOutput::Token(BearerToken::new(TOKEN))),
    )
}

pub fn respond(app: &Tester, model: &mut Model, effects: &mut Effects, result: HttpResult) -> Effects {
    let mut request = effects.take_http();
    resolve(app, model, &mut request, result)
}

pub fn respond_upload(
    app: &Tester,
    model: &mut Model,
    effects: &mut Effects,
    result: MultipartResult,
) -> Effects {
    let mut request = effects.take_multipart();
    resolve(app, model, &mut request, result)
}

/// Mount with a signed-in user and load the given report ids.
pub fn signed_in_with_reports(app: &Tester, model: &mut Model, ids: &[u64]) {
    let mut effects = mount(app, model, Some(session()));
    let mut effects = settle(app, model, &mut effects);
    let mut effects = mint(app, model, &mut effects);
    let effects = respond(app, model, &mut effects, reports_response(ids));
    assert!(effects.is_quiet());
}
