use tracing::{debug, error, info, warn};

use crate::capabilities::{
    ApiResult, Capabilities, MultipartResult, SubscriptionId, TimerId, TimerOutput,
};
use crate::detail::DetailModal;
use crate::event::{CloseTrigger, Event, TokenResult};
use crate::model::{Lifecycle, ListState, Model, ReportId, Session, SummarySelection};
use crate::repository;
use crate::resolver::fallback_for;
use crate::upload::{check_token, UploadValidationError};
use crate::view::{self, ViewModel};
use crate::{AppError, ErrorScope, MSG_LOGIN_FAILED};

pub const ESCAPE_KEY: &str = "Escape";

#[derive(Default)]
pub struct App;

impl App {
    // --- Lifecycle ---

    fn mount(model: &mut Model, caps: &Capabilities) {
        if model.lifecycle != Lifecycle::Unmounted {
            warn!(lifecycle = ?model.lifecycle, "mount ignored");
            return;
        }
        model.lifecycle = Lifecycle::Mounting;
        caps.identity
            .subscribe(|result| Event::SessionSubscribed(Box::new(result)));
        caps.render.render();
    }

    /// Releases the subscription and the settle timer. Results of anything
    /// still in flight arrive after this and are dropped.
    fn tear_down(model: &mut Model, caps: &Capabilities) {
        if let Lifecycle::Mounted { subscription } = &model.lifecycle {
            caps.identity.unsubscribe(subscription.clone());
        }
        if let Some(timer) = model.settle_timer.take() {
            caps.timer.cancel(timer);
        }
        model.lifecycle = Lifecycle::TornDown;
        info!(
            fetch_in_flight = model.is_fetching(),
            deletes_in_flight = model.deletes_in_flight.len(),
            "torn down"
        );
    }

    /// The provider answered a subscribe that was sent before teardown.
    fn release_late_subscription(subscription: SubscriptionId, caps: &Capabilities) {
        debug!("releasing subscription granted after teardown");
        caps.identity.unsubscribe(subscription);
    }

    // --- Session ---

    fn apply_session(model: &mut Model, caps: &Capabilities, session: Option<Session>) {
        model.session_epoch += 1;
        if let Some(timer) = model.settle_timer.take() {
            caps.timer.cancel(timer);
        }

        match session {
            Some(session) => {
                info!(epoch = model.session_epoch, "session present, scheduling fetch");
                model.session = Some(session);
                model.auth_required = false;
                model.list = ListState::Loading;

                // The provider can report a user before its token is usable.
                let epoch = model.session_epoch;
                let id = TimerId(epoch);
                model.settle_timer = Some(id);
                caps.timer
                    .start(id, model.config.session_settle_delay_ms, move |output| {
                        Event::SessionSettled { epoch, output }
                    });
            }
            None => {
                info!(epoch = model.session_epoch, "session cleared");
                model.session = None;
                model.auth_required = true;
                model.list = ListState::Loaded(Vec::new());
                model.delete_confirmation = None;
                model.summary = None;
            }
        }
    }

    fn session_settled(model: &mut Model, caps: &Capabilities, epoch: u64, output: TimerOutput) {
        if model.settle_timer == Some(output.id()) {
            model.settle_timer = None;
        }
        if epoch != model.session_epoch {
            debug!(epoch, current = model.session_epoch, "stale settle timer dropped");
            return;
        }
        if let TimerOutput::Cancelled { .. } = output {
            debug!(epoch, "settle timer cancelled");
            return;
        }
        Self::start_fetch(model, caps);
    }

    // --- Report list ---

    /// Single-flight: a request while one is outstanding is dropped. If the
    /// outstanding one belongs to an older session, its result triggers a
    /// fresh fetch when it lands.
    fn start_fetch(model: &mut Model, caps: &Capabilities) {
        if model.session.is_none() {
            debug!("fetch skipped, no session");
            return;
        }
        if let Some(in_flight) = model.fetch_in_flight {
            debug!(in_flight, "fetch already in flight");
            return;
        }

        let epoch = model.session_epoch;
        model.fetch_in_flight = Some(epoch);
        model.list = ListState::Loading;
        debug!(epoch, "minting token for report list");
        caps.identity
            .mint_token(model.config.force_token_refresh, move |result| {
                Event::ListTokenMinted {
                    epoch,
                    result: Box::new(result),
                }
            });
    }

    fn list_token_minted(model: &mut Model, caps: &Capabilities, epoch: u64, result: TokenResult) {
        if epoch != model.session_epoch {
            Self::drop_stale_fetch(model, caps, epoch);
            return;
        }

        let call = result
            .map_err(|e| repository::token_error(&e))
            .and_then(|token| repository::list_call(&model.config, &token));

        match call {
            Ok(call) => {
                debug!(epoch, "fetching reports");
                caps.http
                    .get(call.url())
                    .header("Authorization", call.authorization().as_str())
                    .header("Content-Type", "application/json")
                    .send(move |result| Event::ReportsFetched {
                        epoch,
                        result: Box::new(result),
                    });
            }
            Err(e) => Self::finish_fetch(model, Err(e)),
        }
    }

    fn reports_fetched(
        model: &mut Model,
        caps: &Capabilities,
        epoch: u64,
        result: ApiResult,
    ) {
        if epoch != model.session_epoch {
            Self::drop_stale_fetch(model, caps, epoch);
            return;
        }
        Self::finish_fetch(model, repository::parse_list_response(result));
    }

    fn drop_stale_fetch(model: &mut Model, caps: &Capabilities, epoch: u64) {
        debug!(epoch, current = model.session_epoch, "stale fetch result dropped");
        model.fetch_in_flight = None;
        if model.session.is_some() && model.settle_timer.is_none() {
            Self::start_fetch(model, caps);
        }
    }

    fn finish_fetch(model: &mut Model, result: Result<Vec<crate::ReportRecord>, AppError>) {
        model.fetch_in_flight = None;
        match result {
            Ok(reports) => {
                info!(count = reports.len(), "reports loaded");
                model.list = ListState::Loaded(reports);
            }
            Err(e) => {
                warn!(code = e.code(), status = ?e.http_status, error = %e, "report fetch failed");
                model.list = ListState::Errored(e);
            }
        }
    }

    fn retry(model: &mut Model, caps: &Capabilities) {
        if !matches!(model.list, ListState::Errored(_)) {
            debug!("retry ignored outside the errored state");
            return;
        }
        Self::start_fetch(model, caps);
    }

    fn refresh(model: &mut Model, caps: &Capabilities) {
        if !matches!(model.list, ListState::Loaded(_) | ListState::Errored(_)) {
            debug!("refresh ignored while loading");
            return;
        }
        Self::start_fetch(model, caps);
    }

    // --- Delete ---

    fn request_delete(model: &mut Model, id: ReportId) {
        if model.session.is_none() {
            error!(report_id = %id, "delete requested without a session");
            return;
        }
        if model.find_report(&id).is_none() {
            warn!(report_id = %id, "delete requested for unknown report");
            return;
        }
        if model.deletes_in_flight.contains(&id) {
            debug!(report_id = %id, "delete already in flight");
            return;
        }
        model.delete_confirmation = Some(id);
    }

    fn confirm_delete(model: &mut Model, caps: &Capabilities) {
        let Some(id) = model.delete_confirmation.take() else {
            debug!("delete confirmed with nothing pending");
            return;
        };
        if model.session.is_none() {
            error!(report_id = %id, "delete confirmed without a session");
            return;
        }

        model.deletes_in_flight.insert(id.clone());
        caps.identity
            .mint_token(model.config.force_token_refresh, move |result| {
                Event::DeleteTokenMinted {
                    id,
                    result: Box::new(result),
                }
            });
    }

    fn delete_token_minted(model: &mut Model, caps: &Capabilities, id: ReportId, result: TokenResult) {
        if !model.deletes_in_flight.contains(&id) {
            return;
        }

        let call = result
            .map_err(|e| repository::token_error(&e))
            .and_then(|token| repository::delete_call(&model.config, &id, &token));

        match call {
            Ok(call) => {
                debug!(report_id = %id, "deleting report");
                caps.http
                    .delete(call.url())
                    .header("Authorization", call.authorization().as_str())
                    .header("Content-Type", "application/json")
                    .send(move |result| Event::ReportDeleted {
                        id,
                        result: Box::new(result),
                    });
            }
            Err(e) => Self::finish_delete(model, &id, Err(e)),
        }
    }

    // Known race: a fetch in flight when this lands will overwrite the list
    // with server data that may still contain the deleted report.
    fn finish_delete(model: &mut Model, id: &ReportId, result: Result<(), AppError>) {
        model.deletes_in_flight.remove(id);
        match result {
            Ok(()) => {
                let removed = model.remove_report(id);
                info!(report_id = %id, removed, "report deleted");
            }
            Err(e) => {
                warn!(report_id = %id, code = e.code(), error = %e, "delete failed");
                model.set_notice(e.user_facing_message(ErrorScope::DeleteReport));
            }
        }
    }

    // --- Modals ---

    fn view_summary(model: &mut Model, id: &ReportId) {
        match model.find_report(id) {
            Some(record) => model.summary = Some(SummarySelection::from(record)),
            None => warn!(report_id = %id, "summary requested for unknown report"),
        }
    }

    fn open_detail(model: &mut Model) {
        let fallback = model
            .detail_selection
            .as_ref()
            .and_then(|record| fallback_for(record, &model.config));
        // Reopening over an open modal keeps the scroll lock from before the first.
        let prior_scroll_lock = model
            .detail
            .as_ref()
            .map_or(model.page_scroll_locked, |d| d.prior_scroll_lock);

        let modal = DetailModal::open(
            model.detail_selection.as_ref(),
            fallback.as_deref(),
            prior_scroll_lock,
        );
        debug!(content = ?modal.image_state(), "detail modal opened");
        model.detail = Some(modal);
        model.page_scroll_locked = true;
    }

    fn close_detail(model: &mut Model, trigger: CloseTrigger) -> bool {
        let Some(modal) = model.detail.take() else {
            return false;
        };
        debug!(?trigger, "detail modal closed");
        model.page_scroll_locked = modal.prior_scroll_lock;
        model.detail_selection = None;
        true
    }

    // --- Upload ---

    fn submit_upload(model: &mut Model, caps: &Capabilities) {
        if model.upload.is_uploading() {
            debug!("upload already running");
            return;
        }

        if let Err(e) = model.upload.validate(model.config.max_upload_bytes) {
            debug!(error = %e, "upload rejected");
            model.set_notice(e.to_string());
            return;
        }

        if model.session.is_none() {
            model.upload.fail(&UploadValidationError::NotSignedIn.to_string());
            return;
        }

        model.upload.begin();
        caps.identity
            .mint_token(model.config.force_token_refresh, |result| {
                Event::UploadTokenMinted(Box::new(result))
            });
    }

    fn upload_token_minted(model: &mut Model, caps: &Capabilities, result: TokenResult) {
        if !model.upload.is_uploading() {
            return;
        }

        let token = match result {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not mint upload token");
                model.upload.fail(&repository::token_error(&e).message);
                return;
            }
        };
        if let Err(e) = check_token(&token) {
            warn!("upload token is not a JWT");
            model.upload.fail(&e.to_string());
            return;
        }

        let request = model
            .upload
            .validate(model.config.max_upload_bytes)
            .map_err(|e| AppError::new(crate::ErrorKind::Validation, e.to_string()))
            .and_then(|submission| repository::upload_request(&model.config, &token, &submission));

        match request {
            Ok(request) => {
                info!(request_id = request.request_id(), "uploading report");
                caps.multipart
                    .send(request, |result| Event::UploadCompleted(Box::new(result)));
            }
            Err(e) => model.upload.fail(&e.message),
        }
    }

    fn upload_completed(
        model: &mut Model,
        caps: &Capabilities,
        result: MultipartResult,
    ) {
        if !model.upload.is_uploading() {
            return;
        }

        match repository::parse_upload_response(result) {
            Ok(receipt) => {
                info!(has_summary = receipt.ai_summary.is_some(), "report uploaded");
                model.upload.succeed(receipt.ai_summary);
                if matches!(model.list, ListState::Loaded(_)) {
                    Self::start_fetch(model, caps);
                }
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "upload failed");
                model.upload.fail_with(e.user_facing_message(ErrorScope::UploadReport));
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();

        if model.is_torn_down() {
            let late_result = event.is_effect_result();
            if let Event::SessionSubscribed(result) = event {
                if let Ok((subscription, _)) = *result {
                    Self::release_late_subscription(subscription, caps);
                }
            } else if late_result {
                debug!(event = event_name, "late effect result dropped after teardown");
            } else {
                warn!(event = event_name, "shell event after teardown ignored");
            }
            return;
        }

        debug!(event = event_name, "update");

        match event {
            Event::Mounted => Self::mount(model, caps),

            Event::Unmounted => Self::tear_down(model, caps),

            Event::Configure(config) => {
                match config.validate() {
                    Ok(()) => {
                        info!(api = %config.api_base_url, "configuration applied");
                        model.config = *config;
                    }
                    Err(e) => error!(error = %e, "configuration rejected"),
                }
                caps.render.render();
            }

            Event::SessionSubscribed(result) => {
                match *result {
                    Ok((subscription, current)) => {
                        model.lifecycle = Lifecycle::Mounted { subscription };
                        Self::apply_session(model, caps, current);
                    }
                    Err(e) => {
                        error!(error = %e, "auth subscription failed");
                        model.lifecycle = Lifecycle::Unmounted;
                        Self::apply_session(model, caps, None);
                    }
                }
                caps.render.render();
            }

            Event::SessionChanged(session) => {
                let session = session.map(|s| *s);
                if session.is_some() && session == model.session {
                    debug!("session unchanged");
                    return;
                }
                Self::apply_session(model, caps, session);
                caps.render.render();
            }

            Event::SessionSettled { epoch, output } => {
                Self::session_settled(model, caps, epoch, output);
                caps.render.render();
            }

            Event::SignInRequested => {
                if model.sign_in_pending {
                    return;
                }
                model.sign_in_pending = true;
                caps.identity
                    .sign_in(|result| Event::SignInCompleted(Box::new(result)));
                caps.render.render();
            }

            Event::SignInCompleted(result) => {
                model.sign_in_pending = false;
                match *result {
                    // The provider follows up with SessionChanged.
                    Ok(_) => info!("sign-in completed"),
                    Err(e) => {
                        warn!(error = %e, "sign-in failed");
                        model.set_notice(MSG_LOGIN_FAILED);
                    }
                }
                caps.render.render();
            }

            Event::SignOutRequested => {
                caps.identity.sign_out(Event::SignOutCompleted);
            }

            Event::SignOutCompleted(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "sign-out failed");
                }
            }

            Event::ListTokenMinted { epoch, result } => {
                Self::list_token_minted(model, caps, epoch, *result);
                caps.render.render();
            }

            Event::ReportsFetched { epoch, result } => {
                Self::reports_fetched(model, caps, epoch, *result);
                caps.render.render();
            }

            Event::RetryRequested => {
                Self::retry(model, caps);
                caps.render.render();
            }

            Event::RefreshRequested => {
                Self::refresh(model, caps);
                caps.render.render();
            }

            Event::DeleteRequested { id } => {
                Self::request_delete(model, id);
                caps.render.render();
            }

            Event::DeleteConfirmed => {
                Self::confirm_delete(model, caps);
                caps.render.render();
            }

            Event::DeleteCancelled => {
                model.delete_confirmation = None;
                caps.render.render();
            }

            Event::DeleteTokenMinted { id, result } => {
                Self::delete_token_minted(model, caps, id, *result);
                caps.render.render();
            }

            Event::ReportDeleted { id, result } => {
                Self::finish_delete(model, &id, repository::parse_delete_response(*result));
                caps.render.render();
            }

            Event::DismissNotice => {
                model.notice = None;
                caps.render.render();
            }

            Event::ViewSummary { id } => {
                Self::view_summary(model, &id);
                caps.render.render();
            }

            Event::CloseSummary => {
                model.summary = None;
                caps.render.render();
            }

            Event::SelectReport { id } => {
                model.detail_selection = model.find_report(&id).cloned();
                if model.detail_selection.is_none() {
                    warn!(report_id = %id, "selected report not in list");
                }
                Self::open_detail(model);
                caps.render.render();
            }

            Event::OpenReportModal => {
                Self::open_detail(model);
                caps.render.render();
            }

            Event::CloseReportModal { trigger } => {
                if Self::close_detail(model, trigger) {
                    caps.render.render();
                }
            }

            Event::KeyPressed { key } => {
                if key == ESCAPE_KEY && Self::close_detail(model, CloseTrigger::Escape) {
                    caps.render.render();
                }
            }

            Event::ReportImageLoaded { attempt } => {
                if model.detail.as_mut().is_some_and(|d| d.image_loaded(attempt)) {
                    caps.render.render();
                }
            }

            Event::ReportImageFailed { attempt } => {
                if model.detail.as_mut().is_some_and(|d| d.image_failed(attempt)) {
                    warn!(attempt, "report image failed to load");
                    caps.render.render();
                }
            }

            Event::RetryReportImage => {
                if model.detail.as_mut().is_some_and(DetailModal::retry) {
                    caps.render.render();
                }
            }

            Event::UploadFileSelected(file) => {
                if !model.upload.is_uploading() {
                    model.upload.select_file(*file);
                    caps.render.render();
                }
            }

            Event::UploadFileCleared => {
                if !model.upload.is_uploading() {
                    model.upload.clear_file();
                    caps.render.render();
                }
            }

            Event::UploadReportTypeSelected(report_type) => {
                if !model.upload.is_uploading() {
                    model.upload.select_report_type(report_type);
                    caps.render.render();
                }
            }

            Event::UploadSubmitted => {
                Self::submit_upload(model, caps);
                caps.render.render();
            }

            Event::UploadTokenMinted(result) => {
                Self::upload_token_minted(model, caps, *result);
                caps.render.render();
            }

            Event::UploadCompleted(result) => {
                Self::upload_completed(model, caps, *result);
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}
