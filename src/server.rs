use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};
use warp::http::{StatusCode, Uri};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::StoreError;
use crate::events::EventStore;
use crate::model::Symptom;
use crate::symptoms::SymptomStore;
use crate::views::{self, Site};

/// Form bodies larger than this are refused.
const MAX_FORM_BYTES: u64 = 16 * 1024;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("could not bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: warp::Error },
}

impl ServerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServerError::Store(e) if e.is_not_found())
    }
}

/// Everything a request handler needs.
#[derive(Clone, Debug)]
pub struct App {
    symptoms: SymptomStore,
    events: EventStore,
    site: Site,
}

impl App {
    pub fn new(symptoms: SymptomStore, events: EventStore, site: Site) -> Self {
        Self { symptoms, events, site }
    }

    /// Runs store work on the blocking pool; LMDB calls do disk I/O.
    async fn run<T, F>(&self, f: F) -> Result<T, ServerError>
    where
    F: FnOnce(&SymptomStore, &EventStore) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
    {
        let symptoms = self.symptoms.clone();
        let events = self.events.clone();
        let out = tokio::task::spawn_blocking(move || f(&symptoms, &events)).await??;
        Ok(out)
    }
}

#[derive(Deserialize, Debug)]
struct SymptomForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    description: String,
}

/// The id arrives as free text and is validated by the handler.
#[derive(Deserialize, Debug)]
struct RemoveForm {
    #[serde(default)]
    id: String,
}

pub struct SymptomServer {
    app: App,
    static_dir: PathBuf,
}

impl SymptomServer {
    pub fn new(app: App, static_dir: PathBuf) -> Self {
        Self { app, static_dir }
    }

    /// Serves until Ctrl-C.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let routes = routes(self.app.clone(), self.static_dir.clone());
        let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {}", e);
            }
            info!("shutting down");
        })
        .map_err(|source| ServerError::Bind { addr, source })?;

        info!(addr = %bound, "listening");
        server.await;
        Ok(())
    }
}

/// Paths are matched before methods so that an unknown path is a 404 rather
/// than a 405 from some other route's method filter.
pub fn routes(app: App, static_dir: PathBuf) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let site = app.site.clone();

    // GET /
    let index = warp::path::end()
    .and(warp::get())
    .and(with_app(app.clone()))
    .and_then(handle_index);

    // GET /symptoms
    let list = warp::path!("symptoms")
    .and(warp::get())
    .and(with_app(app.clone()))
    .and_then(handle_symptoms);

    // GET /symptoms/add
    let add_form = warp::path!("symptoms" / "add")
    .and(warp::get())
    .and(with_app(app.clone()))
    .and_then(handle_add_form);

    // POST /symptoms/add
    let add = warp::path!("symptoms" / "add")
    .and(warp::post())
    .and(form_body::<SymptomForm>())
    .and(with_app(app.clone()))
    .and_then(handle_add);

    // POST /symptoms/remove
    let remove = warp::path!("symptoms" / "remove")
    .and(warp::post())
    .and(form_body::<RemoveForm>())
    .and(with_app(app.clone()))
    .and_then(handle_remove);

    // GET /symptoms/report
    let report = warp::path!("symptoms" / "report")
    .and(warp::get())
    .and(with_app(app.clone()))
    .and_then(handle_report);

    // GET /symptoms/{id}
    let view = warp::path!("symptoms" / u64)
    .and(warp::get())
    .and(with_app(app.clone()))
    .and_then(handle_view);

    // POST /symptoms/{id}
    let edit = warp::path!("symptoms" / u64)
    .and(warp::post())
    .and(form_body::<SymptomForm>())
    .and(with_app(app))
    .and_then(handle_edit);

    let assets = warp::path("static").and(warp::fs::dir(static_dir));

    index
    .or(list)
    .or(add_form)
    .or(add)
    .or(remove)
    .or(report)
    .or(view)
    .or(edit)
    .or(assets)
    .recover(move |err: Rejection| handle_rejection(err, site.clone()))
    .with(warp::trace::request())
}

fn with_app(app: App) -> impl Filter<Extract = (App,), Error = Infallible> + Clone {
    warp::any().map(move || app.clone())
}

fn form_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_FORM_BYTES).and(warp::body::form())
}

fn html(body: String) -> Response {
    warp::reply::html(body).into_response()
}

fn see_other(location: &str) -> Response {
    let uri = location.parse::<Uri>().unwrap_or_else(|_| Uri::from_static("/symptoms"));
    warp::redirect::see_other(uri).into_response()
}

// --- HANDLERS ---

async fn handle_index(app: App) -> Result<Response, Rejection> {
    Ok(html(views::index(&app.site)))
}

async fn handle_symptoms(app: App) -> Result<Response, Rejection> {
    let symptoms = match app.run(|s, _| s.all()).await {
        Ok(symptoms) => symptoms,
        Err(e) => {
            error!("unable to get symptoms: {}", e);
            Vec::new()
        }
    };
    Ok(html(views::symptom_list(&app.site, &symptoms)))
}

async fn handle_add_form(app: App) -> Result<Response, Rejection> {
    Ok(html(views::add_form(&app.site)))
}

async fn handle_add(form: SymptomForm, app: App) -> Result<Response, Rejection> {
    let created = app
    .run(move |s, _| s.create(&form.title, &form.author, &form.description))
    .await;

    let symptom = match created {
        Ok(symptom) => symptom,
        Err(e) => {
            error!("cannot create symptom: {}", e);
            return Ok(see_other("/symptoms"));
        }
    };
    info!(id = symptom.id, "symptom added");

    // The record is already committed; a failed append only leaves a gap in the log.
    let id = symptom.id;
    if let Err(e) = app.run(move |_, ev| ev.record_added(id)).await {
        warn!(id, "symptom added without audit entry: {}", e);
    }

    Ok(see_other("/symptoms"))
}

async fn handle_remove(form: RemoveForm, app: App) -> Result<Response, Rejection> {
    let id = match form.id.trim().parse::<u64>() {
        Ok(id) => id,
        Err(e) => {
            warn!(raw = %form.id, "cannot get id from form: {}", e);
            return Ok(see_other("/symptoms"));
        }
    };

    if let Err(e) = app.run(move |s, _| s.delete(id)).await {
        error!(id, "cannot delete symptom: {}", e);
        return Ok(see_other("/symptoms"));
    }
    info!(id, "symptom removed");

    if let Err(e) = app.run(move |_, ev| ev.record_removed(id)).await {
        warn!(id, "symptom removed without audit entry: {}", e);
    }

    Ok(see_other("/symptoms"))
}

async fn handle_view(id: u64, app: App) -> Result<Response, Rejection> {
    let loaded = app
    .run(move |s, ev| Ok((s.one(id)?, ev.all_for_symptom(id)?)))
    .await;

    match loaded {
        Ok((symptom, events)) => Ok(html(views::symptom_detail(&app.site, &symptom, &events))),
        Err(e) if e.is_not_found() => {
            info!(id, "cannot find symptom");
            Ok(see_other("/symptoms"))
        }
        Err(e) => {
            error!(id, "cannot load symptom: {}", e);
            Ok(see_other("/symptoms"))
        }
    }
}

async fn handle_edit(id: u64, form: SymptomForm, app: App) -> Result<Response, Rejection> {
    let updated = app
    .run(move |s, _| {
        let current = s.one(id)?;
        let symptom = Symptom {
            title: form.title,
            author: form.author,
            description: form.description,
            ..current
        };
        s.update(&symptom)?;
        Ok(symptom)
    })
    .await;

    match updated {
        Ok(symptom) => info!(id = symptom.id, "symptom updated"),
        Err(e) if e.is_not_found() => {
            info!(id, "cannot find symptom to update");
            return Ok(see_other("/symptoms"));
        }
        Err(e) => {
            error!(id, "cannot update symptom: {}", e);
            return Ok(see_other("/symptoms"));
        }
    }

    if let Err(e) = app.run(move |_, ev| ev.record_updated(id)).await {
        warn!(id, "symptom updated without audit entry: {}", e);
    }

    Ok(see_other(&format!("/symptoms/{}", id)))
}

async fn handle_report(app: App) -> Result<Response, Rejection> {
    let symptoms = match app.run(|s, _| s.all()).await {
        Ok(symptoms) => symptoms,
        Err(e) => {
            error!("unable to get symptoms for report: {}", e);
            Vec::new()
        }
    };
    Ok(html(views::report(&app.site, &symptoms)))
}

/// A rejection carries every route's reason, so the body errors are checked
/// before the method mismatch some sibling route also reported.
async fn handle_rejection(err: Rejection, site: Site) -> Result<Response, Infallible> {
    let (status, body) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, views::not_found(&site))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            views::error_page(&site, "Too large", "The submitted form is too large."),
        )
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        warn!("bad form body: {}", e);
        (
            StatusCode::BAD_REQUEST,
            views::error_page(&site, "Bad request", "The submitted form could not be read."),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            views::error_page(&site, "Not allowed", "That action is not supported here."),
        )
    } else {
        warn!(?err, "rejected request");
        (
            StatusCode::BAD_REQUEST,
            views::error_page(&site, "Bad request", "The request could not be understood."),
        )
    };

    Ok(warp::reply::with_status(warp::reply::html(body), status).into_response())
}
