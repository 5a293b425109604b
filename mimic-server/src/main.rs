//! HTTP facade over the profile registry and generator.
//!
//! Serves generated values from the profiles stored in a data directory:
//! - `GET /v1/profiles`: names of the resident profiles
//! - `GET /v1/available`: names of the profiles stored on disk
//! - `PUT /v1/profiles/{name}/reload`: re-read a profile from disk
//! - `GET /v1/generate?profile=name&count=N&seed=S`: newline-separated values
//!
//! Profiles are frozen, so request handlers only ever clone an `Arc` out of
//! the registry and generate without holding any lock.

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use mimic_core::{Generator, ProfileRegistry, RegistryError};

/// Query parameters for the `/v1/generate` endpoint.
#[derive(Deserialize)]
struct GenerateParams {
    profile: String,
    count: Option<usize>,
    seed: Option<u64>,
}

/// Upper bound on values per request, keeping a single response bounded.
const MAX_COUNT: usize = 100_000;

fn registry_failure(error: RegistryError) -> HttpResponse {
    match &error {
        RegistryError::UnknownProfile(_) => HttpResponse::NotFound().body(error.to_string()),
        RegistryError::InvalidName(_) => HttpResponse::BadRequest().body(error.to_string()),
        RegistryError::Codec(_) | RegistryError::Io(_) => {
            tracing::error!(%error, "registry failure");
            HttpResponse::InternalServerError().body(error.to_string())
        }
    }
}

#[get("/v1/generate")]
async fn get_generated(
    registry: web::Data<ProfileRegistry>,
    query: web::Query<GenerateParams>,
) -> impl Responder {
    let count = query.count.unwrap_or(1);
    if count == 0 || count > MAX_COUNT {
        return HttpResponse::BadRequest()
            .body(format!("count must be between 1 and {MAX_COUNT}"));
    }

    let profile = match registry.get(&query.profile) {
        Ok(profile) => profile,
        Err(error) => return registry_failure(error),
    };

    let generator = match Generator::new(profile) {
        Ok(generator) => generator,
        Err(error) => {
            tracing::error!(profile = %query.profile, %error, "stored profile is unusable");
            return HttpResponse::InternalServerError().body(error.to_string());
        }
    };

    HttpResponse::Ok().body(generator.generate(count, query.seed).join("\n"))
}

#[get("/v1/profiles")]
async fn get_profiles(registry: web::Data<ProfileRegistry>) -> impl Responder {
    HttpResponse::Ok().body(registry.names().join("\n"))
}

#[get("/v1/available")]
async fn get_available(registry: web::Data<ProfileRegistry>) -> impl Responder {
    match registry.available() {
        Ok(names) => HttpResponse::Ok().body(names.join("\n")),
        Err(error) => registry_failure(error),
    }
}

#[put("/v1/profiles/{name}/reload")]
async fn put_reload(
    registry: web::Data<ProfileRegistry>,
    name: web::Path<String>,
) -> impl Responder {
    match registry.reload(&name) {
        Ok(profile) => HttpResponse::Ok().body(format!(
            "reloaded `{}` ({} samples)",
            name,
            profile.sample_count()
        )),
        Err(error) => registry_failure(error),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("MIMIC_DATA_DIR").unwrap_or_else(|_| "./data".to_owned());
    tracing::info!(data_dir, "serving profiles");
    let registry = web::Data::new(ProfileRegistry::new(data_dir));

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(registry.clone())
            .service(get_generated)
            .service(get_profiles)
            .service(get_available)
            .service(put_reload)
    })
    .bind(("127.0.0.1", 5000))?
    .run()
    .await
}
