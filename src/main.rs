/*!
The registration server.
*/
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use tower_http::cors::CorsLayer;

use enroll::config::Cfg;
use enroll::inter::{router, Glob};

#[tokio::main]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("enroll")
        .build();
    TermLogger::init(
        enroll::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ).unwrap();
    log::info!("Logging started.");

    let cfg = match std::env::args().nth(1) {
        Some(path) => match Cfg::from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::error!("Error reading config file {:?}: {}", &path, &e);
                std::process::exit(1);
            },
        },
        None => Cfg::default(),
    };
    log::info!("Configuration:\n{:#?}", &cfg);

    let origin: HeaderValue = match cfg.allowed_origin.parse() {
        Ok(o) => o,
        Err(e) => {
            log::error!(
                "Configured origin {:?} is not a valid header value: {}",
                &cfg.allowed_origin, &e
            );
            std::process::exit(1);
        },
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let glob = Arc::new(Glob::new(cfg.default_page_limit));
    let app = router(glob).layer(cors);

    log::info!("Listening on {}", &cfg.addr);

    axum::Server::bind(&cfg.addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
