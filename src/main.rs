use std::{path::PathBuf, process};

use mdrender::{
    application::{
        error::AppError,
        render::{
            RenderPipelineConfig, RenderRequest, RenderService, configure_render_service,
            render_service,
        },
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    configure_render_service(RenderPipelineConfig::from(&settings.sanitize))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(args.file).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let max_body_bytes = usize::try_from(settings.render.max_body_bytes.get()).map_err(|_| {
        AppError::from(InfraError::configuration(
            "render.max_body_bytes exceeds supported range for usize",
        ))
    })?;

    let state = HttpState {
        renderer: render_service(),
        max_body_bytes,
    };
    let router = http::build_router(state, &settings.render.path);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "mdrender::serve",
        addr = %settings.server.addr,
        path = %settings.render.path,
        attribute_policy = %settings.sanitize.attribute_policy,
        "Render endpoint listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "mdrender::serve", "Server stopped");
    Ok(())
}

async fn run_render(file: Option<PathBuf>) -> Result<(), AppError> {
    let markdown = match file.as_ref() {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|err| AppError::from(InfraError::from(err)))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            buffer
        }
    };

    let renderer = render_service();
    let output = renderer.render(&RenderRequest::new(markdown))?;
    info!(
        target = "mdrender::render",
        contains_code = output.contains_code,
        escaped_tags = output.escaped_tags,
        attribute_policy = %renderer.attribute_policy(),
        "Markdown rendered"
    );

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(output.html.as_bytes())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    stdout
        .flush()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "mdrender::serve", "Shutdown signal received");
}
