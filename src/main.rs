use std::{process, sync::Arc};

use futures::stream::{self, TryStreamExt};
use stellato::{
    application::{
        error::AppError,
        feed::{self, FeedService},
        repos::ContentRepo,
        site,
    },
    cache::PageStore,
    config,
    infra::{
        content::ContentClient,
        error::InfraError,
        http::{self, FEED_PAGE_KEY, HttpState},
        telemetry,
    },
    presentation::views::{BrandView, LayoutChrome, PageMetaView},
};
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

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
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

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Export(args) => run_export(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    warmup(&app, settings.warmup.concurrency.get() as usize).await?;

    serve_http(&settings, app.http_state).await
}

async fn run_export(
    settings: config::Settings,
    args: config::ExportArgs,
) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    info!(
        target = "stellato::export",
        path = %args.out_dir.display(),
        "Starting export"
    );

    let posts = site::export_site(
        app.feed.as_ref(),
        app.content.as_ref(),
        &app.chrome,
        &args.out_dir,
    )
    .await?;

    info!(target = "stellato::export", posts, "Export completed");
    Ok(())
}

struct ApplicationContext {
    http_state: HttpState,
    feed: Arc<FeedService>,
    content: Arc<dyn ContentRepo>,
    post_pages: Arc<PageStore>,
    feed_page: Arc<PageStore>,
    chrome: LayoutChrome,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    let api_url = settings
        .content
        .api_url
        .clone()
        .ok_or_else(|| InfraError::configuration("content api url is not configured"))
        .map_err(AppError::from)?;

    let client = ContentClient::new(api_url.clone(), settings.content.timeout)?;
    let content: Arc<dyn ContentRepo> = Arc::new(client);

    let feed = Arc::new(FeedService::new(
        content.clone(),
        api_url,
        settings.content.page_size.get(),
    ));
    let chrome = build_chrome(&settings.site);

    let post_pages = Arc::new(PageStore::new(Some(settings.revalidate.post_window)));
    let feed_page = Arc::new(PageStore::new(None));

    let http_state = HttpState {
        feed: feed.clone(),
        content: content.clone(),
        chrome: chrome.clone(),
        post_pages: post_pages.clone(),
        feed_page: feed_page.clone(),
    };

    Ok(ApplicationContext {
        http_state,
        feed,
        content,
        post_pages,
        feed_page,
        chrome,
    })
}

fn build_chrome(site: &config::SiteSettings) -> LayoutChrome {
    LayoutChrome {
        brand: BrandView {
            title: site.title.clone(),
            href: "/".to_string(),
        },
        meta: PageMetaView {
            title: site.title.clone(),
            description: site.description.clone(),
        },
    }
}

/// Generate the listing page and every known post page before serving.
/// Any failure here aborts startup the way a failed build would.
async fn warmup(app: &ApplicationContext, concurrency: usize) -> Result<(), AppError> {
    let feed = app.feed.clone();
    let chrome = app.chrome.clone();
    app.feed_page
        .get_or_generate(FEED_PAGE_KEY, move || {
            let feed = feed.clone();
            let chrome = chrome.clone();
            async move { feed::render_feed_bytes(&feed, &chrome).await }
        })
        .await?;

    let uids = app.content.list_post_uids().await?;
    let total = uids.len();

    stream::iter(uids.into_iter().map(Ok::<_, AppError>))
        .try_for_each_concurrent(Some(concurrency), |uid| {
            let feed = app.feed.clone();
            let chrome = app.chrome.clone();
            let post_pages = app.post_pages.clone();
            async move {
                let key = uid.clone();
                post_pages
                    .get_or_generate(&key, move || {
                        let feed = feed.clone();
                        let chrome = chrome.clone();
                        let slug = uid.clone();
                        async move { feed::render_post_bytes(&feed, &chrome, &slug).await }
                    })
                    .await
                    .map(|_| ())
            }
        })
        .await?;

    info!(
        target = "stellato::warmup",
        posts = total,
        "Generated static pages"
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "stellato::serve",
        addr = %settings.server.public_addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
