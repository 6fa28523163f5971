use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepay::config::Config;
use coursepay::db::{create_pool, init_db, queries, AppState};
use coursepay::handlers;
use coursepay::models::CreateCourse;
use coursepay::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "coursepay")]
#[command(about = "Payment intake and enrollment fulfillment for an online-course marketplace")]
struct Cli {
    /// Seed the database with dev courses (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with a couple of courses for local checkout testing.
/// Only runs in dev mode and when the catalog is empty.
fn seed_dev_courses(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))
        .expect("Failed to count courses");
    if existing > 0 {
        tracing::info!("Courses already exist, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV COURSES");
    tracing::info!("============================================");

    let courses = [
        CreateCourse {
            title: "Intro to Systems Programming".to_string(),
            description: "Memory, processes, and the machine underneath.".to_string(),
            thumbnail_url: None,
            price: 49000.0,
        },
        CreateCourse {
            title: "Distributed Systems in Practice".to_string(),
            description: "Consensus, replication, and things that fail.".to_string(),
            thumbnail_url: None,
            price: 100000.0,
        },
    ];

    // Print copy-paste friendly output for local API testing
    println!();
    println!("--- COPY FROM HERE ---");
    for input in &courses {
        let course = queries::create_course(&conn, input).expect("Failed to create dev course");
        tracing::info!("Course: {} (id: {})", course.title, course.id);
        println!("  course_id: {}  # {}", course.id, course.title);
    }
    println!("--- END COPY ---");
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursepay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration. Misconfiguration (missing processor key, missing
    // webhook secret outside dev mode) is fatal before the server binds.
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.stripe.webhook_secret.is_none() {
        tracing::warn!("Webhook signature verification DISABLED (dev mode, no secret configured)");
    }

    // Create database connection pool and initialize schema
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let processor = StripeClient::new(&config.stripe).expect("Failed to build processor client");

    let state = AppState {
        db: db_pool,
        processor,
        base_url: config.base_url.clone(),
        success_page_url: config.success_page_url.clone(),
        cancel_page_url: config.cancel_page_url.clone(),
    };

    // Seed dev courses if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set COURSEPAY_ENV=dev)");
        } else {
            seed_dev_courses(&state);
        }
    }

    // Build the application router
    let app = Router::new()
        // Public endpoints (checkout, verify, enrollments)
        .merge(handlers::public::router())
        // Webhook endpoint (signature auth)
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Coursepay server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // Also remove WAL and SHM files if they exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
