//! Project management CLI for recipe-app
//!
//! Equivalent of Django's `manage.py`: runs the server, applies migrations,
//! creates administrators and lists URL patterns.

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use recipe_app::apps::users::models::User;
use recipe_app::config::settings::Settings;
use recipe_app::config::state::AppState;
use recipe_app::config::urls::{application, url_patterns};
use recipe_app::core::{db, logging};
use reinhardt::InMemoryStorage;
use reinhardt::server::{HttpServer, ShutdownCoordinator, shutdown_signal};

#[derive(Parser)]
#[command(name = "manage")]
#[command(about = "recipe-app management interface", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the HTTP server
	Runserver {
		/// Server address (defaults to `bind_address` from settings)
		#[arg(value_name = "ADDRESS")]
		address: Option<SocketAddr>,
	},

	/// Apply database migrations
	Migrate,

	/// Create a user with staff and superuser rights
	Createsuperuser {
		#[arg(long)]
		email: String,

		#[arg(long)]
		password: String,

		#[arg(long, default_value = "")]
		name: String,
	},

	/// Display all registered URL patterns
	Showurls,
}

type CommandResult = Result<(), Box<dyn std::error::Error>>;

async fn run_runserver(settings: Settings, address: Option<SocketAddr>) -> CommandResult {
	let address = address.unwrap_or(settings.bind_address);
	if settings.debug {
		tracing::warn!("running with debug enabled; do not use in production");
	}

	let state = AppState::from_settings(settings).await?;
	println!(
		"{} http://{}/",
		style("Starting server at").green().bold(),
		address
	);

	let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
	let signal_coordinator = coordinator.clone();
	tokio::spawn(async move {
		shutdown_signal().await;
		tracing::info!("shutdown signal received");
		signal_coordinator.shutdown();
	});

	HttpServer::new(application(state)?)
		.listen_with_shutdown(address, coordinator)
		.await?;
	Ok(())
}

async fn run_migrate(settings: Settings) -> CommandResult {
	let conn = db::connect(&settings.database_url).await?;
	let applied = db::migrate(&conn).await?;
	if applied.is_empty() {
		println!("{}", style("No migrations to apply.").dim());
	}
	for name in applied {
		println!("  Applying {}... {}", name, style("OK").green());
	}
	Ok(())
}

async fn run_createsuperuser(
	settings: Settings,
	email: String,
	password: String,
	name: String,
) -> CommandResult {
	let state = AppState::from_settings(settings).await?;
	let user = User::create_superuser(&state.db, &email, &password, &name).await?;
	println!(
		"{} {}",
		style("Superuser created:").green().bold(),
		user.email()
	);
	Ok(())
}

async fn run_showurls(settings: Settings) -> CommandResult {
	let conn = db::connect(&settings.database_url).await?;
	let storage = Arc::new(InMemoryStorage::new("memory", settings.media_url.clone()));
	let router = url_patterns(&AppState::new(conn, storage, settings));

	for (path, _name, namespace, methods) in router.get_all_routes() {
		let methods: Vec<&str> = methods.iter().map(|method| method.as_str()).collect();
		println!(
			"{:<7} {:<45} {}",
			style(methods.join(",")).cyan(),
			path,
			style(namespace.unwrap_or_default()).dim()
		);
	}
	Ok(())
}

async fn run() -> CommandResult {
	let cli = Cli::parse();
	let settings = Settings::load()?;

	let level = match cli.verbosity {
		0 => settings.log_level.clone(),
		1 => "debug".to_string(),
		_ => "trace".to_string(),
	};
	logging::init(&level, settings.log_format);

	match cli.command {
		Commands::Runserver { address } => run_runserver(settings, address).await,
		Commands::Migrate => run_migrate(settings).await,
		Commands::Createsuperuser {
			email,
			password,
			name,
		} => run_createsuperuser(settings, email, password, name).await,
		Commands::Showurls => run_showurls(settings).await,
	}
}

#[tokio::main]
async fn main() {
	if let Err(e) = run().await {
		eprintln!("{} {}", style("Error:").red().bold(), e);
		process::exit(1);
	}
}
