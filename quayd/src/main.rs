mod config;
mod fs;
mod net;
mod resolver;

use std::sync::Arc;

use config::Config;
use fs::MaildirStore;
use resolver::LocalResolver;

use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// Resolves once any of the signals we stop for arrives
async fn shutdown_signal() -> std::io::Result<()> {
	use tokio::signal::unix::{signal, SignalKind};

	let mut signals = (
		signal(SignalKind::alarm())?,
		signal(SignalKind::hangup())?,
		signal(SignalKind::interrupt())?,
		signal(SignalKind::pipe())?,
		signal(SignalKind::quit())?,
		signal(SignalKind::terminate())?,
		signal(SignalKind::user_defined1())?,
		signal(SignalKind::user_defined2())?,
	);

	tokio::select! {
		_ = tokio::signal::ctrl_c() => (),
		_ = signals.0.recv() => (),
		_ = signals.1.recv() => (),
		_ = signals.2.recv() => (),
		_ = signals.3.recv() => (),
		_ = signals.4.recv() => (),
		_ = signals.5.recv() => (),
		_ = signals.6.recv() => (),
		_ = signals.7.recv() => (),
	};

	Ok(())
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let config = match Config::get() {
		Ok(Some(config)) => config,
		Ok(None) => return,
		Err(err) => {
			error!(%err, "failed to load configuration");
			std::process::exit(1);
		}
	};

	let resolver = Arc::new(LocalResolver::new(config.domains.clone(), &config.users));
	let store = Arc::new(MaildirStore::new(
		config.maildir.clone(),
		config.hostname.clone(),
	));

	let listener = match TcpListener::bind(config.socket_address()).await {
		Ok(listener) => listener,
		Err(err) => {
			error!(address = %config.socket_address(), %err, "failed to bind");
			std::process::exit(1);
		}
	};

	info!(address = %config.socket_address(), hostname = %config.hostname, "listening");

	let (tx, rx) = watch::channel(false);
	let listen_task = tokio::spawn(net::listen(
		listener,
		Arc::new(config.server_config()),
		resolver,
		store,
		rx,
	));

	if let Err(err) = shutdown_signal().await {
		error!(%err, "failed to install signal handlers");
	}

	info!("received shutdown signal, beginning graceful shutdown");
	// Only fails when the listener, and every connection with it, is gone already
	if tx.send(true).is_err() {
		warn!("listener exited before shutdown");
	}

	if let Err(err) = listen_task.await {
		error!(%err, "listener task failed");
	}
}
