use std::{net::SocketAddr, sync::Arc};

use quay::{
	config::Config,
	delivery::{Resolver, Store},
	lmtp::{Response, Server},
};
use tokio::{
	io::{self, AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
	sync::watch,
	task::JoinSet,
};
use tracing::{debug, info, info_span, warn, Instrument};

/// What woke a connection up
enum Event {
	Read(io::Result<usize>),
	TimedOut,
	Shutdown,
}

async fn write_responses(stream: &mut TcpStream, responses: &[Response]) -> io::Result<()> {
	for response in responses {
		let reply = response.as_string();
		if response.code().is_negative() {
			info!(reply = %reply.trim_end(), "refused");
		} else {
			debug!(reply = %reply.trim_end(), "sending");
		}
		stream.write_all(reply.as_bytes()).await?;
	}

	Ok(())
}

// runs as long as the client remains connected. Handles reading and writing the
// socket and passes bytes back and forth with the protocol logic in Server.
async fn serve(
	mut stream: TcpStream,
	config: Arc<Config>,
	resolver: Arc<dyn Resolver>,
	store: Arc<dyn Store>,
	mut rx: watch::Receiver<bool>,
) -> io::Result<()> {
	let (mut server, greeting) = Server::initiate(config, resolver, store);
	write_responses(&mut stream, &[greeting]).await?;

	let mut buf = vec![0; 1024];

	while !server.should_exit() {
		let event = tokio::select! {
			read = tokio::time::timeout(server.timeout(), stream.read(&mut buf)) => match read {
				Ok(read) => Event::Read(read),
				Err(_elapsed) => Event::TimedOut,
			},
			_ = rx.changed() => Event::Shutdown,
		};

		let read = match event {
			Event::Read(read) => read?,
			Event::TimedOut => {
				info!("client timed out");
				return write_responses(&mut stream, &[server.time_out()]).await;
			}
			Event::Shutdown => {
				return write_responses(&mut stream, &[server.shutdown()]).await;
			}
		};

		// A zero sized read, this connection has died or been terminated by the client
		if read == 0 {
			info!("connection closed by client");
			return Ok(());
		}

		// Any read may hold the end of a message, and then push calls the store,
		// which writes to disk
		let responses = tokio::task::block_in_place(|| server.push(&buf[..read]));
		write_responses(&mut stream, &responses).await?;

		if server.flooded() {
			warn!("too many errors, dropped connection");
		}
	}

	Ok(())
}

async fn serve_logged(
	stream: TcpStream,
	config: Arc<Config>,
	resolver: Arc<dyn Resolver>,
	store: Arc<dyn Store>,
	rx: watch::Receiver<bool>,
) {
	info!("connected");

	match serve(stream, config, resolver, store, rx).await {
		Ok(()) => info!("disconnected"),
		Err(err) => warn!(%err, "connection failed"),
	}
}

// waits for new connections, dispatches a new task to handle each one. On
// shutdown it waits for every connection to say goodbye.
pub async fn listen(
	listener: TcpListener,
	config: Arc<Config>,
	resolver: Arc<dyn Resolver>,
	store: Arc<dyn Store>,
	mut rx: watch::Receiver<bool>,
) {
	let mut connections = JoinSet::new();

	loop {
		let (stream, clientaddr): (TcpStream, SocketAddr) = tokio::select! {
			_ = rx.changed() => break,
			Some(finished) = connections.join_next() => {
				if let Err(err) = finished {
					warn!(%err, "connection task failed");
				}
				continue;
			}
			accepted = listener.accept() => match accepted {
				Ok(accepted) => accepted,
				Err(err) => {
					warn!(%err, "failed to accept connection");
					continue;
				}
			}
		};

		connections.spawn(
			serve_logged(
				stream,
				config.clone(),
				resolver.clone(),
				store.clone(),
				rx.clone(),
			)
			.instrument(info_span!("connection", peer = %clientaddr)),
		);
	}

	info!(open = connections.len(), "closing connections");
	while let Some(finished) = connections.join_next().await {
		if let Err(err) = finished {
			warn!(%err, "connection task failed");
		}
	}
}
