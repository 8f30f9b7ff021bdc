use anyhow::Result;
use clap::Parser;
use bookrec_engine::config::CliArgs;
use bookrec_engine::fetcher::Fetcher;
use bookrec_engine::recommender::Recommender;
use bookrec_engine::server::RecommenderServer;
use bookrec_engine::transport::NdjsonTransport;

fn main() -> Result<()> {
	let args = CliArgs::parse();

	// Logs go to stderr; stdout carries the JSON-RPC stream.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let source = args.book_source();
	tracing::info!(source = ?source, "Default book source");

	let fetcher = Fetcher::new(source, args.fetch_timeout);
	let mut recommender = Recommender::with_parts(fetcher, args.preprocessor(), args.tfidf_config());

	if args.build_on_start {
		let summary = recommender.build(None, &args.startup_fetch_options())?;
		tracing::info!(items = summary.items, "Startup build complete");
	}

	let transport = NdjsonTransport::new();
	let mut server = RecommenderServer::new(transport, recommender);

	tracing::info!("bookrec-engine ready");
	server.run()?;
	Ok(())
}
