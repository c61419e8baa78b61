use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use course_federation::config::{Args, REVIEW_LISTEN_ADDRESS};
use course_federation::{review, server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_sdl {
        print!("{}", review::REVIEW_SDL);
        return Ok(());
    }

    telemetry::init(&args)?;

    let fixtures = args.load_fixtures().context("loading review fixtures")?;
    let schema = review::build_schema(Arc::new(fixtures.review_store()));

    let address = args.listen_address_or(REVIEW_LISTEN_ADDRESS.parse()?);
    server::serve("review", address, server::router(schema)).await?;

    Ok(())
}
