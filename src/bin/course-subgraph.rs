use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use course_federation::config::{Args, COURSE_LISTEN_ADDRESS};
use course_federation::{course, server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_sdl {
        print!("{}", course::COURSE_SDL);
        return Ok(());
    }

    telemetry::init(&args)?;

    let fixtures = args.load_fixtures().context("loading course fixtures")?;
    let schema = course::build_schema(Arc::new(fixtures.course_store()));

    let address = args.listen_address_or(COURSE_LISTEN_ADDRESS.parse()?);
    server::serve("course", address, server::router(schema)).await?;

    Ok(())
}
