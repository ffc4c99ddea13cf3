use anyhow::Result;
use chrono::{Duration, Local};
use covidapi::{AreaType, Client, Context, Filter, Format, Structure};
use std::io::Read;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Set RUST_LOG=covidapi=debug to see the outgoing request.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Optional first argument: json (default) or csv.
    let format = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => Format::Json,
    };

    let client = Client::new()?;

    let structure = Structure::new()
        .field("date", "date")
        .field("areaName", "areaName")
        .field("newCases", "newCasesByPublishDate");
    let yesterday = Local::now() - Duration::days(1);

    let mut data = client.get_data(
        &Context::background(),
        &structure,
        format,
        AreaType::Utla,
        &[Filter::area_name("lewisham"), Filter::date_of(&yesterday)],
    )?;

    let mut out = String::new();
    data.read_to_string(&mut out)?;
    println!("{}", out);
    Ok(())
}
