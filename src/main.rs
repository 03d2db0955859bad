use rowflow::batch::{profile_batches, BatchStream};
use rowflow::config::{load_config, Config, ConnectInfo};
use rowflow::core::Result;
use rowflow::paginate::OffsetPaginator;
use rowflow::query::Query;
use rowflow::seed::{sample_users, seed_database};
use rowflow::stats::column_mean;
use rowflow::stream::{RowStream, DEFAULT_FETCH_CHUNK};
use tracing::info;
use uuid::Uuid;

fn main() {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    info!("Starting rowflow demo...");

    // Parse CLI arguments: an optional config file, else a throwaway
    // database with default streaming knobs
    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => load_config(path),
        None => Ok(throwaway_config()),
    };

    if let Err(e) = config.and_then(|config| run_demo(&config)) {
        eprintln!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn throwaway_config() -> Config {
    let mut path = std::env::temp_dir();
    path.push(format!("rowflow_demo_{}.db", Uuid::new_v4()));
    Config {
        database: ConnectInfo::with_database(path.to_string_lossy().into_owned()),
        streaming: None,
    }
}

fn run_demo(config: &Config) -> Result<()> {
    let info = &config.database;
    let streaming = config.streaming.as_ref();
    let fetch_chunk = streaming
        .and_then(|s| s.fetch_chunk)
        .unwrap_or(DEFAULT_FETCH_CHUNK);
    let page_size = streaming.and_then(|s| s.page_size).unwrap_or(2);

    let inserted = seed_database(info, &sample_users())?;
    println!("Seeded {} users into {}", inserted, info.database);

    println!("\nStreaming users (buffering up to {} rows):", fetch_chunk);
    let stream = RowStream::open_with_chunk(
        info,
        Query::new("SELECT user_id, name, email, age FROM user_data ORDER BY name"),
        fetch_chunk,
    )?;
    for row in stream {
        let row = row?;
        println!(
            "  {} ({}) - Age: {}",
            row.text("name")?,
            row.text("email")?,
            row.numeric("age")?
        );
    }

    println!("\nProcessing users in batches of {}:", page_size);
    let rows = RowStream::open_with_chunk(
        info,
        Query::new("SELECT * FROM user_data ORDER BY name"),
        fetch_chunk,
    )?;
    let batches = BatchStream::from_rows(rows, page_size)?;
    let report = profile_batches(batches, "age", 25.0)?;
    for (i, batch) in report.batches.iter().enumerate() {
        println!(
            "  Batch {}: {} users, {} over age 25",
            i + 1,
            batch.rows,
            batch.over_cutoff
        );
    }
    println!("  Total users processed: {}", report.total_rows);
    println!("  Users over 25: {}", report.total_over_cutoff);

    println!("\nLazy pagination with page size {}:", page_size);
    let pager = OffsetPaginator::new(
        info.clone(),
        Query::new("SELECT * FROM user_data ORDER BY name"),
        page_size,
    )?;
    for (i, page) in pager.enumerate() {
        println!("  Page {}: {} users", i + 1, page?.len());
    }

    let ages = RowStream::open_with_chunk(info, Query::new("SELECT age FROM user_data"), fetch_chunk)?;
    if let Some(mean) = column_mean(ages, "age")? {
        println!("\nAverage age of users: {:.2}", mean);
    }

    Ok(())
}
