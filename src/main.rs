use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use phototag::config::Config;
use phototag::db::{CityStore, Database, TagType};
use phototag::geo::{geonames, CityGeocoder, CitySeeder, GeoPoint, SeedSource};
use phototag::labels::{AutoTagger, LabelMapper, OnnxClassifier};
use phototag::logging;
use phototag::scanner::{self, MediaScanner};
use phototag::tags::TagRepository;

enum Command {
    Seed,
    Geocode { lat: f64, lon: f64 },
    Scan { dir: PathBuf },
    Classify { limit: Option<usize> },
    Tag { uri: String, tag_type: TagType, name: String },
    Summary,
    ImportGeonames { input: PathBuf, output: PathBuf },
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut limit = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("phototag {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    fail("--config requires a path argument");
                }
            }
            "--limit" | "-n" => {
                match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(n) => limit = Some(n),
                    None => fail("--limit requires a number"),
                }
                i += 1;
            }
            arg if arg.starts_with('-') && arg.parse::<f64>().is_err() => {
                fail(&format!("Unknown argument: {}", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = match parse_command(&positional, limit) {
        Ok(command) => command,
        Err(e) => fail(&e.to_string()),
    };

    Args {
        config_path,
        command,
    }
}

fn parse_command(positional: &[String], limit: Option<usize>) -> Result<Command> {
    let Some((name, rest)) = positional.split_first() else {
        bail!("missing command");
    };

    let command = match (name.as_str(), rest) {
        ("seed", []) => Command::Seed,
        ("geocode", [lat, lon]) => Command::Geocode {
            lat: lat.parse().context("latitude must be a number")?,
            lon: lon.parse().context("longitude must be a number")?,
        },
        ("scan", [dir]) => Command::Scan {
            dir: PathBuf::from(dir),
        },
        ("classify", []) => Command::Classify { limit },
        ("tag", [uri, tag_type, name]) => Command::Tag {
            uri: uri.clone(),
            tag_type: tag_type.parse()?,
            name: name.clone(),
        },
        ("summary", []) => Command::Summary,
        ("import-geonames", [input, output]) => Command::ImportGeonames {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        },
        (other, _) => bail!("unknown command or wrong arguments: {}", other),
    };
    Ok(command)
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    print_help();
    std::process::exit(1);
}

fn print_help() {
    println!(
        r#"phototag - offline photo geocoding and tagging

USAGE:
    phototag [OPTIONS] <COMMAND>

COMMANDS:
    seed                          Load the city gazetteer if empty
    geocode LAT LON               Resolve a coordinate to the nearest city
    scan DIR                      Index photos and videos under DIR
    classify [--limit N]          Classify unlabeled images and tag them
    tag URI TYPE NAME             Attach a manual tag (TYPE: event, people)
    summary                       Show counts by date, place and tag
    import-geonames INPUT OUTPUT  Convert a GeoNames dump to a seed CSV

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTOTAG_CONFIG     Path to config file (overrides default location)
    PHOTOTAG_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/phototag/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = logging::init(None);

    if let Command::ImportGeonames { input, output } = &args.command {
        let rows = geonames::import_geonames(input, output)?;
        println!("Wrote {} cities to {}", rows, output.display());
        return Ok(());
    }

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&config.db_path)?;
    db.initialize()?;

    match args.command {
        Command::Seed => {
            let seeded = seed(&db, &config)?;
            if seeded == 0 {
                println!("Gazetteer already holds {} cities", db.count_cities()?);
            } else {
                println!("Seeded {} cities", seeded);
            }
        }
        Command::Geocode { lat, lon } => {
            let Some(point) = GeoPoint::new(lat, lon) else {
                bail!("coordinate out of range: {}, {}", lat, lon);
            };
            seed(&db, &config)?;
            let geocoder = CityGeocoder::from_config(&db, &config.geocoder);
            match geocoder.find_nearest(point.lat(), point.lon())? {
                Some(found) => println!(
                    "{} ({}, {}) {:.1} km",
                    found.city.name_local, found.city.name_en, found.city.country_code, found.distance_km
                ),
                None => println!("Location unknown"),
            }
        }
        Command::Scan { dir } => {
            seed(&db, &config)?;
            let result = MediaScanner::new(&db, &config).scan_and_store(&dir)?;
            println!(
                "Scanned {} of {} files ({} with location, {} placed, {} failed)",
                result.scanned, result.total_found, result.with_location, result.geocoded, result.failed
            );
        }
        Command::Classify { limit } => {
            let classifier = OnnxClassifier::open(&config.classifier)?;
            let mapper = LabelMapper::new(
                config.classifier.event_threshold,
                config.classifier.people_threshold,
            );
            let mut tagger = AutoTagger::new(&db, classifier, mapper, config.classifier.top_k);
            let result = tagger.tag_batch(limit.unwrap_or(config.classifier.batch_size))?;
            println!(
                "Classified {} items ({} tagged, {} skipped)",
                result.processed, result.tagged, result.skipped
            );
        }
        Command::Tag { uri, tag_type, name } => {
            match TagRepository::new(&db).add_manual_tag(&uri, tag_type, &name)? {
                Some(tag_id) => println!("Tagged {} with {}:{} (tag {})", uri, tag_type, name.trim(), tag_id),
                None => bail!("tag name must not be blank"),
            }
        }
        Command::Summary => print_summary(&db)?,
        Command::ImportGeonames { .. } => {}
    }

    Ok(())
}

fn seed(db: &Database, config: &Config) -> Result<usize> {
    let source = SeedSource::from(config.gazetteer.seed_path.clone());
    CitySeeder::new(db, source)
        .with_batch_size(config.gazetteer.batch_size)
        .seed_if_needed()
}

fn print_summary(db: &Database) -> Result<()> {
    const LIMIT: usize = 10;

    let state = scanner::last_scan_state(db)?;
    println!(
        "Media: {}  Cities: {}  Tags: {}  Scan errors: {}",
        db.count_media()?,
        db.count_cities()?,
        db.count_tags()?,
        state.error_count
    );

    println!("\nBy date:");
    for day in db.get_date_counts(LIMIT)? {
        println!("  {}  {}", day.local_date, day.count);
    }

    println!("\nBy place:");
    for place in db.get_place_counts(LIMIT)? {
        println!("  {} ({}, {})  {}", place.name_local, place.name_en, place.country_code, place.count);
    }
    println!("  Location unknown  {}", db.count_location_unknown()?);

    for tag_type in [TagType::Event, TagType::People] {
        println!("\nTags ({}):", tag_type);
        for tag in db.get_tag_counts(tag_type, LIMIT)? {
            println!("  {}  {}", tag.name, tag.count);
        }
    }

    Ok(())
}
