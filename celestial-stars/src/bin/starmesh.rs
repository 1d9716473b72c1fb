use anyhow::{bail, Context};
use celestial_stars::catalog::{
    CatalogReader, CatalogWriter, Endianness, MagnitudeTable, RecordVariant, StarEntry,
};
use celestial_stars::geometry::{angular_separation_deg, RotationMatrix3};
use celestial_stars::{
    CatalogConfig, DecodedStar, Mesh, MultiLevelCatalog, RetentionPolicy, StarQuery, ZoneId,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "starmesh")]
#[command(about = "Inspect, query and build geodesic-mesh star catalogs")]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header and zone statistics of a catalog file
    Info {
        /// Path to the catalog file
        catalog: PathBuf,
    },
    /// Select stars around a sky position
    Search {
        /// JSON layer configuration (conflicts with --catalog)
        #[arg(long, conflicts_with = "catalog", required_unless_present = "catalog")]
        config: Option<PathBuf>,
        /// Catalog layer files, brightest first
        #[arg(long, num_args = 1..)]
        catalog: Vec<PathBuf>,
        /// Right ascension in degrees
        ra: f64,
        /// Declination in degrees
        #[arg(allow_hyphen_values = true)]
        dec: f64,
        /// Search radius in degrees
        #[arg(long, default_value = "1.0")]
        radius: f64,
        /// Faintest magnitude returned
        #[arg(long, default_value = "8.0")]
        mag: f64,
        /// Precess output positions from J2000 to this Julian year
        #[arg(long)]
        epoch: Option<f64>,
        /// Maximum number of results (brightest first)
        #[arg(long)]
        limit: Option<usize>,
        /// Print query timing
        #[arg(long)]
        timing: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Build a catalog file from CSV rows of ra,dec,mag[,b_v[,hip]]
    Build {
        /// Input CSV (degrees, J2000)
        #[arg(long)]
        input: PathBuf,
        /// Output catalog file
        #[arg(long)]
        output: PathBuf,
        /// Record format: star32, star16, star8, gaia32, gaia16, gaia8
        #[arg(long, value_parser = parse_variant, default_value = "star16")]
        variant: RecordVariant,
        /// Mesh depth of the zones
        #[arg(long, default_value = "3")]
        depth: u32,
        /// Brightest magnitude of the magnitude table
        #[arg(long, default_value = "-2.0", allow_hyphen_values = true)]
        mag_min: f32,
        /// Faintest magnitude of the magnitude table
        #[arg(long, default_value = "16.0")]
        mag_max: f32,
        /// Write big-endian records
        #[arg(long)]
        big_endian: bool,
    },
    /// Print the mesh zone containing a sky position
    Zone {
        /// Right ascension in degrees
        ra: f64,
        /// Declination in degrees
        #[arg(allow_hyphen_values = true)]
        dec: f64,
        /// Mesh level
        #[arg(long, default_value = "3")]
        level: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Info { catalog } => print_info(&catalog)?,
        Commands::Search {
            config,
            catalog,
            ra,
            dec,
            radius,
            mag,
            epoch,
            limit,
            timing,
            format,
        } => {
            let multi = match config {
                Some(path) => MultiLevelCatalog::from_config(&CatalogConfig::load(&path)?)?,
                None => {
                    let layers: Vec<(PathBuf, RetentionPolicy)> = catalog
                        .into_iter()
                        .map(|p| (p, RetentionPolicy::EvictOnDemand))
                        .collect();
                    MultiLevelCatalog::open_paths(layers.as_slice())?
                }
            };

            let mut query = StarQuery::from_degrees(ra, dec, radius, mag);
            if let Some(year) = epoch {
                query = query.with_precession(RotationMatrix3::precession_from_j2000(year));
            }

            let start = if timing { Some(Instant::now()) } else { None };

            let mut stars = multi.query(&query)?;

            if let Some(start_time) = start {
                let elapsed = start_time.elapsed();
                eprintln!(
                    "Query completed in {:.2} ms",
                    elapsed.as_secs_f64() * 1000.0
                );
            }

            if let Some(limit) = limit {
                stars.sort_by(|a, b| a.mag.total_cmp(&b.mag));
                stars.truncate(limit);
            }

            let rows: Vec<JsonStar> = stars.iter().map(|s| JsonStar::new(s, ra, dec)).collect();
            match format {
                OutputFormat::Table => print_table(&rows),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Csv => print_csv(&rows),
            }
        }
        Commands::Build {
            input,
            output,
            variant,
            depth,
            mag_min,
            mag_max,
            big_endian,
        } => {
            if mag_max <= mag_min {
                bail!("--mag-max ({}) must be fainter than --mag-min ({})", mag_max, mag_min);
            }
            let entries = read_csv(&input)?;
            let steps = variant.max_mag_code() as i32;
            let table = MagnitudeTable::from_magnitudes(mag_min, mag_max - mag_min, steps);
            let endianness = if big_endian {
                Endianness::Big
            } else {
                Endianness::Little
            };

            let mut writer = CatalogWriter::new(variant, depth, table)?.endianness(endianness);
            writer.extend(&entries);
            writer
                .write_file(&output)
                .with_context(|| format!("Failed to write catalog {:?}", output))?;
            println!(
                "Wrote {} stars to {:?} ({}, depth {})",
                writer.star_count(),
                output,
                variant,
                depth
            );
        }
        Commands::Zone { ra, dec, level } => {
            let mesh = Mesh::build(level)?;
            let direction = celestial_stars::geometry::direction_deg(ra, dec);
            let zone = ZoneId::new(level, mesh.locate(&direction, level) as u32);
            let triangle = mesh.triangle(level, zone.index as usize);

            println!("Zone: {} (external id {})", zone, zone.to_external());
            let (cra, cdec) = triangle.center.to_spherical();
            println!(
                "Center: RA={:.6}° Dec={:+.6}°",
                cra.to_degrees(),
                cdec.to_degrees()
            );
            for (i, corner) in mesh.corners(triangle).iter().enumerate() {
                let (ra, dec) = corner.to_spherical();
                println!(
                    "Corner {}: RA={:.6}° Dec={:+.6}°",
                    i,
                    ra.to_degrees(),
                    dec.to_degrees()
                );
            }
            println!("Size: {:.4}°", triangle.size.to_degrees());
        }
    }

    Ok(())
}

fn print_info(path: &Path) -> anyhow::Result<()> {
    let reader = CatalogReader::open(path)?;
    let index = reader.index();
    let size_mb = reader.file_size() as f64 / 1_048_576.0;

    let counts: Vec<usize> = (0..index.len()).map(|z| index.star_count(z)).collect();
    let occupied = counts.iter().filter(|&&c| c > 0).count();
    let densest = counts.iter().copied().max().unwrap_or(0);

    println!("{}", reader.header());
    println!("Total stars: {}", index.total_stars());
    println!("Occupied zones: {} of {}", occupied, index.len());
    println!("Densest zone: {} stars", densest);
    if let Some(global) = index.global_zone() {
        println!("Global zone: {} stars", index.star_count(global));
    }
    println!(
        "File size: {} bytes ({:.2} MB)",
        reader.file_size(),
        size_mb
    );
    Ok(())
}

#[derive(serde::Serialize)]
struct JsonStar {
    hip: Option<u32>,
    ra_deg: f64,
    dec_deg: f64,
    mag: f32,
    b_v: f32,
    distance_deg: f64,
}

impl JsonStar {
    fn new(star: &DecodedStar, ra: f64, dec: f64) -> Self {
        let (ra_deg, dec_deg) = star.ra_dec_deg();
        Self {
            hip: star.hip,
            ra_deg,
            dec_deg,
            mag: star.mag,
            b_v: star.b_v(),
            distance_deg: angular_separation_deg(ra, dec, ra_deg, dec_deg),
        }
    }
}

fn print_table(rows: &[JsonStar]) {
    for (i, row) in rows.iter().enumerate() {
        let hip = row.hip.map(|h| format!("HIP {}", h)).unwrap_or_default();
        println!(
            "{:4}: {:>10} RA={:.6}° Dec={:+.6}° Mag={:5.2} B-V={:+.2} Dist={:.4}°",
            i + 1,
            hip,
            row.ra_deg,
            row.dec_deg,
            row.mag,
            row.b_v,
            row.distance_deg
        );
    }

    if rows.is_empty() {
        println!("No stars found matching the search criteria.");
    } else {
        println!("\nTotal results: {}", rows.len());
    }
}

fn print_csv(rows: &[JsonStar]) {
    println!("hip,ra_deg,dec_deg,mag,b_v,distance_deg");
    for r in rows {
        println!(
            "{},{},{},{},{},{}",
            r.hip.map(|h| h.to_string()).unwrap_or_default(),
            r.ra_deg,
            r.dec_deg,
            r.mag,
            r.b_v,
            r.distance_deg
        );
    }
}

fn parse_variant(s: &str) -> Result<RecordVariant, String> {
    RecordVariant::from_name(&s.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown record format '{}'", s))
}

/// Reads `ra,dec,mag[,b_v[,hip]]` rows. Blank lines, `#` comments and a
/// non-numeric header row are skipped.
fn read_csv(path: &Path) -> anyhow::Result<Vec<StarEntry>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read input {:?}", path))?;

    let mut entries = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if n == 0 && fields[0].parse::<f64>().is_err() {
            continue;
        }
        if fields.len() < 3 {
            bail!("{:?} line {}: expected ra,dec,mag[,b_v[,hip]]", path, n + 1);
        }

        let parse = |i: usize| -> anyhow::Result<f64> {
            fields[i]
                .parse::<f64>()
                .with_context(|| format!("{:?} line {}: bad number '{}'", path, n + 1, fields[i]))
        };
        let mut entry = StarEntry::new(parse(0)?, parse(1)?, parse(2)? as f32);
        if fields.len() > 3 && !fields[3].is_empty() {
            entry.b_v = parse(3)? as f32;
        }
        if fields.len() > 4 && !fields[4].is_empty() {
            entry.hip = Some(
                fields[4]
                    .parse()
                    .with_context(|| format!("{:?} line {}: bad HIP number", path, n + 1))?,
            );
        }
        entries.push(entry);
    }

    if entries.is_empty() {
        bail!("No stars in {:?}", path);
    }
    Ok(entries)
}
