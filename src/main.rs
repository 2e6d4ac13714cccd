use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use av_blockmatch::{
    Frame,
    MatchConfig,
    pnm,
    predict_frame,
    y4m::{ClipDetails, get_clip_details, read_frame_pair, write_video_frame},
};
use clap::{ArgAction, Parser};
use log::{LevelFilter, info};
use v_frame::pixel::Pixel;

const REFERENCE_NAME: &str = "frame1.ppm";
const TARGET_NAME: &str = "frame2.ppm";
const RECONSTRUCTED_NAME: &str = "Reconstructed_Frame.ppm";

/// Predicts a frame from its predecessor with three step block matching
#[derive(Parser, Debug)]
#[command(name = "av-blockmatch", version)]
struct Args {
    /// Reference frame (PNM), a y4m clip, or a directory holding frame1.ppm
    /// and frame2.ppm
    reference: PathBuf,

    /// Target frame (PNM)
    target: Option<PathBuf>,

    /// Where to write the predicted frame (PNM, or y4m for clip input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the motion vectors as JSON
    #[arg(long)]
    vectors: Option<PathBuf>,

    /// Block width in pixels
    #[arg(long, default_value_t = 8)]
    block_width: usize,

    /// Block height in pixels
    #[arg(long, default_value_t = 8)]
    block_height: usize,

    /// Horizontal search range in pixels
    #[arg(long, default_value_t = 8)]
    search_horizontal: usize,

    /// Vertical search range in pixels
    #[arg(long, default_value_t = 8)]
    search_vertical: usize,

    /// Index of the reference frame in a y4m clip; the target is the frame
    /// after it
    #[arg(long, default_value_t = 0)]
    frame: usize,

    /// Number of worker threads (default: one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    const fn config(&self) -> MatchConfig {
        MatchConfig {
            block_width: self.block_width,
            block_height: self.block_height,
            search_horizontal: self.search_horizontal,
            search_vertical: self.search_vertical,
        }
    }
}

enum Sink<'a> {
    Pnm(&'a Path),
    Y4m(&'a Path, ClipDetails),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    })?;

    let cfg = args.config();
    cfg.validate()?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to start the thread pool")?;
    }

    if args.reference.is_dir() {
        let dir = &args.reference;
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| dir.join(RECONSTRUCTED_NAME));
        return predict_pnm(
            &args,
            &dir.join(REFERENCE_NAME),
            &dir.join(TARGET_NAME),
            Some(&output),
        );
    }

    if has_extension(&args.reference, "y4m") {
        return predict_y4m(&args);
    }

    let Some(target) = &args.target else {
        bail!("a target frame is required unless the input is a directory or a y4m clip");
    };
    predict_pnm(&args, &args.reference, target, args.output.as_deref())
}

fn init_logger(level: LevelFilter) -> anyhow::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn open_pnm(path: &Path) -> anyhow::Result<pnm::Decoder<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    pnm::Decoder::new(BufReader::new(file))
        .with_context(|| format!("failed to read {}", path.display()))
}

fn predict_pnm(
    args: &Args,
    reference: &Path,
    target: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if output.is_some_and(|p| has_extension(p, "y4m")) {
        bail!("y4m output needs a y4m input clip");
    }
    let ref_dec = open_pnm(reference)?;
    let tgt_dec = open_pnm(target)?;
    let sink = output.map(Sink::Pnm);

    if ref_dec.header().bit_depth().max(tgt_dec.header().bit_depth()) > 8 {
        let frames = (
            ref_dec.read_frame::<u16>()?,
            tgt_dec.read_frame::<u16>()?,
        );
        run(args, &frames.0, &frames.1, sink)
    } else {
        let frames = (ref_dec.read_frame::<u8>()?, tgt_dec.read_frame::<u8>()?);
        run(args, &frames.0, &frames.1, sink)
    }
}

fn predict_y4m(args: &Args) -> anyhow::Result<()> {
    let path = &args.reference;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut dec = y4m::Decoder::new(BufReader::new(file))
        .with_context(|| format!("failed to read {}", path.display()))?;
    let details = get_clip_details(&dec)?;
    info!(
        "Using frames {} and {} of a {}x{} clip",
        args.frame,
        args.frame + 1,
        details.width,
        details.height
    );

    let sink = args.output.as_deref().map(|p| {
        if has_extension(p, "y4m") {
            Sink::Y4m(p, details)
        } else {
            Sink::Pnm(p)
        }
    });

    if details.bit_depth > 8 {
        let (reference, target) = read_frame_pair::<_, u16>(&mut dec, &details, args.frame)?;
        run(args, &reference, &target, sink)
    } else {
        let (reference, target) = read_frame_pair::<_, u8>(&mut dec, &details, args.frame)?;
        run(args, &reference, &target, sink)
    }
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn run<T: Pixel>(
    args: &Args,
    reference: &Frame<T>,
    target: &Frame<T>,
    sink: Option<Sink<'_>>,
) -> anyhow::Result<()> {
    let results = predict_frame(reference, target, args.config())?;
    let stats = &results.stats;
    info!(
        "Matched {} blocks ({} moving) in {:.4}s, reconstructed in {:.4}s",
        stats.blocks, stats.moving_blocks, stats.search_time, stats.reconstruction_time
    );

    if let Some(path) = &args.vectors {
        serde_json::to_writer_pretty(create(path)?, &results.motion_field)
            .context("failed to write motion vectors")?;
    }

    match sink {
        Some(Sink::Pnm(path)) => {
            pnm::write_frame(create(path)?, &results.predicted)?;
            info!("Wrote {}", path.display());
        }
        Some(Sink::Y4m(path, details)) => {
            write_video_frame(create(path)?, &results.predicted, &details)?;
            info!("Wrote {}", path.display());
        }
        None => {}
    }

    println!("{}", serde_json::to_string(stats)?);
    Ok(())
}
