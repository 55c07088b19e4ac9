use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use filterbench::{
    BackendKind, BackendLane, BackendSettings, BenchmarkResult, Benchmarker, ControlValue,
    FilterKind, InMemorySink, PixelBuffer, WorkbenchOpts, create_backend, display_channel,
};

#[derive(Parser, Debug)]
#[command(name = "filterbench", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Benchmark one backend at one control value.
    Benchmark(BenchmarkArgs),
    /// Benchmark every available backend at the same control value.
    Compare(CompareArgs),
    /// Submit control values in rapid succession and report what reached the display.
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
struct SharedArgs {
    /// Input image (any format the `image` crate decodes).
    #[arg(long)]
    image: PathBuf,

    /// Workbench options JSON; omitted keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct BenchmarkArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Backend to benchmark.
    #[arg(long, default_value = "reference")]
    backend: BackendKind,

    /// Control value in [0, 100]; defaults to the configured initial value.
    #[arg(long)]
    control: Option<u32>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Control value in [0, 100]; defaults to the configured initial value.
    #[arg(long)]
    control: Option<u32>,

    /// Print the results as a JSON array.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Backend to preview on.
    #[arg(long, default_value = "reference")]
    backend: BackendKind,

    /// Control values, submitted back to back.
    #[arg(long, value_delimiter = ',', required = true)]
    controls: Vec<u32>,

    /// Write the last displayed frame as PNG.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Benchmark(args) => cmd_benchmark(args),
        Command::Compare(args) => cmd_compare(args),
        Command::Preview(args) => cmd_preview(args),
    }
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<WorkbenchOpts> {
    match path {
        Some(p) => Ok(WorkbenchOpts::from_json_path(p)?),
        None => Ok(WorkbenchOpts::default()),
    }
}

fn load_input(shared: &SharedArgs) -> anyhow::Result<(Arc<PixelBuffer>, WorkbenchOpts)> {
    let opts = load_opts(shared.config.as_deref())?;
    let input = filterbench::load_image(&shared.image)
        .with_context(|| format!("load input image '{}'", shared.image.display()))?;
    Ok((Arc::new(input), opts))
}

fn resolve_control(control: Option<u32>, opts: &WorkbenchOpts) -> anyhow::Result<ControlValue> {
    match control {
        Some(v) => Ok(ControlValue::new(v)?),
        None => Ok(opts.initial_control),
    }
}

fn benchmark_one(
    kind: BackendKind,
    input: &Arc<PixelBuffer>,
    opts: &WorkbenchOpts,
    control: ControlValue,
) -> anyhow::Result<BenchmarkResult> {
    let settings = BackendSettings {
        downsample_factor: opts.downsample_factor,
    };
    let backend = create_backend(kind, &settings)?;
    let lane = BackendLane::configure(backend, Arc::clone(input), opts.slot_count)
        .with_context(|| format!("configure backend '{kind}'"))?;
    let benchmarker = Benchmarker::new(opts.warmup, opts.measurement)?;
    let result = benchmarker.run_on_lane(&lane, FilterKind::Blur.parameter(control));
    lane.shutdown();
    result.with_context(|| format!("benchmark backend '{kind}'"))
}

fn print_result(r: &BenchmarkResult) {
    println!(
        "{:<10} {} control={:<3} param={:>6.2} warmup={:<3} iterations={:<5} avg={:.3} ms max={:.3} ms",
        r.backend,
        r.filter.as_str(),
        r.control.get(),
        r.parameter,
        r.warmup_iterations,
        r.iterations,
        r.average_ms,
        r.max_iteration_ms,
    );
}

fn cmd_benchmark(args: BenchmarkArgs) -> anyhow::Result<()> {
    let (input, opts) = load_input(&args.shared)?;
    let control = resolve_control(args.control, &opts)?;
    let result = benchmark_one(args.backend, &input, &opts, control)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn cmd_compare(args: CompareArgs) -> anyhow::Result<()> {
    let (input, opts) = load_input(&args.shared)?;
    let control = resolve_control(args.control, &opts)?;
    let mut results = Vec::new();
    for kind in BackendKind::available() {
        let result = benchmark_one(kind, &input, &opts, control)?;
        if !args.json {
            print_result(&result);
        }
        results.push(result);
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let (input, opts) = load_input(&args.shared)?;
    let controls = args
        .controls
        .iter()
        .map(|&v| ControlValue::new(v))
        .collect::<Result<Vec<_>, _>>()?;

    let (display, queue) = display_channel();
    let mut bench = filterbench::Workbench::from_kinds(input, &[args.backend], &opts, display)?;
    for control in controls {
        bench.submit_control(control)?;
    }
    bench.wait_idle();

    let mut sink = InMemorySink::new();
    queue.drain(&mut sink);
    for frame in sink.frames() {
        println!(
            "frame generation={} control={} slot={} latency={:.3} ms",
            frame.generation,
            frame.control.get(),
            frame.slot,
            frame.latency.as_secs_f64() * 1000.0,
        );
    }
    let stats = bench.preview_stats();
    println!(
        "submitted={} published={} superseded={} failed={}",
        stats.submitted, stats.published, stats.superseded, stats.failed
    );

    if let Some(out) = &args.out {
        let frame = sink
            .last_frame()
            .context("no frame reached the display; nothing to write")?;
        filterbench::save_png(out, &frame.image)?;
        eprintln!("wrote {}", out.display());
    }
    bench.shutdown();
    Ok(())
}
