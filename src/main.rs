//! Blockflow CLI - Block-wise Processing of Raw 3-D Images
//!
//! This is a demonstration CLI for the blockflow library.

use anyhow::{bail, Context, Result};
use blockflow::prelude::*;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::init();
    println!("Blockflow - out-of-core 3-D image processing v{}", blockflow::VERSION);
    println!();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        return;
    }

    let result = match args[1].as_str() {
        "list" => {
            list_operations();
            Ok(())
        }
        "info" => {
            if args.len() < 3 {
                eprintln!("Error: Please specify an image path");
                return;
            }
            image_info(Path::new(&args[2]))
        }
        "floodfill" => flood_fill_cmd(&args[2..]),
        "grow" => grow_cmd(&args[2..]),
        "dualthreshold" => dual_threshold_cmd(&args[2..]),
        "canny" => canny_cmd(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage(&args[0]);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                                     List block operations");
    println!("  info <image>                             Show image dimensions and pixel type");
    println!("  floodfill <image> <x,y,z> <color>        Distributed flood fill");
    println!("  grow <image> <source> <target>           Grow source regions into target pixels");
    println!("  dualthreshold <image> <lower> <upper>    Hysteresis threshold");
    println!("  canny <image> <sigma> <lower> <upper>    Edge detection");
    println!("  help                                     Show this help message");
    println!();
    println!("Common options:");
    println!("  --block-depth <planes>     Z planes per block (default 64)");
    println!("  --connectivity <nearest|all>");
    println!("  --output <name>            Output file name stem (default <input>_out)");
    println!();
    println!("Images are headerless raw files named <name>_<W>x<H>x<D>.raw; the");
    println!("pixel type (uint8, uint16 or float32) is inferred from the file size.");
}

fn list_operations() {
    let registry: OpRegistry<u8> = OpRegistry::with_builtins();
    println!("Block operations ({} total):", registry.names().len());
    println!();
    for name in registry.names() {
        println!("  - {} - {}", name, registry.description(name).unwrap_or(""));
    }
    println!();
    println!("Compounds: floodfill, dualthreshold, canny");
}

fn image_info(path: &Path) -> Result<()> {
    let info = volume_info(path)?;
    println!("Image: {}", info.path.display());
    println!("Dimensions: {}", info.dims);
    println!("Pixel type: {}", info.scalar_type);
    println!("Pixels: {}", info.dims.pixel_count());
    Ok(())
}

/// Options shared by the processing commands.
struct CommonOpts {
    block_depth: i64,
    connectivity: Connectivity,
    output: Option<String>,
}

impl CommonOpts {
    /// Strip `--` options out of `args`, returning the positional remainder.
    fn parse(args: &[String]) -> Result<(Self, Vec<String>)> {
        let mut opts = CommonOpts {
            block_depth: 64,
            connectivity: Connectivity::Nearest,
            output: None,
        };
        let mut positional = Vec::new();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--block-depth" if i + 1 < args.len() => {
                    opts.block_depth = args[i + 1]
                        .parse()
                        .with_context(|| format!("bad block depth '{}'", args[i + 1]))?;
                    i += 2;
                }
                "--connectivity" if i + 1 < args.len() => {
                    opts.connectivity = args[i + 1]
                        .parse()
                        .map_err(|e: String| anyhow::anyhow!(e))?;
                    i += 2;
                }
                "--output" if i + 1 < args.len() => {
                    opts.output = Some(args[i + 1].clone());
                    i += 2;
                }
                other if other.starts_with("--") => bail!("unknown option: {}", other),
                _ => {
                    positional.push(args[i].clone());
                    i += 1;
                }
            }
        }
        Ok((opts, positional))
    }

    fn output_name(&self, input: &Path) -> String {
        if let Some(name) = &self.output {
            return name.clone();
        }
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        // Drop the dimension suffix; write_volume re-appends the real one.
        let stem = stem.rsplit_once('_').map(|(s, _)| s).unwrap_or(stem);
        format!("{}_out", stem)
    }
}

fn parse_point(s: &str) -> Result<Vec3> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        bail!("expected x,y,z but got '{}'", s);
    }
    Ok(Vec3::new(
        parts[0].trim().parse().context("bad x coordinate")?,
        parts[1].trim().parse().context("bad y coordinate")?,
        parts[2].trim().parse().context("bad z coordinate")?,
    ))
}

/// Run a closure against the volume loaded with its native pixel type.
fn with_volume<F>(path: &Path, opts: &CommonOpts, f: F) -> Result<()>
where
    F: FnOnce(&LocalExecutor, &mut dyn VolumeRunner) -> Result<()>,
{
    let info = volume_info(path)?;
    let exec = LocalExecutor::new(opts.block_depth)?;
    println!(
        "Processing {} ({} blocks of {} planes)",
        path.display(),
        (info.dims.z + opts.block_depth - 1) / opts.block_depth.max(1),
        opts.block_depth
    );

    let out_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let out_name = opts.output_name(path);
    match info.scalar_type {
        ScalarType::U8 => run_typed::<u8, F>(path, &exec, out_dir, out_name, f),
        ScalarType::U16 => run_typed::<u16, F>(path, &exec, out_dir, out_name, f),
        ScalarType::F32 => run_typed::<f32, F>(path, &exec, out_dir, out_name, f),
    }
}

fn run_typed<T: Scalar, F>(
    path: &Path,
    exec: &LocalExecutor,
    out_dir: PathBuf,
    out_name: String,
    f: F,
) -> Result<()>
where
    F: FnOnce(&LocalExecutor, &mut dyn VolumeRunner) -> Result<()>,
{
    let mut vol: Volume<T> = read_volume(path)?;
    let mut runner = TypedRunner { vol: &mut vol };
    f(exec, &mut runner)?;
    let out = write_volume(&out_dir, &out_name, &vol)?;
    println!("Saved {}", out.display());
    Ok(())
}

/// Type-erased handle the commands drive; one implementation per pixel type.
trait VolumeRunner {
    fn flood_fill(&mut self, exec: &LocalExecutor, fill: &FloodFill) -> BlockflowResult<FillOutcome>;
    fn converge(
        &mut self,
        exec: &LocalExecutor,
        op_name: &str,
        params: &OpParams,
    ) -> BlockflowResult<ConvergenceOutcome>;
    fn dual_threshold(
        &mut self,
        exec: &LocalExecutor,
        lower: f64,
        upper: f64,
    ) -> BlockflowResult<ConvergenceOutcome>;
    fn detect_edges(
        &mut self,
        exec: &LocalExecutor,
        sigma: f64,
        lower: f64,
        upper: f64,
    ) -> BlockflowResult<ConvergenceOutcome>;
}

struct TypedRunner<'a, T: Scalar> {
    vol: &'a mut Volume<T>,
}

impl<T: Scalar> VolumeRunner for TypedRunner<'_, T> {
    fn flood_fill(&mut self, exec: &LocalExecutor, fill: &FloodFill) -> BlockflowResult<FillOutcome> {
        fill.run(exec, self.vol)
    }

    fn converge(
        &mut self,
        exec: &LocalExecutor,
        op_name: &str,
        params: &OpParams,
    ) -> BlockflowResult<ConvergenceOutcome> {
        let registry: OpRegistry<T> = OpRegistry::with_builtins();
        let op = registry.build(op_name, params)?;
        ConvergenceDriver::new().run(exec, self.vol, op.as_ref())
    }

    fn dual_threshold(
        &mut self,
        exec: &LocalExecutor,
        lower: f64,
        upper: f64,
    ) -> BlockflowResult<ConvergenceOutcome> {
        dual_threshold(exec, self.vol, lower, upper, &ConvergenceDriver::new())
    }

    fn detect_edges(
        &mut self,
        exec: &LocalExecutor,
        sigma: f64,
        lower: f64,
        upper: f64,
    ) -> BlockflowResult<ConvergenceOutcome> {
        detect_edges(exec, self.vol, sigma, lower, upper, &ConvergenceDriver::new())
    }
}

fn flood_fill_cmd(args: &[String]) -> Result<()> {
    let (opts, positional) = CommonOpts::parse(args)?;
    if positional.len() != 3 {
        bail!("usage: floodfill <image> <x,y,z> <color> [options]");
    }
    let path = Path::new(&positional[0]);
    let start = parse_point(&positional[1])?;
    let color: f64 = positional[2].parse().context("bad fill color")?;

    with_volume(path, &opts, |exec, runner| {
        let fill = FloodFill::new(start, color).connectivity(opts.connectivity);
        let outcome = runner.flood_fill(exec, &fill)?;
        println!(
            "Filled {} pixels in {} round(s)",
            outcome.pixels_filled, outcome.iterations
        );
        Ok(())
    })
}

fn grow_cmd(args: &[String]) -> Result<()> {
    let (opts, positional) = CommonOpts::parse(args)?;
    if positional.len() != 3 {
        bail!("usage: grow <image> <source-color> <target-color> [options]");
    }
    let path = Path::new(&positional[0]);
    let params = OpParams {
        source_color: positional[1].parse().context("bad source color")?,
        target_color: positional[2].parse().context("bad target color")?,
        connectivity: opts.connectivity,
        ..OpParams::default()
    };

    with_volume(path, &opts, |exec, runner| {
        let outcome = runner.converge(exec, "grow", &params)?;
        println!(
            "Grew {} pixels in {} round(s)",
            outcome.total_changed, outcome.iterations
        );
        Ok(())
    })
}

fn dual_threshold_cmd(args: &[String]) -> Result<()> {
    let (opts, positional) = CommonOpts::parse(args)?;
    if positional.len() != 3 {
        bail!("usage: dualthreshold <image> <lower> <upper> [options]");
    }
    let path = Path::new(&positional[0]);
    let lower: f64 = positional[1].parse().context("bad lower threshold")?;
    let upper: f64 = positional[2].parse().context("bad upper threshold")?;

    with_volume(path, &opts, |exec, runner| {
        let outcome = runner.dual_threshold(exec, lower, upper)?;
        println!(
            "Accepted {} uncertain pixels in {} round(s)",
            outcome.total_changed, outcome.iterations
        );
        Ok(())
    })
}

fn canny_cmd(args: &[String]) -> Result<()> {
    let (opts, positional) = CommonOpts::parse(args)?;
    if positional.len() != 4 {
        bail!("usage: canny <image> <sigma> <lower> <upper> [options]");
    }
    let path = Path::new(&positional[0]);
    let sigma: f64 = positional[1].parse().context("bad sigma")?;
    let lower: f64 = positional[2].parse().context("bad lower threshold")?;
    let upper: f64 = positional[3].parse().context("bad upper threshold")?;

    with_volume(path, &opts, |exec, runner| {
        let outcome = runner.detect_edges(exec, sigma, lower, upper)?;
        println!(
            "Edge tracking settled in {} round(s) ({} promotions)",
            outcome.iterations, outcome.total_changed
        );
        Ok(())
    })
}
