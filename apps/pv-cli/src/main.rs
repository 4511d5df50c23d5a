use clap::{Args, Parser, Subcommand};
use pv_controls::{MpptController, PerturbObserve, PoAction};
use pv_core::units::{amp, volt};
use pv_sim::{FirstOrderConverter, PvPanel, SimOptions, SimProgress, run_sim_with_progress};
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pv-cli")]
#[command(about = "pvtrack CLI - Perturb-and-Observe MPPT simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tracking simulation against the virtual panel
    Track(TrackArgs),
    /// Export the theoretical panel curve as CSV
    Curve(CurveArgs),
}

#[derive(Args)]
struct PanelArgs {
    /// Panel maximum-current voltage (V)
    #[arg(long, default_value_t = 17.0)]
    v_mpp: f64,
    /// Panel peak current (A)
    #[arg(long, default_value_t = 5.0)]
    i_peak: f64,
    /// Panel curve width parameter (1/V^2)
    #[arg(long, default_value_t = 0.05)]
    curvature: f64,
}

impl PanelArgs {
    fn build(&self) -> Result<PvPanel, Box<dyn Error>> {
        Ok(PvPanel::new(
            volt(self.v_mpp),
            amp(self.i_peak),
            self.curvature,
        )?)
    }
}

#[derive(Args)]
struct TrackArgs {
    /// Perturbation step (V)
    #[arg(long, default_value_t = 0.5)]
    step_size: f64,
    /// Lower reference bound (V)
    #[arg(long, default_value_t = 10.0)]
    v_min: f64,
    /// Upper reference bound (V)
    #[arg(long, default_value_t = 45.0)]
    v_max: f64,
    /// Controller sample period (s)
    #[arg(long, default_value_t = 0.2)]
    sample_time: f64,
    /// Simulated duration (s)
    #[arg(long, default_value_t = 20.0)]
    duration: f64,
    /// Fine integration step (s); defaults to a tenth of the sample period
    #[arg(long)]
    dt: Option<f64>,
    /// Current-measurement noise amplitude (A)
    #[arg(long, default_value_t = 0.05)]
    noise: f64,
    /// Noise seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Converter time constant (s); omit for ideal one-step tracking
    #[arg(long)]
    tau: Option<f64>,
    /// Converter slew limit (V/s), used with --tau
    #[arg(long, default_value_t = 200.0)]
    slew: f64,
    /// Pace the loop in real time
    #[arg(long)]
    realtime: bool,
    #[command(flatten)]
    panel: PanelArgs,
    /// Trajectory CSV output path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Controller history JSON output path
    #[arg(long)]
    history_json: Option<PathBuf>,
}

#[derive(Args)]
struct CurveArgs {
    /// Sweep start (V)
    #[arg(long, default_value_t = 10.0)]
    v_min: f64,
    /// Sweep end (V)
    #[arg(long, default_value_t = 45.0)]
    v_max: f64,
    /// Number of sweep points
    #[arg(long, default_value_t = 200)]
    points: usize,
    #[command(flatten)]
    panel: PanelArgs,
    /// Output CSV file path (optional, defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => cmd_track(&args),
        Commands::Curve(args) => cmd_curve(&args),
    }
}

fn cmd_track(args: &TrackArgs) -> Result<(), Box<dyn Error>> {
    println!("Running P&O tracking simulation");
    println!(
        "  step = {} V, bounds = [{}, {}] V, sample time = {} s, duration = {} s",
        args.step_size, args.v_min, args.v_max, args.sample_time, args.duration
    );

    let config = PerturbObserve::new(args.step_size, args.v_max, args.v_min, args.sample_time)?;
    let mut controller = MpptController::new(config);
    let panel = args.panel.build()?;
    let converter = args
        .tau
        .map(|tau| FirstOrderConverter::new(tau, args.slew))
        .transpose()?;

    let opts = SimOptions {
        t_end: args.duration,
        dt: args.dt.unwrap_or(args.sample_time / 10.0),
        noise_amplitude: args.noise,
        noise_seed: args.seed,
        converter,
        realtime: args.realtime,
        ..Default::default()
    };

    let started = Instant::now();
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let record = run_sim_with_progress(
        &panel,
        &mut controller,
        &opts,
        Some(&mut |event: &SimProgress| {
            let emit_now = (event.fraction_complete - last_fraction).abs() >= 0.005
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_progress(event, started.elapsed().as_secs_f64());
                last_fraction = event.fraction_complete;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!(
        "✓ Simulation completed: {} recorded points, {} controller samples",
        record.t.len(),
        controller.history().len()
    );

    let p_max = panel.max_power(args.v_min, args.v_max);
    if let Some(end) = record.x.last() {
        println!("  Final reference: {:.2} V", end.v_ref);
        println!("  Final voltage:   {:.2} V", end.voltage);
        println!(
            "  Final power:     {:.2} W ({:.1}% of panel max {:.2} W)",
            end.power,
            100.0 * end.power / p_max,
            p_max
        );
    }

    let mut increases = 0usize;
    let mut decreases = 0usize;
    for rec in controller.history().iter() {
        match rec.action {
            PoAction::Increase => increases += 1,
            PoAction::Decrease => decreases += 1,
            PoAction::Init => {}
        }
    }
    println!("  Decisions: {} increase, {} decrease", increases, decreases);

    if let Some(path) = args.output.as_deref() {
        let mut csv = String::from("time_s,voltage_v,current_a,power_w,v_ref_v\n");
        for (t, point) in record.t.iter().zip(record.x.iter()) {
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                t, point.voltage, point.current, point.power, point.v_ref
            ));
        }
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} trajectory points to {}",
            record.t.len(),
            path.display()
        );
    }

    if let Some(path) = args.history_json.as_deref() {
        let json = serde_json::to_string_pretty(&controller.history().series())?;
        std::fs::write(path, json)?;
        println!(
            "✓ Exported {} history samples to {}",
            controller.history().len(),
            path.display()
        );
    }

    Ok(())
}

fn cmd_curve(args: &CurveArgs) -> Result<(), Box<dyn Error>> {
    let panel = args.panel.build()?;
    let curve = panel.curve(args.v_min, args.v_max, args.points);

    let mut csv = String::from("voltage_v,current_a,power_w\n");
    for point in &curve {
        csv.push_str(&format!(
            "{},{},{}\n",
            point.voltage, point.current, point.power
        ));
    }

    match args.output.as_deref() {
        Some(path) => {
            std::fs::write(path, csv)?;
            println!(
                "✓ Exported {} curve points to {}",
                curve.len(),
                path.display()
            );
        }
        None => print!("{}", csv),
    }

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_progress(event: &SimProgress, elapsed: f64) {
    let width = 28usize;
    let filled = ((event.fraction_complete * width as f64).round() as usize).min(width);
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    print!(
        "\r[{}] {:>6.2}%  t={:.2}/{:.2}s  V={:.2}V  P={:.2}W  elapsed={:.1}s",
        bar,
        event.fraction_complete * 100.0,
        event.t,
        event.t_end,
        event.voltage,
        event.power,
        elapsed
    );
    let _ = io::stdout().flush();
}
