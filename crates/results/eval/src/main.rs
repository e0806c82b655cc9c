#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_lossless
)]
#![doc = include_str!("../README.md")]

use clap::Parser;
use ftlog::{
    appender::{FileAppender, Period},
    LevelFilter, LoggerGuard,
};
use ndarray::Array2;

use lodopab::{
    eval::{measure_by_name, Measure, Reconstructor, TaskTable, TestData},
    LodopabConfig, LodopabDataset, Out, Partition, RangeSpec,
};

/// Command line arguments for evaluating baseline reconstructors on LoDoPaB
/// samples.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct EvalArgs {
    /// Path to the directory with the LoDoPaB shard files.
    #[arg(long)]
    data_dir: std::path::PathBuf,
    /// The partition to draw evaluation samples from.
    #[arg(long, default_value = "test")]
    partition: String,
    /// Number of samples to evaluate, taken from the start of the partition.
    #[arg(long, default_value = "16")]
    num_samples: usize,
    /// The observation model to retrieve observations in, `post-log` or
    /// `pre-log`.
    #[arg(long, default_value = "post-log")]
    observation_model: String,
    /// Replacement value for a simulated photon count of zero. Omit to keep
    /// the floor the dataset was simulated with.
    #[arg(long)]
    min_photon_count: Option<f32>,
    /// Short names of the measures to apply, comma separated.
    #[arg(long, default_value = "l2")]
    measures: String,
}

fn main() -> Result<(), String> {
    let (_guard, log_path) = configure_logger("lodopab-eval")?;
    println!("Log file: {log_path:?}");

    let args = EvalArgs::parse();

    let partition = Partition::from_name(&args.partition).map_err(|e| e.to_string())?;
    let measures = args
        .measures
        .split(',')
        .map(|name| measure_by_name(name.trim()).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let measure_refs: Vec<&dyn Measure> = measures.iter().map(|measure| measure.as_ref()).collect();

    let mut config = LodopabConfig::new(&args.data_dir)
        .with_observation_model(&args.observation_model)
        .map_err(|e| e.to_string())?;
    if let Some(count) = args.min_photon_count {
        config = config.with_min_photon_count(count);
    }
    let dataset = LodopabDataset::new(config).map_err(|e| e.to_string())?;

    let num_samples = args.num_samples.min(dataset.len(partition));
    ftlog::info!("Evaluating {num_samples} {partition} samples from {:?} ...", args.data_dir);

    let test_data = load_test_data(&dataset, partition, num_samples).map_err(|e| e.to_string())?;

    let zero = ZeroReconstructor {
        shape: dataset.layout().ground_truth_shape,
    };
    let mean = MeanReconstructor {
        shape: dataset.layout().ground_truth_shape,
    };
    let reconstructors: [&dyn Reconstructor; 2] = [&zero, &mean];

    let mut table = TaskTable::new(&format!("lodopab-{partition}"));
    table.append_all_combinations(&test_data, &reconstructors, &measure_refs);
    let results = table.run(false);

    report(&results, &reconstructors, &measure_refs);
    Ok(())
}

/// Retrieves the first `num_samples` pairs of `partition` as evaluation
/// samples.
fn load_test_data(
    dataset: &LodopabDataset,
    partition: Partition,
    num_samples: usize,
) -> Result<Vec<TestData>, lodopab::Error> {
    let num_samples = isize::try_from(num_samples).unwrap_or(isize::MAX);
    let (observations, ground_truths) = dataset.get_range(
        RangeSpec::new(0, num_samples, 1),
        partition,
        (Out::Allocate, Out::Allocate),
    )?;
    let (observations, ground_truths) = match (observations, ground_truths) {
        (Some(observations), Some(ground_truths)) => (observations, ground_truths),
        // `Out::Allocate` always yields both fields.
        _ => unreachable!("get_range with Allocate must return both fields"),
    };

    Ok(observations
        .outer_iter()
        .zip(ground_truths.outer_iter())
        .enumerate()
        .map(|(index, (observation, ground_truth))| {
            TestData::new(
                observation.to_owned(),
                Some(ground_truth.to_owned()),
                &format!("{partition}-{index:05}"),
            )
        })
        .collect())
}

/// Logs per-task measure values and per-reconstructor means.
fn report(results: &lodopab::eval::ResultTable, reconstructors: &[&dyn Reconstructor], measures: &[&dyn Measure]) {
    // Tasks are laid out sample-major with one task per reconstructor, in
    // the order `append_all_combinations` produced them.
    for (index, values) in results.measure_values.iter().enumerate() {
        let reconstructor = reconstructors[index % reconstructors.len()].name();
        let name = &results.names[index];
        for (measure, value) in measures.iter().zip(values) {
            ftlog::info!("{name} {reconstructor} {}: {value:.6}", measure.short_name());
        }
    }

    for (offset, reconstructor) in reconstructors.iter().enumerate() {
        for (column, measure) in measures.iter().enumerate() {
            // Tasks without a ground truth carry no measure values; they
            // contribute nothing to the mean.
            let values = results
                .measure_values
                .iter()
                .skip(offset)
                .step_by(reconstructors.len())
                .filter_map(|values| values.get(column).copied());
            let (count, sum) = values.fold((0_usize, 0.0_f32), |(count, sum), value| (count + 1, sum + value));
            #[allow(clippy::cast_precision_loss)]
            let mean = if count == 0 { f32::NAN } else { sum / count as f32 };
            let line = format!(
                "{} mean {} over {count} samples: {mean:.6}",
                reconstructor.name(),
                measure.short_name(),
            );
            ftlog::info!("{line}");
            println!("{line}");
        }
    }
}

/// Reconstructs every observation as an all-zero image. The floor any
/// useful algorithm has to beat.
struct ZeroReconstructor {
    /// The ground truth shape to emit.
    shape: (usize, usize),
}

impl Reconstructor for ZeroReconstructor {
    fn name(&self) -> &str {
        "zero"
    }

    fn reconstruct(&self, _observation: &Array2<f32>) -> Array2<f32> {
        Array2::zeros(self.shape)
    }
}

/// Reconstructs every observation as a constant image holding the
/// observation's mean value.
struct MeanReconstructor {
    /// The ground truth shape to emit.
    shape: (usize, usize),
}

impl Reconstructor for MeanReconstructor {
    fn name(&self) -> &str {
        "mean"
    }

    fn reconstruct(&self, observation: &Array2<f32>) -> Array2<f32> {
        let mean = observation.mean().unwrap_or(0.0);
        Array2::from_elem(self.shape, mean)
    }
}

/// Configures the logger.
///
/// # Errors
///
/// - If a logs directory could not be located/created.
/// - If the logger could not be initialized.
fn configure_logger(file_name: &str) -> Result<(LoggerGuard, std::path::PathBuf), String> {
    let root_dir = std::path::PathBuf::from(".")
        .canonicalize()
        .map_err(|e| e.to_string())?;
    let logs_dir = root_dir.join("logs");
    if !logs_dir.exists() {
        std::fs::create_dir(&logs_dir).map_err(|e| e.to_string())?;
    }
    let log_path = logs_dir.join(format!("{file_name}.log"));

    let writer = FileAppender::builder().path(&log_path).rotate(Period::Day).build();

    let err_path = log_path.with_extension("err.log");

    let guard = ftlog::Builder::new()
        // global max log level
        .max_log_level(LevelFilter::Info)
        // define root appender, pass None would write to stderr
        .root(writer)
        // write `Debug` and higher logs in ftlog::appender to `err_path` instead of `log_path`
        .filter("ftlog::appender", "ftlog-appender", LevelFilter::Debug)
        .appender("ftlog-appender", FileAppender::new(err_path))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok((guard, log_path))
}
