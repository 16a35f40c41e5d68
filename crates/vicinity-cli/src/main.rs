//! Command-line front-end: load datasets, build one index, answer every
//! query, and write the plain-text report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};

use vicinity::eval::EvalAccumulator;
use vicinity::prelude::*;
use vicinity::{brute, dataset};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DatasetType {
    Mnist,
    Sift,
}

#[derive(Parser, Debug)]
#[command(
    name = "vicinity",
    version,
    about = "Approximate nearest-neighbor search: LSH, Hypercube, IVF-Flat, IVF-PQ"
)]
#[command(group(
    ArgGroup::new("method")
        .required(true)
        .args(["lsh", "hypercube", "ivfflat", "ivfpq"])
))]
struct Args {
    /// Base dataset file
    #[arg(short = 'd', long = "data")]
    data: PathBuf,

    /// Query dataset file
    #[arg(short = 'q', long = "queries")]
    queries: PathBuf,

    /// Output report file
    #[arg(short = 'o', long = "output", default_value = "results.txt")]
    output: PathBuf,

    /// Dataset format
    #[arg(long = "type", value_enum)]
    dataset_type: DatasetType,

    /// Top-N count
    #[arg(short = 'N', long = "nearest", default_value_t = 1)]
    n: usize,

    /// Range radius; defaults to 2000 for mnist and 2 for sift
    #[arg(short = 'R', long = "radius")]
    radius: Option<f32>,

    /// Also run a range search per query
    #[arg(long)]
    range: bool,

    /// Master RNG seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Use the LSH index
    #[arg(long)]
    lsh: bool,

    /// Use the Hypercube index
    #[arg(long)]
    hypercube: bool,

    /// Use the IVF-Flat index
    #[arg(long)]
    ivfflat: bool,

    /// Use the IVF-PQ index
    #[arg(long)]
    ivfpq: bool,

    /// LSH: projection hashes per table
    #[arg(short = 'k', long = "hashes", default_value_t = 4)]
    k: usize,

    /// LSH: number of hash tables
    #[arg(short = 'L', long = "tables", default_value_t = 5)]
    tables: usize,

    /// LSH / Hypercube: projection bucket width
    #[arg(short = 'w', long = "width", default_value_t = 4.0)]
    width: f32,

    /// Hypercube: projection bits (cube dimension)
    #[arg(long, default_value_t = 14)]
    kproj: usize,

    /// Hypercube: max candidates per query; under --ivfpq this is the PQ
    /// sub-vector count instead (defaults 10 and 16 respectively)
    #[arg(short = 'M')]
    m: Option<usize>,

    /// Hypercube: max vertices visited per query
    #[arg(long, default_value_t = 2)]
    probes: usize,

    /// IVF: number of coarse clusters
    #[arg(long, default_value_t = 50)]
    kclusters: usize,

    /// IVF: inverted lists probed per query
    #[arg(long, default_value_t = 5)]
    nprobe: usize,

    /// IVF-PQ: bits per subspace
    #[arg(long, default_value_t = 8)]
    nbits: u32,
}

fn build_index(args: &Args, base: &Matrix) -> Result<Box<dyn AnnIndex>> {
    let index: Box<dyn AnnIndex> = if args.lsh {
        Box::new(LshIndex::build(
            base,
            LshParams {
                k: args.k,
                num_tables: args.tables,
                width: args.width,
                table_size: None,
                seed: args.seed,
            },
        )?)
    } else if args.hypercube {
        Box::new(HypercubeIndex::build(
            base,
            HypercubeParams {
                k: args.kproj,
                width: args.width,
                max_candidates: args.m.unwrap_or(10),
                probes: args.probes,
                seed: args.seed,
            },
        )?)
    } else if args.ivfflat {
        Box::new(IvfFlatIndex::build(
            base,
            IvfFlatParams {
                kclusters: args.kclusters,
                nprobe: args.nprobe,
                seed: args.seed,
                train_subset: None,
            },
        )?)
    } else {
        Box::new(IvfPqIndex::build(
            base,
            IvfPqParams {
                kclusters: args.kclusters,
                nprobe: args.nprobe,
                num_subspaces: args.m.unwrap_or(16),
                nbits: args.nbits,
                seed: args.seed,
                train_subset: None,
            },
        )?)
    };
    Ok(index)
}

fn run() -> Result<()> {
    let args = Args::parse();

    tracing::info!("loading datasets");
    let (base, queries) = match args.dataset_type {
        DatasetType::Mnist => (
            dataset::load_mnist(&args.data, false)
                .with_context(|| format!("loading base dataset {}", args.data.display()))?,
            dataset::load_mnist(&args.queries, false)
                .with_context(|| format!("loading query dataset {}", args.queries.display()))?,
        ),
        DatasetType::Sift => (
            dataset::load_fvecs(&args.data)
                .with_context(|| format!("loading base dataset {}", args.data.display()))?,
            dataset::load_fvecs(&args.queries)
                .with_context(|| format!("loading query dataset {}", args.queries.display()))?,
        ),
    };
    if base.d() != queries.d() {
        bail!(
            "dimension mismatch between base ({}) and query ({}) sets",
            base.d(),
            queries.d()
        );
    }
    tracing::info!(
        base_n = base.n(),
        queries_n = queries.n(),
        d = base.d(),
        "datasets loaded"
    );

    let radius = args.radius.unwrap_or(match args.dataset_type {
        DatasetType::Mnist => 2000.0,
        DatasetType::Sift => 2.0,
    });

    let build_start = Instant::now();
    let index = build_index(&args, &base).context("building index")?;
    tracing::info!(
        method = index.method(),
        elapsed_ms = build_start.elapsed().as_millis() as u64,
        "index built"
    );

    let mut out = BufWriter::new(
        File::create(&args.output)
            .with_context(|| format!("creating output file {}", args.output.display()))?,
    );
    writeln!(out, "{}", index.method())?;

    let mut acc = EvalAccumulator::new();
    for qi in 0..queries.n() {
        let query = queries.row(qi);

        let approx_start = Instant::now();
        let approx = index.search(query, args.n)?;
        let t_approx = approx_start.elapsed();

        let true_start = Instant::now();
        let truth = brute::top_n(&base, query, args.n)?;
        let t_true = true_start.elapsed();

        writeln!(out, "Query: {}", qi)?;
        for (j, nb) in approx.iter().enumerate() {
            writeln!(out, "Nearest neighbor-{}: {}", j + 1, nb.id)?;
            writeln!(out, "distanceApproximate: {}", nb.dist)?;
            writeln!(
                out,
                "distanceTrue: {}",
                truth.get(j).map_or(f32::INFINITY, |t| t.dist)
            )?;
        }

        if args.range {
            writeln!(out, "R-near neighbors:")?;
            for id in index.search_range(query, radius)? {
                writeln!(out, "{}", id)?;
            }
        }

        acc.record(&approx, &truth, args.n, t_approx, t_true);
    }

    let summary = acc.summary();
    writeln!(out, "Average AF: {}", summary.average_af)?;
    writeln!(out, "Recall@N: {}", summary.recall_at_n)?;
    writeln!(out, "QPS: {}", summary.qps)?;
    writeln!(out, "tApproximateAverage: {}", summary.t_approx_ms)?;
    writeln!(out, "tTrueAverage: {}", summary.t_true_ms)?;
    out.flush()?;

    tracing::info!(
        queries = acc.queries(),
        recall = summary.recall_at_n,
        qps = summary.qps,
        "run complete"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("[ERROR] {:#}", err);
        std::process::exit(1);
    }
}
