use arbitrary::{unstructured::Unstructured, Arbitrary};
use log::{info, LevelFilter};
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use structopt::StructOpt;

use std::time;

use rbix::RbTree;

/// Command line options.
#[derive(Clone, StructOpt)]
pub struct Opt {
    #[structopt(long = "seed")]
    seed: Option<u64>,

    #[structopt(long = "loads", default_value = "1000000")] // default 1M
    loads: usize,

    #[structopt(long = "ops", default_value = "1000000")] // default 1M
    ops: usize,

    #[structopt(long = "export", default_value = "1000")]
    export: usize,

    #[structopt(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Insert(u64),
    Find(u64),
    Erase(u64),
    Min,
    Max,
}

fn main() {
    let opts = Opt::from_args();
    TermLogger::init(
        opts.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .ok();

    let seed = opts.seed.unwrap_or_else(random);
    info!("seed {}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: RbTree<u64> = match RbTree::with_capacity(opts.loads) {
        Ok(index) => index,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    // initial load
    let start = time::Instant::now();
    for _i in 0..opts.loads {
        index.insert(rng.gen::<u64>() % (opts.loads as u64 * 2)).ok();
    }
    info!("loaded {} items in {:?}", opts.loads, start.elapsed());

    let mut counts = [0_usize; 5];
    let start = time::Instant::now();
    for _i in 0..opts.ops {
        let bytes = rng.gen::<[u8; 16]>();
        let mut uns = Unstructured::new(&bytes);
        let op: Op = match uns.arbitrary() {
            Ok(op) => op,
            Err(_) => continue,
        };

        let modulo = opts.loads as u64 * 2 + 1;
        match op {
            Op::Insert(key) => {
                counts[0] += 1;
                index.insert(key % modulo).ok();
            }
            Op::Find(key) => {
                counts[1] += 1;
                index.find(&(key % modulo));
            }
            Op::Erase(key) => {
                counts[2] += 1;
                if let Some(node) = index.find(&(key % modulo)) {
                    index.erase(node).ok();
                }
            }
            Op::Min => {
                counts[3] += 1;
                index.min();
            }
            Op::Max => {
                counts[4] += 1;
                index.max();
            }
        }
    }
    info!(
        "incremental for operations {}, took {:?} counts {:?}",
        opts.ops,
        start.elapsed(),
        counts
    );

    let start = time::Instant::now();
    let keys = index.to_vec(opts.export);
    info!("export {} keys, took {:?}", keys.len(), start.elapsed());

    let start = time::Instant::now();
    match index.validate() {
        Ok(stats) => info!("validate {:?}, took {:?}", stats, start.elapsed()),
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }

    let start = time::Instant::now();
    let n = index.len();
    index.clear();
    info!("clear {} items, took {:?}", n, start.elapsed());
}
