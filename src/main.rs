mod affinity;
mod args;

use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    info!("args: {:?}", args);

    let res = if args.collect_names {
        affinity::collect_names(&args.config, &args.data, &args.out)
    } else {
        affinity::run_analysis(
            &args.config,
            &args.data,
            &args.categorization,
            &args.reference,
            &args.out,
        )
    };

    if let Err(e) = res {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
}
