use anyhow::Result;
use clap::Parser;
use tracing::error;

use covidmap::charts::{print_copy_summary, HttpPageSource};
use covidmap::pipeline::print_summary;
use covidmap::utils::{setup_logging, validate_args};
use covidmap::{copy_charts, init_default_table, run, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if args.init {
        return init_default_table();
    }

    validate_args(&args)?;

    if args.copy_charts {
        let source = HttpPageSource::new(&args.wiki_url)?;
        return match copy_charts(&args.sources, &args.charts_dir, &source) {
            Ok(summary) => {
                print_copy_summary(&summary);
                Ok(())
            }
            Err(e) => {
                error!("Error: {:#}", e);
                std::process::exit(1);
            }
        };
    }

    match run(&args) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
