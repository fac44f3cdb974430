use time::macros::format_description;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_target(false)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.copy_charts {
        if !args.charts_dir.is_dir() {
            anyhow::bail!("--charts-dir {:?} is not a directory", args.charts_dir);
        }
        return Ok(());
    }

    if args.report.is_none() && !args.data_url.contains("{date}") {
        anyhow::bail!("--data-url must contain a {{date}} placeholder");
    }

    if let Some(base_map) = &args.base_map {
        if *base_map == args.output {
            anyhow::bail!("--output must differ from --base-map");
        }
    }

    if !args.dry_run
        && (std::env::var_os(crate::pipeline::USERNAME_VAR).is_none()
            || std::env::var_os(crate::pipeline::PASSWORD_VAR).is_none())
    {
        anyhow::bail!(
            "{} and {} must be set to upload, or pass --dry-run",
            crate::pipeline::USERNAME_VAR,
            crate::pipeline::PASSWORD_VAR
        );
    }

    Ok(())
}
