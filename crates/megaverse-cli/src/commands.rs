//! Subcommand dispatch

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use megaverse_core::{
    BatchReport, CanvasConfig, Color, Direction, Entity, HttpCanvasClient, Position, Reconciler,
};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(config: &CanvasConfig, matches: &ArgMatches) -> Result<()> {
    let client = HttpCanvasClient::new(config)?;
    let reconciler = Reconciler::bootstrap(Arc::new(client), config.parallel_degree)
        .await
        .context("could not load goal map")?;

    match matches.subcommand() {
        Some(("create", args)) => create(&reconciler, args).await,
        Some(("delete", args)) => {
            let position = position(args)?;
            reconciler.delete(position).await?;
            info!(%position, "deleted");
            Ok(())
        }
        Some(("deleteall", _)) => {
            let report = reconciler.clear().await;
            log_report(&report);
            if let Some(reason) = report.aborted {
                bail!("canvas not cleared: {reason}");
            }
            Ok(())
        }
        Some(("replicate", _)) => {
            let report = reconciler.replicate().await?;
            log_report(&report);
            Ok(())
        }
        Some(("xshape", args)) => {
            let margin = args.get_one::<usize>("margin").copied().unwrap_or_default();
            let report = reconciler.draw_x(margin).await?;
            log_report(&report);
            Ok(())
        }
        Some(("goal", args)) => {
            let summary = reconciler.goal().summary();
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Goal map: {} rows x {} cols", summary.rows, summary.cols);
                println!("  Polyanets: {}", summary.polyanets);
                println!("  Comeths:   {}", summary.comeths);
                println!("  Soloons:   {}", summary.soloons);
                println!("  Total:     {}", summary.total());
            }
            Ok(())
        }
        Some((other, _)) => bail!("unknown command '{other}'"),
        None => bail!("no command given"),
    }
}

async fn create(reconciler: &Reconciler, matches: &ArgMatches) -> Result<()> {
    let entity = match matches.subcommand() {
        Some(("polyanet", args)) => {
            let position = position(args)?;
            Entity::polyanet(position.row, position.column)
        }
        Some(("cometh", args)) => {
            let position = position(args)?;
            let direction = *args
                .get_one::<Direction>("direction")
                .context("missing direction")?;
            Entity::cometh(position.row, position.column, direction)
        }
        Some(("soloon", args)) => {
            let position = position(args)?;
            let color = *args.get_one::<Color>("color").context("missing color")?;
            Entity::soloon(position.row, position.column, color)
        }
        _ => bail!("expected polyanet, cometh or soloon"),
    };

    reconciler.create(&entity).await?;
    info!(%entity, "created");
    Ok(())
}

fn position(args: &ArgMatches) -> Result<Position> {
    let row = *args.get_one::<usize>("row").context("missing row")?;
    let column = *args.get_one::<usize>("column").context("missing column")?;
    Ok(Position::new(row, column))
}

fn log_report(report: &BatchReport) {
    if report.is_complete() {
        info!(
            operation = %report.operation,
            succeeded = report.succeeded,
            "done"
        );
    } else {
        warn!(
            operation = %report.operation,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "finished with failures"
        );
    }
}
