use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use gridplan::{search_with_costs, util, Connectivity, Plan, PlannerConfig, Point};
use log::{info, warn};

/// Plan a shortest path across an occupancy grid
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grid file: a JSON array of 0/1 rows, or an image where dark pixels are obstacles
    #[arg(short, long)]
    grid: PathBuf,

    /// Start cell as row,col (defaults to the top-left cell)
    #[arg(short, long)]
    start: Option<Point>,

    /// Goal cell as row,col (defaults to the bottom-right cell)
    #[arg(short = 'e', long)]
    goal: Option<Point>,

    /// 4 or 8, overrides the configuration file
    #[arg(short, long)]
    connectivity: Option<Connectivity>,

    /// JSON planner configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep every cell of the found path
    #[arg(long)]
    no_simplify: bool,

    /// Allow diagonal steps between two blocked cells that touch at a corner
    #[arg(long)]
    allow_corner_cutting: bool,

    /// Write the waypoints as row,col lines
    #[arg(long)]
    path_out: Option<PathBuf>,

    /// Render the grid and the path to an image
    #[arg(long)]
    image_out: Option<PathBuf>,

    /// Pixels per cell in the rendered image
    #[arg(long, default_value_t = 20)]
    cell_px: u32,

    /// Print the grid before planning
    #[arg(long)]
    print_grid: bool,

    /// Print the cost-so-far of every reached cell after the search
    #[arg(long)]
    print_costs: bool,
}

fn main() -> Result<ExitCode, anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    if let Some(connectivity) = args.connectivity {
        config.search.connectivity = connectivity;
    }
    if args.allow_corner_cutting {
        config.search.allow_corner_cutting = true;
    }
    if args.no_simplify {
        config.simplify = false;
    }

    let map = util::load_grid(&args.grid)?;
    if args.print_grid {
        println!("{}", map);
    }

    let start = args.start.unwrap_or(Point::new(0, 0));
    let goal = args
        .goal
        .unwrap_or(Point::new(map.rows() - 1, map.columns() - 1));

    info!(
        "planning on {}x{} grid from {} to {} ({})",
        map.rows(),
        map.columns(),
        start,
        goal,
        config.search.connectivity
    );

    let (raw, costs) = search_with_costs(&map, start, goal, &config.search)
        .context("invalid planning request")?;

    if args.print_costs {
        println!("{}", costs);
    }

    let Some(raw) = raw else {
        warn!(
            "no path found from {} to {}, adjust obstacles or endpoints",
            start, goal
        );
        return Ok(ExitCode::from(2));
    };
    let planned = Plan::from_search(&map, raw, config.simplify);

    info!(
        "path found: cost={:.3} cells={} waypoints={} expanded={}",
        planned.raw.total_cost,
        planned.raw.path.len(),
        planned.waypoints.len(),
        planned.raw.expanded
    );

    print!("{}", util::format_path(&planned.waypoints));

    if let Some(path_out) = &args.path_out {
        util::write_path_txt(&planned.waypoints, path_out)?;
        info!("saved path to {}", path_out.display());
    }

    if let Some(image_out) = &args.image_out {
        util::render_path(&map, &planned.raw.path, &planned.waypoints, args.cell_px)?
            .save(image_out)
            .with_context(|| format!("saving {}", image_out.display()))?;
        info!("saved image to {}", image_out.display());
    }

    Ok(ExitCode::SUCCESS)
}
