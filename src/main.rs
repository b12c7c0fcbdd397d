use std::path::PathBuf;

use clap::Parser;
use strip_planner::render;
use strip_planner::types::{Order, PlanResponse};
use strip_planner::{CutOptions, calculate_cuts};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "strip_planner",
    about = "1D stock-sheet cutting planner with remnant reuse"
)]
struct Cli {
    /// Ordered pieces as LxB:qty (e.g. 3000x300:5 2500x1200:1)
    #[arg(long = "orders", num_args = 1.., required = true)]
    orders: Vec<String>,

    /// Settings document (JSON) to start from; flags below override it
    #[arg(long)]
    options: Option<PathBuf>,

    /// Sheet width in mm
    #[arg(long)]
    sheet_width: Option<u32>,

    /// Length tolerance in mm for reusing a longer remnant
    #[arg(long)]
    tolerance: Option<u32>,

    /// Allow remnants longer than the tolerance (overhang becomes scrap)
    #[arg(long)]
    allow_fallback: bool,

    /// Narrowest offcut kept as a remnant, in mm
    #[arg(long)]
    min_leftover: Option<u32>,

    /// Tails at or below this width are sourced from scrap
    #[arg(long)]
    tail_wanted: Option<u32>,

    /// Visit widths by smallest sheet remainder instead of widest first
    #[arg(long)]
    order_by_remainder: bool,

    /// Pack whole-sheet patterns before per-width allocation
    #[arg(long)]
    patterns: bool,

    /// Enable anti-waste policies
    #[arg(long)]
    anti: bool,

    /// Never cut pieces with length at or below this (needs --anti)
    #[arg(long)]
    min_l_no_cut: Option<u32>,

    /// Cap foreign donors when closing widths above this (needs --anti)
    #[arg(long)]
    limit_merge_b: Option<u32>,

    /// Foreign donors allowed above --limit-merge-b (default 0)
    #[arg(long)]
    max_merge_k: Option<u32>,

    /// Missing width in mm tolerated instead of cutting the last sheet (needs --anti)
    #[arg(long)]
    last_no_cut_b: Option<u32>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,

    /// Show ASCII layout of each cut
    #[arg(long)]
    layout: bool,

    /// Log allocation decisions to stderr
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn cut_options(&self) -> Result<CutOptions, String> {
        let mut opts = match &self.options {
            Some(path) => CutOptions::from_json_file(path).map_err(|e| e.to_string())?,
            None => CutOptions::default(),
        };
        if let Some(w) = self.sheet_width {
            opts.sheet_width = w;
        }
        if let Some(t) = self.tolerance {
            opts.tolerance_l = t;
        }
        if let Some(m) = self.min_leftover {
            opts.min_leftover = m;
        }
        if let Some(t) = self.tail_wanted {
            opts.tail_wanted_b = t;
        }
        opts.allow_fallback |= self.allow_fallback;
        opts.order_by_remainder |= self.order_by_remainder;
        opts.use_patterns |= self.patterns;

        let anti = &mut opts.anti;
        anti.enabled |= self.anti;
        anti.min_l_no_cut = self.min_l_no_cut.or(anti.min_l_no_cut);
        anti.limit_merge_b = self.limit_merge_b.or(anti.limit_merge_b);
        anti.max_merge_k = self.max_merge_k.or(anti.max_merge_k);
        anti.last_no_cut_b = self.last_no_cut_b.or(anti.last_no_cut_b);

        if opts.sheet_width == 0 {
            return Err("sheet width must be non-zero".to_string());
        }
        Ok(opts)
    }
}

fn parse_order(s: &str) -> Result<Order, String> {
    let (dims, qty) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid order '{}', expected LxB:qty", s))?;
    let (length, width) = dims
        .split_once('x')
        .ok_or_else(|| format!("invalid dimensions '{}', expected LxB", dims))?;
    let length = length
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let width = width
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let count = qty
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    Ok(Order::new(length, width, count))
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let opts = cli.cut_options().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let orders: Vec<Order> = cli
        .orders
        .iter()
        .map(|o| parse_order(o))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let result = calculate_cuts(&orders, &opts);

    if cli.json {
        let response = PlanResponse::from_result(result, opts.tail_wanted_b);
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    match result {
        Ok(plan) => print!("{}", render::render_report(&plan, cli.layout)),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
