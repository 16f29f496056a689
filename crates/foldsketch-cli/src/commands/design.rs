use crate::cli::DesignArgs;
use crate::config;
use crate::error::Result;
use crate::ui::DesignUi;
use foldsketch::core::io::input::{read_inp_file, read_input, DesignInput};
use foldsketch::core::io::report::CsvReporter;
use foldsketch::engine::error::EngineError;
use foldsketch::engine::progress::ProgressReporter;
use foldsketch::workflows::design;
use std::io::Read;
use tracing::info;

// Tri-stable switch used when no input is given, a classic multi-stable
// design benchmark.
const DEMO_INPUT: &str = "\
((((....))))....((((....))))........
........((((....((((....))))....))))
((((((((....))))((((....))))....))))
NNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNN
";

fn load_input(args: &DesignArgs) -> Result<DesignInput> {
    if args.stdin {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(read_input(&text)?)
    } else if let Some(path) = &args.file {
        println!("# Input File: {}", path.display());
        Ok(read_inp_file(path)?)
    } else {
        Ok(read_input(DEMO_INPUT)?)
    }
}

pub fn run(args: DesignArgs) -> Result<()> {
    let config = config::resolve(&args)?;
    let input = load_input(&args)?;

    println!(
        "# Options: number={}, jump={}, exit={}, ledger-capacity={}, mode={}",
        config.number,
        config.optimize.jump,
        config.optimize.exit_after,
        config.optimize.ledger_capacity,
        config.optimize.mode,
    );
    for structure in &input.structures {
        println!("# {}", structure);
    }
    println!("# {}", input.constraint_or_default());

    let ui = DesignUi::new();
    let reporter = if args.progress {
        ProgressReporter::with_callback(ui.callback())
    } else {
        ProgressReporter::new()
    };

    let report = design::run(&input, &config, &reporter)?;

    println!(
        "# Maximal number of solutions: {}",
        report.diagnostics.solution_count
    );
    println!(
        "# Number of connected components: {}",
        report.diagnostics.components.len()
    );
    for (i, component) in report.diagnostics.components.iter().enumerate() {
        println!("# [{}] {:?}", i, component);
    }

    if let Some(path) = &args.graphml {
        std::fs::write(path, &report.diagnostics.graphml)?;
        info!(path = %path.display(), "dependency graph written");
    }

    if args.csv {
        let stdout = std::io::stdout();
        let mut csv = CsvReporter::new(stdout.lock());
        for record in &report.records {
            csv.write_record(record)?;
        }
    } else {
        let mut designs = report.designs;
        for (design, record) in designs.iter_mut().zip(&report.records) {
            let block = design
                .write_out(record.score)
                .map_err(EngineError::from)?;
            println!("{}", block);
        }
    }

    Ok(())
}
