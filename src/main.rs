//! QA Rater CLI
//!
//! Terminal assistant for human evaluation of AI answers against a
//! manually curated answer key.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qa_rater::{
    choice::{AccuracyLabel, ExclusiveChoice},
    config::Config,
    dataset::{self, join_records, sample_units, EvaluationUnit},
    persistence::{
        load_records, load_session, save_session, session_exists, JsonFileSink, ResultsSink,
    },
    report::ResultsSummary,
    session::{FactTier, SessionEngine, SessionEvent},
    sources::{load_manual_source, load_model_source},
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// QA Rater - human evaluation of AI answers against a curated answer key
#[derive(Parser)]
#[command(name = "qa-rater")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive rating session
    Rate {
        /// Path to the manual answer-key JSON file
        #[arg(long)]
        manual: Option<PathBuf>,

        /// Path to the model key-facts JSON file
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output path for the results file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fraction of the joined questions to sample
        #[arg(long)]
        fraction: Option<f64>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,

        /// Session snapshot to resume from and save to (.json or .bin)
        #[arg(short, long)]
        session: Option<PathBuf>,
    },

    /// Prepare the session sample without rating anything
    Prepare {
        /// Path to the manual answer-key JSON file
        #[arg(long)]
        manual: Option<PathBuf>,

        /// Path to the model key-facts JSON file
        #[arg(long)]
        model: Option<PathBuf>,

        /// Fraction of the joined questions to sample
        #[arg(long)]
        fraction: Option<f64>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the sampled units to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show source, join, and sample counts
    Info {
        /// Path to the manual answer-key JSON file
        #[arg(long)]
        manual: Option<PathBuf>,

        /// Path to the model key-facts JSON file
        #[arg(long)]
        model: Option<PathBuf>,

        /// Fraction of the joined questions to sample
        #[arg(long)]
        fraction: Option<f64>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize a results file
    Report {
        /// Path to the results file (defaults to the configured one)
        #[arg(short, long)]
        results: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rate {
            manual,
            model,
            output,
            fraction,
            seed,
            session,
        } => {
            let config = load_config(manual, model, output, fraction, seed)?;
            cmd_rate(config, session)
        }
        Commands::Prepare {
            manual,
            model,
            fraction,
            seed,
            output,
        } => {
            let config = load_config(manual, model, None, fraction, seed)?;
            cmd_prepare(config, output)
        }
        Commands::Info {
            manual,
            model,
            fraction,
            seed,
        } => {
            let config = load_config(manual, model, None, fraction, seed)?;
            cmd_info(config)
        }
        Commands::Report { results } => cmd_report(results),
    }
}

/// Layer CLI flags over the loaded configuration, then validate.
fn load_config(
    manual: Option<PathBuf>,
    model: Option<PathBuf>,
    output: Option<PathBuf>,
    fraction: Option<f64>,
    seed: Option<u64>,
) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(path) = manual {
        config.sources.manual_file = path;
    }
    if let Some(path) = model {
        config.sources.model_file = path;
    }
    if let Some(path) = output {
        config.output.results_file = path;
    }
    if let Some(fraction) = fraction {
        config.sample.fraction = fraction;
    }
    if let Some(seed) = seed {
        config.sample.seed = seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn cmd_rate(config: Config, session_path: Option<PathBuf>) -> Result<()> {
    let sink = JsonFileSink::new(&config.output.results_file);
    println!("Results file: {}", sink.path().display());

    let mut engine = match &session_path {
        Some(path) if session_exists(path) => {
            println!("Resuming session from: {}", path.display());
            let snapshot = load_session(path).context("Failed to load session snapshot")?;
            SessionEngine::from_snapshot(snapshot, sink)
                .context("Session snapshot is unusable")?
        }
        _ => {
            println!("Preparing evaluation units...");
            let units = dataset::prepare(&config).context("Failed to prepare the dataset")?;
            println!("  Sampled {} questions", units.len());
            SessionEngine::new(units, sink)?
        }
    };

    print_instructions();
    render(&engine);

    let mut finished = false;
    let mut quit = false;

    print!("> ");
    io::stdout().flush()?;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read input")?;
        let trimmed = line.trim();

        let event = if trimmed.is_empty() {
            None
        } else {
            match parse_command(trimmed) {
                Err(message) => {
                    eprintln!("{}", message);
                    None
                }
                Ok(DriverCommand::Help) => {
                    print_instructions();
                    None
                }
                Ok(DriverCommand::Answers) => {
                    print_answers(engine.current_unit());
                    None
                }
                Ok(DriverCommand::Quit) => {
                    quit = true;
                    None
                }
                Ok(DriverCommand::Event(event)) => Some(event),
                Ok(DriverCommand::Accuracy { tier, index, label }) => {
                    Some(accuracy_event(&engine, tier, index, label))
                }
            }
        };

        if let Some(event) = event {
            match engine.handle_event(event) {
                Ok(outcome) => {
                    if let Some(warning) = &outcome.warning {
                        eprintln!("Warning: {}", warning);
                    }
                    if outcome.finished {
                        println!();
                        println!(
                            "Session complete. Results saved to: {}",
                            config.output.results_file.display()
                        );
                        ResultsSummary::from_records(engine.results().records()).print_summary();
                        if let Some(path) = &session_path {
                            // A finished session's snapshot is stale.
                            if session_exists(path) {
                                fs::remove_file(path).ok();
                            }
                        }
                        finished = true;
                    } else {
                        if let Some(path) = &session_path {
                            if let Err(e) = save_session(&engine.snapshot(), path) {
                                eprintln!("Warning: session snapshot not saved: {}", e);
                            }
                        }
                        if outcome.redraw {
                            render(&engine);
                        }
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }

        if finished || quit {
            break;
        }
        print!("> ");
        io::stdout().flush()?;
    }

    if !finished {
        match &session_path {
            Some(path) => {
                save_session(&engine.snapshot(), path)
                    .context("Failed to save session snapshot")?;
                println!("Session saved to: {}", path.display());
            }
            None => {
                println!("Results so far are on disk; per-fact selections are not.");
                println!("Run with --session <file> to make sessions resumable.");
            }
        }
    }

    Ok(())
}

fn cmd_prepare(config: Config, output: Option<PathBuf>) -> Result<()> {
    println!("Preparing evaluation units...");

    let manual =
        load_manual_source(&config.sources.manual_file).context("Failed to load manual source")?;
    let model =
        load_model_source(&config.sources.model_file).context("Failed to load model source")?;
    println!("  Manual records: {}", manual.len());
    println!("  Model records:  {}", model.len());

    let joined = join_records(
        manual,
        model,
        &config.sources.manual_file,
        &config.sources.model_file,
    )?;
    println!("  Joined:         {}", joined.len());

    let units = sample_units(joined, config.sample.fraction, config.sample.seed)?;
    println!(
        "  Sampled:        {} (fraction {}, seed {})",
        units.len(),
        config.sample.fraction,
        config.sample.seed
    );

    if let Some(path) = output {
        let json =
            serde_json::to_string_pretty(&units).context("Failed to serialize sampled units")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write units to '{}'", path.display()))?;
        println!("\nSampled units written to: {}", path.display());
    }

    Ok(())
}

fn cmd_info(config: Config) -> Result<()> {
    let manual =
        load_manual_source(&config.sources.manual_file).context("Failed to load manual source")?;
    let model =
        load_model_source(&config.sources.model_file).context("Failed to load model source")?;
    let manual_count = manual.len();
    let model_count = model.len();

    let joined = join_records(
        manual,
        model,
        &config.sources.manual_file,
        &config.sources.model_file,
    )?;
    let sample_size = (config.sample.fraction * joined.len() as f64).round() as usize;

    println!("Evaluation Dataset Information");
    println!("{}", "─".repeat(40));
    println!("  Manual source:  {}", config.sources.manual_file.display());
    println!("  Model source:   {}", config.sources.model_file.display());
    println!("  Manual records: {}", manual_count);
    println!("  Model records:  {}", model_count);
    println!("  Joined:         {}", joined.len());
    println!(
        "  Sample size:    {} (fraction {}, seed {})",
        sample_size, config.sample.fraction, config.sample.seed
    );
    println!("  Results file:   {}", config.output.results_file.display());

    Ok(())
}

fn cmd_report(results: Option<PathBuf>) -> Result<()> {
    let path = match results {
        Some(path) => path,
        None => {
            let config = Config::load().context("Failed to load configuration")?;
            config.output.results_file
        }
    };

    let records = load_records(&path).context("Failed to load results")?;
    println!("Results file: {}", path.display());
    ResultsSummary::from_records(&records).print_summary();

    Ok(())
}

/// A parsed line of rater input.
enum DriverCommand {
    Event(SessionEvent),
    /// An accuracy label click; turned into a signal snapshot against the
    /// engine's current state.
    Accuracy {
        tier: FactTier,
        index: usize,
        label: AccuracyLabel,
    },
    Answers,
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<DriverCommand, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();

    match verb.as_str() {
        "c" | "cover" => {
            let (tier, index) = parse_fact_ref(require_arg(&verb, arg)?)?;
            Ok(DriverCommand::Event(SessionEvent::CoverageToggled {
                tier,
                index,
            }))
        }
        "acc" | "inacc" | "nm" => {
            let (tier, index) = parse_fact_ref(require_arg(&verb, arg)?)?;
            let label = match verb.as_str() {
                "acc" => AccuracyLabel::Accurate,
                "inacc" => AccuracyLabel::Inaccurate,
                _ => AccuracyLabel::NotMentioned,
            };
            Ok(DriverCommand::Accuracy { tier, index, label })
        }
        "r" | "rel" => {
            let (tier, index) = parse_fact_ref(require_arg(&verb, arg)?)?;
            Ok(DriverCommand::Event(SessionEvent::RelevanceToggled {
                tier,
                index,
            }))
        }
        "act" => Ok(DriverCommand::Event(SessionEvent::ActionabilityToggled)),
        "next" | "n" => Ok(DriverCommand::Event(SessionEvent::Next)),
        "prev" | "p" => Ok(DriverCommand::Event(SessionEvent::Previous)),
        "finish" => Ok(DriverCommand::Event(SessionEvent::Finish)),
        "ans" | "answers" => Ok(DriverCommand::Answers),
        "help" | "h" | "?" => Ok(DriverCommand::Help),
        "quit" | "q" => Ok(DriverCommand::Quit),
        _ => Err(format!(
            "Unknown command '{}'. Type 'help' for the command list.",
            verb
        )),
    }
}

fn require_arg<'a>(verb: &str, arg: Option<&'a str>) -> std::result::Result<&'a str, String> {
    arg.ok_or_else(|| format!("'{}' needs a fact reference like 'e1' or 'o2'", verb))
}

/// Parse a fact reference such as `e1` (first essential) or `o3` (third
/// optional). Display numbering is 1-based.
fn parse_fact_ref(token: &str) -> std::result::Result<(FactTier, usize), String> {
    let bad = || format!("Expected a fact reference like 'e1' or 'o2', got '{}'", token);

    let tier = match token.chars().next() {
        Some('e') => FactTier::Essential,
        Some('o') => FactTier::Optional,
        _ => return Err(bad()),
    };
    let index: usize = token[1..].parse().map_err(|_| bad())?;
    if index == 0 {
        return Err("Fact numbering starts at 1".to_string());
    }

    Ok((tier, index - 1))
}

/// Build the signal snapshot a checkbox click would produce: the clicked
/// label's box flips, every other box keeps showing `label == current`.
fn click_signals(current: AccuracyLabel, clicked: AccuracyLabel) -> [bool; 3] {
    let mut signals = [false; 3];
    for (i, &label) in AccuracyLabel::LABELS.iter().enumerate() {
        let displayed = label == current;
        signals[i] = if label == clicked { !displayed } else { displayed };
    }
    signals
}

fn accuracy_event<S: ResultsSink>(
    engine: &SessionEngine<S>,
    tier: FactTier,
    index: usize,
    label: AccuracyLabel,
) -> SessionEvent {
    let selections = engine.current_selections();
    let labels = match tier {
        FactTier::Essential => &selections.accuracy_essential,
        FactTier::Optional => &selections.accuracy_optional,
    };
    // Out of range falls through to the engine's own bounds check.
    let current = labels.get(index).copied().unwrap_or_default();

    SessionEvent::AccuracySignals {
        tier,
        index,
        signals: click_signals(current, label),
    }
}

fn render<S: ResultsSink>(engine: &SessionEngine<S>) {
    let unit = engine.current_unit();
    let selections = engine.current_selections();

    println!();
    println!("{}", "─".repeat(60));
    println!(
        "Question {}/{}  [id {}]",
        engine.current_index() + 1,
        engine.unit_count(),
        unit.id
    );
    println!("  {}", unit.question);
    println!();

    println!("Ground-truth facts (mark what the AI answer covers):");
    print_coverage_list(
        "Essential",
        'e',
        &unit.ground_truth_facts.essential,
        &selections.covered_essential,
    );
    print_coverage_list(
        "Optional",
        'o',
        &unit.ground_truth_facts.optional,
        &selections.covered_optional,
    );
    if !unit.ground_truth_facts.safety_critical.is_empty() {
        println!("  Safety-critical (scored automatically):");
        for fact in &unit.ground_truth_facts.safety_critical {
            println!("      - {}", fact);
        }
    }

    println!();
    println!("AI answer facts (accuracy and relevance):");
    print_model_list(
        "Essential",
        'e',
        &unit.model_facts.essential,
        &selections.accuracy_essential,
        &selections.relevant_essential,
    );
    print_model_list(
        "Optional",
        'o',
        &unit.model_facts.optional,
        &selections.accuracy_optional,
        &selections.relevant_optional,
    );

    println!();
    println!(
        "Actionable as-is: {}   Rated so far: {}/{}",
        if selections.actionable { "yes" } else { "no" },
        engine.results().len(),
        engine.unit_count()
    );
}

fn print_coverage_list(title: &str, prefix: char, facts: &[String], covered: &[bool]) {
    if facts.is_empty() {
        return;
    }
    println!("  {}:", title);
    for (i, fact) in facts.iter().enumerate() {
        let mark = if covered[i] { 'x' } else { ' ' };
        println!("    [{}] {}{}. {}", mark, prefix, i + 1, fact);
    }
}

fn print_model_list(
    title: &str,
    prefix: char,
    facts: &[String],
    labels: &[AccuracyLabel],
    relevant: &[bool],
) {
    if facts.is_empty() {
        return;
    }
    println!("  {}:", title);
    for (i, fact) in facts.iter().enumerate() {
        let accuracy = match labels[i] {
            AccuracyLabel::Accurate => "A",
            AccuracyLabel::Inaccurate => "I",
            AccuracyLabel::NotMentioned => "N",
        };
        let relevance = if relevant[i] { "relevant  " } else { "IRRELEVANT" };
        println!(
            "    ({}) [{}] {}{}. {}",
            accuracy,
            relevance,
            prefix,
            i + 1,
            fact
        );
    }
}

fn print_answers(unit: &EvaluationUnit) {
    println!();
    println!("Manual answer:");
    for line in unit.manual_answer.lines() {
        println!("  {}", line);
    }
    println!();
    println!("AI answer:");
    for line in unit.model_answer.lines() {
        println!("  {}", line);
    }
}

fn print_instructions() {
    println!("{}", "─".repeat(60));
    println!("Rating instructions");
    println!("{}", "─".repeat(60));
    println!("For each question, judge the AI answer against the manual");
    println!("answer key:");
    println!("  1. Mark each ground-truth fact the AI answer covers.");
    println!("  2. Label each AI fact Accurate / Inaccurate / Not Mentioned");
    println!("     compared with the manual answer. Exactly one label holds");
    println!("     at a time; clearing the active label means Not Mentioned.");
    println!("  3. Unmark relevance for AI facts that do not belong to the");
    println!("     question. Facts start relevant.");
    println!("  4. Mark the answer actionable if a reader could act on it");
    println!("     as written.");
    println!("Safety-critical coverage is scored automatically from the AI");
    println!("answer text.");
    println!();
    println!("Commands:");
    println!("  c <e1|o2>      toggle coverage of a ground-truth fact");
    println!("  acc <e1|o2>    label an AI fact Accurate");
    println!("  inacc <e1|o2>  label an AI fact Inaccurate");
    println!("  nm <e1|o2>     label an AI fact Not Mentioned");
    println!("  r <e1|o2>      toggle relevance of an AI fact");
    println!("  act            toggle \"actionable as-is\"");
    println!("  ans            show the full manual and AI answers");
    println!("  next / prev    save and move between questions");
    println!("  finish         save everything and end the session");
    println!("  help           show this text again");
    println!("  quit           leave (kept resumable with --session)");
    println!("{}", "─".repeat(60));
}
