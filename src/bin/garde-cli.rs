#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use garde::{
    audit_assignments, evaluate_ratio, io,
    model::{ScheduleRequest, ShiftClass},
    scheduler::{GenerationOutcome, RunControl, RunStatus, ScheduleGenerator},
    storage::{JsonFile, Storage},
    RatioPolicy, RoundingRule, ScheduleGenerationConfig,
};
use std::time::Duration;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification infirmière (fichiers JSON/CSV, sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Générer un planning pour une requête
    Generate {
        /// Requête JSON (horizon, postes, soignants, demande)
        #[arg(long)]
        request: String,
        /// Configuration JSON (contraintes, repos légal, équité)
        #[arg(long)]
        config: Option<String>,
        /// Table de ratios JSON (table usuelle si absente)
        #[arg(long)]
        ratios: Option<String>,
        /// Résultat JSON
        #[arg(long)]
        out: String,
        #[arg(long)]
        assignments_csv: Option<String>,
        #[arg(long)]
        report_csv: Option<String>,
        /// Budget en millisecondes (prioritaire sur la configuration)
        #[arg(long)]
        budget_ms: Option<u64>,
    },

    /// Évaluer un niveau d'effectif contre la table de ratios
    Ratio {
        #[arg(long)]
        unit_type: String,
        /// day | evening | night
        #[arg(long)]
        class: String,
        #[arg(long)]
        staff: u32,
        #[arg(long)]
        census: u32,
        #[arg(long)]
        ratios: Option<String>,
        /// ceiling | nearest
        #[arg(long)]
        rounding: Option<String>,
    },

    /// Importer des soignants CSV dans une requête JSON
    ImportStaff {
        #[arg(long)]
        csv: String,
        #[arg(long)]
        request: String,
    },

    /// Vérifier les conflits d'un résultat
    Check {
        #[arg(long)]
        request: String,
        #[arg(long)]
        outcome: String,
        #[arg(long)]
        config: Option<String>,
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Result<ScheduleGenerationConfig> {
    match path {
        Some(path) => ScheduleGenerationConfig::load_from_file(path),
        None => Ok(ScheduleGenerationConfig::default()),
    }
}

fn load_policy(path: Option<&str>) -> Result<RatioPolicy> {
    match path {
        Some(path) => JsonFile::open(path).load(),
        None => Ok(RatioPolicy::standard()),
    }
}

fn parse_rounding(raw: &str) -> Result<RoundingRule> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "ceiling" | "ceil" => Ok(RoundingRule::Ceiling),
        "nearest" | "round" => Ok(RoundingRule::Nearest),
        other => bail!("unknown rounding rule: {other}"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let code = match cli.cmd {
        Commands::Generate {
            request,
            config,
            ratios,
            out,
            assignments_csv,
            report_csv,
            budget_ms,
        } => {
            let request: ScheduleRequest = JsonFile::open(&request).load()?;
            let config = load_config(config.as_deref())?;
            let policy = load_policy(ratios.as_deref())?;
            let generator = ScheduleGenerator::new(config, policy)?;

            let mut control = RunControl::new();
            if let Some(ms) = budget_ms {
                control = control.with_budget(Duration::from_millis(ms));
            }
            let outcome = generator.generate(&request, &control);
            JsonFile::open(&out).save(&outcome)?;
            if let Some(path) = assignments_csv {
                io::export_assignments_csv(path, &outcome.assignments)?;
            }
            if let Some(path) = report_csv {
                io::export_report_csv(path, &outcome.report)?;
            }
            report_outcome(&outcome)?
        }
        Commands::Ratio {
            unit_type,
            class,
            staff,
            census,
            ratios,
            rounding,
        } => {
            let class = ShiftClass::parse(&class)
                .with_context(|| format!("unknown shift class: {class}"))?;
            let mut policy = load_policy(ratios.as_deref())?;
            if let Some(raw) = rounding {
                policy = policy.with_rounding(parse_rounding(&raw)?);
            }
            let result = evaluate_ratio(&policy, &unit_type, class, staff, census)?;
            println!(
                "required={} actual={} deficit={} surplus={} satisfied={}",
                result.required, result.actual, result.deficit, result.surplus, result.satisfied
            );
            if result.satisfied {
                0
            } else {
                2
            }
        }
        Commands::ImportStaff { csv, request } => {
            let file = JsonFile::open(&request);
            let mut req: ScheduleRequest = file.load()?;
            let imported = io::import_staff_csv(csv)?;
            let count = imported.len();
            for staff in imported {
                match req.staff.iter_mut().find(|s| s.id == staff.id) {
                    Some(existing) => *existing = staff,
                    None => req.staff.push(staff),
                }
            }
            file.save(&req)?;
            println!("Imported {count} staff member(s)");
            0
        }
        Commands::Check {
            request,
            outcome,
            config,
            report,
        } => {
            let request: ScheduleRequest = JsonFile::open(&request).load()?;
            let outcome: GenerationOutcome = JsonFile::open(&outcome).load()?;
            let config = load_config(config.as_deref())?;
            let conflicts = audit_assignments(&request, &outcome.assignments, &config);
            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                for c in &conflicts {
                    eprintln!(
                        "{} | {} {} | {}",
                        c.staff_id,
                        c.slot_a.date,
                        c.slot_a.shift,
                        c.kind.label()
                    );
                }
                if let Some(path) = report {
                    io::export_conflicts_csv(path, &conflicts)?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
    };

    std::process::exit(code);
}

fn report_outcome(outcome: &GenerationOutcome) -> Result<i32> {
    if let RunStatus::Failed(reason) = &outcome.status {
        bail!("generation failed: {}", serde_json::to_string(reason)?);
    }
    println!(
        "Generated {} assignment(s) over {} slot(s)",
        outcome.assignments.len(),
        outcome.report.len()
    );
    let shortfalls = outcome.shortfalls();
    if shortfalls.is_empty() {
        return Ok(0);
    }
    eprintln!("Found {} understaffed slot(s)", shortfalls.len());
    for s in &shortfalls {
        eprintln!(
            "{} {} | {}/{}{}",
            s.date,
            s.shift,
            s.assigned,
            s.required,
            if s.relaxed { " (relaxed)" } else { "" }
        );
    }
    Ok(2)
}
