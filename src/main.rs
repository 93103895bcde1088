use chill_shield::classifier::Analysis;
use chill_shield::{
    Classification, ClassificationSession, Classifier, ClassifyError, Config, RuleLibrary,
};
use clap::{Arg, Command};
use log::LevelFilter;
use std::io::Read;
use std::process;
use std::sync::Arc;

// French one-tap suggestions, then an English prize scam and a meeting reply.
const DEMO_MESSAGES: &[&str] = &[
    "Urgent ! Votre compte sera suspendu. Cliquez ici pour vérifier.",
    "Félicitations 🎉 Vous avez gagné un prix. Réclamez-le maintenant.",
    "Votre colis est en attente. Confirmez vos informations.",
    "Salut, on se voit demain pour la réunion ?",
    "Merci pour ton aide aujourd’hui, à très vite.",
    "URGENT! You have won $1,000,000! Click here to claim your prize now: bit.ly/claim-prize. Act fast, offer expires in 24 hours!",
    "Hi! Just wanted to confirm our meeting tomorrow at 2 PM. Let me know if the time still works for you. See you then!",
];

#[tokio::main]
async fn main() {
    let matches = Command::new("chill-shield")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rule-based SMS spam classifier")
        .long_about("Chill Shield - classify short text messages as spam or ham:\n\
                    • Weighted risk and trust pattern rules\n\
                    • Punctuation and capitalization heuristics\n\
                    • Bounded confidence with human-readable indicators\n\
                    • Optional remote model backend behind the same interface")
        .arg(
            Arg::new("message")
                .value_name("MESSAGE")
                .help("Message to classify (read from stdin when omitted)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/chill-shield.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-rules")
                .long("list-rules")
                .help("List the built-in rule catalog")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Classify every non-blank line of FILE")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Classify the built-in sample messages")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print results as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("explain")
                .long("explain")
                .help("Show the score breakdown (local backend only)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Seed the confidence smoothing for reproducible output")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging with per-rule matches")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    if matches.get_flag("list-rules") {
        list_rules();
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/chill-shield.yaml");

    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.calibration.seed = Some(*seed);
    }

    let classifier = match Classifier::from_config(&config) {
        Ok(classifier) => Arc::new(classifier),
        Err(e) => {
            eprintln!("❌ Failed to initialize classifier: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        println!();
        println!("Backend: {}", classifier.backend_name());
        println!(
            "Confidence range: {:.1}% - {:.1}% (smoothing up to {:.1})",
            config.calibration.floor, config.calibration.ceiling, config.calibration.jitter
        );
        if let Classifier::Local(local) = classifier.as_ref() {
            println!(
                "Rules compiled: {} risk, {} trust",
                local.library().risk_rules().len(),
                local.library().trust_rules().len()
            );
        }
        println!("✅ Configuration validated");
        return;
    }

    let messages = collect_messages(&matches);
    if messages.is_empty() {
        eprintln!("❌ {}", ClassifyError::EmptyMessage);
        process::exit(1);
    }

    let json = matches.get_flag("json");
    let explain = matches.get_flag("explain");
    let session = ClassificationSession::new(classifier.clone());
    let mut failures = 0;

    for message in &messages {
        if explain {
            if let Classifier::Local(local) = classifier.as_ref() {
                match local.analyze(message) {
                    Ok(analysis) => print_analysis(message, &analysis, json),
                    Err(e) => {
                        eprintln!("❌ Classification failed: {e}");
                        failures += 1;
                    }
                }
                continue;
            }
            log::warn!("--explain is only available with the local backend");
        }

        match session.classify(message).await {
            Ok(classification) => print_classification(message, &classification, json),
            Err(e) => {
                eprintln!("❌ Classification failed: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::debug!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}

fn list_rules() {
    let library = match RuleLibrary::new() {
        Ok(library) => library,
        Err(e) => {
            eprintln!("❌ {e}");
            process::exit(1);
        }
    };

    println!("📋 Rule Catalog");
    println!("═══════════════════════════════════════");
    for rule in library.rules() {
        println!(
            "  [{:<5}] +{:<3} {}",
            rule.category().to_string(),
            rule.weight(),
            rule.indicator()
        );
        println!("          /{}/", rule.pattern());
    }
    println!();
    println!("Heuristics:");
    println!(
        "  [risk ] +{:<3} more than {} exclamation marks",
        chill_shield::scoring::EXCLAMATION_BONUS,
        chill_shield::scoring::EXCLAMATION_LIMIT
    );
    println!(
        "  [risk ] +{:<3} {} (over {} chars)",
        chill_shield::scoring::CAPITALIZATION_BONUS,
        chill_shield::scoring::CAPITALIZATION_INDICATOR,
        chill_shield::scoring::CAPITALIZATION_MIN_LENGTH
    );
}

/// Messages to classify, in order. Blank lines are skipped, never scored.
fn collect_messages(matches: &clap::ArgMatches) -> Vec<String> {
    if matches.get_flag("demo") {
        return DEMO_MESSAGES.iter().map(|m| m.to_string()).collect();
    }

    if let Some(path) = matches.get_one::<String>("file") {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("❌ Error reading {path}: {e}");
                process::exit(1);
            }
        };
        return content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                if line.trim().is_empty() {
                    log::warn!("Skipping blank line {} of {path}", i + 1);
                    None
                } else {
                    Some(line.to_string())
                }
            })
            .collect();
    }

    let message = match matches.get_one::<String>("message") {
        Some(message) => message.clone(),
        None => {
            let mut buffer = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
                eprintln!("❌ Error reading stdin: {e}");
                process::exit(1);
            }
            buffer
        }
    };

    if message.trim().is_empty() {
        Vec::new()
    } else {
        vec![message]
    }
}

fn print_classification(message: &str, classification: &Classification, json: bool) {
    if json {
        match serde_json::to_string(classification) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("❌ Failed to encode result: {e}"),
        }
        return;
    }

    let verdict = if classification.is_spam() {
        "🚨 SPAM"
    } else {
        "✅ HAM"
    };
    println!("📱 {}", truncate_string(message, 70));
    println!("   {verdict} ({:.1}% confidence)", classification.confidence);
    for indicator in &classification.indicators {
        println!("   • {indicator}");
    }
    println!();
}

fn print_analysis(message: &str, analysis: &Analysis, json: bool) {
    if json {
        match serde_json::to_string(analysis) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("❌ Failed to encode result: {e}"),
        }
        return;
    }

    print_classification(message, &analysis.classification, false);
    let outcome = &analysis.outcome;
    println!("   Score breakdown:");
    println!(
        "   ├─ Risk:  {:>3}  {}",
        outcome.risk.total(),
        outcome.risk.indicators().join(", ")
    );
    println!(
        "   ├─ Trust: {:>3}  {}",
        outcome.trust.total(),
        outcome.trust.indicators().join(", ")
    );
    println!(
        "   └─ {} chars, {} exclamation marks, {:.0}% uppercase",
        outcome.length,
        outcome.exclamation_count,
        outcome.uppercase_ratio * 100.0
    );
    println!();
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
