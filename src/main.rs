/// rexvm - Regular Expression CLI
use rexvm::{Engine, EngineConfig, FlagSet, RegexHandle};
use std::env;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process;
use tracing::Level;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("rexvm v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    rexvm [OPTIONS] <PATTERN> [INPUT]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help               Print this help message");
    eprintln!("    -V, --version            Print version information");
    eprintln!("    -f, --flags <FLAGS>      Regex flags, any of 'gimuy'");
    eprintln!("    -r, --replace <TEMPLATE> Print each line with matches replaced");
    eprintln!("    --disassemble            Print the bytecode program");
    eprintln!("    --no-jit                 Run on the bytecode tier only");
    eprintln!("    --config <FILE>          Load engine settings from a TOML file");
    eprintln!("    --stats                  Print tier and cache statistics");
    eprintln!("    -v, -vv                  Log at debug / trace level");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    <PATTERN>                Regular expression (ECMAScript syntax)");
    eprintln!("    [INPUT]                  Input file, one subject per line (default or '-': stdin)");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    rexvm '(\\w+)@(\\w+)' mail.txt");
    eprintln!("    rexvm -f g -r '$2-$1' '(\\d+):(\\d+)' times.txt");
    eprintln!("    rexvm --disassemble 'a(b|c)*'");
    eprintln!("    cat log.txt | rexvm -f i 'error' -");
}

fn print_version() {
    println!("rexvm {}", VERSION);
}

struct Options {
    pattern: String,
    input: Option<String>,
    flags: FlagSet,
    replace: Option<String>,
    disassemble: bool,
    no_jit: bool,
    config: Option<String>,
    stats: bool,
    verbosity: u8,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut positional = Vec::new();
    let mut flags = FlagSet::empty();
    let mut replace = None;
    let mut disassemble = false;
    let mut no_jit = false;
    let mut config = None;
    let mut stats = false;
    let mut verbosity = 0;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-V" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-f" | "--flags" => {
                i += 1;
                let text = args.get(i).ok_or("Missing flags after -f")?;
                flags = text
                    .parse()
                    .map_err(|e| format!("Invalid flags '{}': {}", text, e))?;
            }
            "-r" | "--replace" => {
                i += 1;
                let template = args.get(i).ok_or("Missing template after -r")?;
                replace = Some(template.clone());
            }
            "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing file after --config")?;
                config = Some(path.clone());
            }
            "--disassemble" => disassemble = true,
            "--no-jit" => no_jit = true,
            "--stats" => stats = true,
            "-v" => verbosity = verbosity.max(1),
            "-vv" => verbosity = 2,
            "--" => {
                positional.extend(args[i + 1..].iter().cloned());
                break;
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let pattern = positional.next().ok_or("Missing pattern")?;
    let input = positional.next();
    if positional.next().is_some() {
        return Err("Multiple input files specified".to_string());
    }

    Ok(Options {
        pattern,
        input,
        flags,
        replace,
        disassemble,
        no_jit,
        config,
        stats,
        verbosity,
    })
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn load_config(options: &Options) -> Result<EngineConfig, String> {
    let config = match &options.config {
        Some(path) => EngineConfig::from_file(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    let mut config = config.with_env_overrides().map_err(|e| e.to_string())?;
    if options.no_jit {
        config.jit_enabled = false;
    }
    Ok(config)
}

fn open_input(input: Option<&str>) -> Result<Box<dyn BufRead>, String> {
    match input {
        None | Some("-") => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(path) => {
            if !Path::new(path).exists() {
                return Err(format!("Input file not found: {}", path));
            }
            let file =
                fs::File::open(path).map_err(|e| format!("Failed to open file '{}': {}", path, e))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn format_matches(handle: &RegexHandle, line_num: usize, line: &str) -> Option<String> {
    let mut out = String::new();
    let matches: Vec<_> = if handle.flags().global() {
        handle.find_iter(line).collect()
    } else {
        handle.find(line).into_iter().collect()
    };
    if matches.is_empty() {
        return None;
    }
    for m in matches {
        out.push_str(&format!(
            "{}:{}..{}: {:?}\n",
            line_num,
            m.start(),
            m.end(),
            m.as_str()
        ));
        for index in 1..m.len() {
            match (m.group(index), m.group_range(index)) {
                (Some(text), Some(range)) => out.push_str(&format!(
                    "    ${} {}..{}: {:?}\n",
                    index, range.start, range.end, text
                )),
                _ => out.push_str(&format!("    ${} unset\n", index)),
            }
        }
    }
    Some(out)
}

fn run(options: &Options) -> Result<bool, String> {
    let config = load_config(options)?;
    let engine = Engine::with_config(config);
    let handle = engine
        .try_get_or_create(&options.pattern, options.flags)
        .map_err(|e| format!("Invalid pattern /{}/: {}", options.pattern, e))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let write_err = |e: io::Error| format!("Failed to write output: {}", e);

    if options.disassemble {
        if let Some(listing) = handle.disassemble() {
            write!(out, "{}", listing).map_err(write_err)?;
        }
        if options.input.is_none() {
            return Ok(true);
        }
    }

    let reader = open_input(options.input.as_deref())?;
    let mut matched_any = false;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Failed to read input: {}", e))?;
        match &options.replace {
            Some(template) => {
                matched_any |= handle.is_match(&line);
                writeln!(out, "{}", handle.replace(&line, template)).map_err(write_err)?;
            }
            None => {
                if let Some(text) = format_matches(&handle, index + 1, &line) {
                    matched_any = true;
                    write!(out, "{}", text).map_err(write_err)?;
                }
            }
        }
    }

    if options.stats {
        let tier = handle.tier().map_or("none".to_string(), |t| t.to_string());
        eprintln!("tier: {}", tier);
        if let Some(stats) = handle.stats() {
            eprintln!(
                "runs: {} (native {}, bytecode {}), fallbacks: {} ({} overflow)",
                stats.total_runs,
                stats.native_runs,
                stats.bytecode_runs,
                stats.fallbacks,
                stats.overflow_fallbacks
            );
            eprintln!(
                "native hit rate: {:.1}%, bytecode builds: {}",
                stats.native_hit_rate(),
                stats.bytecode_builds
            );
        }
        let cache = engine.cache_stats();
        eprintln!(
            "cache: {} hits, {} misses, {} live entries",
            cache.hits,
            cache.misses,
            engine.cache_len()
        );
    }

    Ok(matched_any)
}

fn main() {
    let options = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(2);
        }
    };

    init_logging(options.verbosity);

    match run(&options) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}
