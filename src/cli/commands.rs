use crate::config::{
    load_config, resolve_config_path, ArrayOfPrimitivesPolicy, GeneratorConfig, OperationSetPolicy,
    Policy, CONFIG_FILE_NAME,
};
use crate::generator::run_generation;
use crate::linter::{lint_annotations, print_lint_issues, LintIssue, LintSeverity};
use crate::logging::{init_logging_with_config, LogConfig};
use crate::markers::MarkerRegistry;
use crate::resource::collect;
use crate::source::RustSourceExtractor;
use crate::spec::load_provider;
use crate::validator::print_issues;
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line interface for clientgen
///
/// Derives resource client models from annotated Rust sources and an
/// OpenAPI document.
#[derive(Parser, Debug)]
#[command(name = "clientgen", version)]
#[command(about = "Derive REST resource client models from annotations and OpenAPI", long_about = None)]
pub struct Cli {
    /// Log level: trace/debug/info/warn/error
    #[arg(long, global = true, env = "CLIENTGEN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where annotations come from.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceArgs {
    /// Files or directories with annotated resource declarations
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub resources: Vec<PathBuf>,

    /// Hand-written client wiring files
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub wiring: Vec<PathBuf>,

    /// Annotation namespace (default: clientgen)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Path to the configuration file (clientgen.toml)
    /// If not provided, will auto-detect alongside the OpenAPI document
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Policy overrides. Unset flags keep the configured value.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyArgs {
    /// What to do with repeated operation-set markers
    #[arg(long, value_enum)]
    pub operation_set: Option<OperationSetPolicy>,

    /// Whether List may return an array of scalars
    #[arg(long, value_enum)]
    pub array_of_primitives: Option<ArrayOfPrimitivesPolicy>,

    /// Build referenced components structurally instead of aliasing them
    #[arg(long, default_value_t = false)]
    pub no_alias: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the generation model and write it as JSON
    Generate {
        /// Path to the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Exit with an error if any operation was excluded
        #[arg(long, default_value_t = false)]
        fail_on_issues: bool,
    },
    /// Lint resource annotations
    ///
    /// Checks annotations without reading the OpenAPI document:
    /// - Unknown markers and markers on the wrong declaration
    /// - Malformed payloads and options
    /// - Duplicate operation sets
    /// - Unsupported verbs and wait timeouts
    Lint {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Exit with error code if any errors are found
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,

        /// Show only errors (hide warnings and info)
        #[arg(long, default_value_t = false)]
        errors_only: bool,
    },
    /// Print the assembled resource descriptors as JSON
    Inspect {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

/// Settings for one run: the config file with command-line overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub namespace: String,
    pub spec: Option<PathBuf>,
    pub resources: Vec<PathBuf>,
    pub wiring: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub policy: Policy,
}

impl RunSettings {
    fn extractor(&self) -> RustSourceExtractor {
        RustSourceExtractor::new(self.resources.clone(), self.wiring.clone())
    }

    fn registry(&self) -> anyhow::Result<MarkerRegistry> {
        MarkerRegistry::with_defaults(&self.namespace)
            .with_context(|| format!("invalid annotation namespace `{}`", self.namespace))
    }
}

/// Merge the configuration file (explicit, next to the spec, or in the
/// working directory) with command-line flags.
pub fn resolve_settings(
    sources: &SourceArgs,
    policy_args: &PolicyArgs,
    spec: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<RunSettings> {
    let config_path = resolve_config_path(sources.config.as_deref(), spec).or_else(|| {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        local.exists().then_some(local)
    });
    let config = match &config_path {
        Some(path) => {
            let loaded = load_config(path)?;
            if loaded.is_none() && sources.config.is_some() {
                bail!("config file {} does not exist", path.display());
            }
            loaded.unwrap_or_default()
        }
        None => GeneratorConfig::default(),
    };
    if let Some(path) = &config_path {
        tracing::debug!(config = %path.display(), "using configuration file");
    }

    let mut policy = config.policy.resolve()?;
    if let Some(operation_set) = policy_args.operation_set {
        policy.operation_set = operation_set;
    }
    if let Some(array_of_primitives) = policy_args.array_of_primitives {
        policy.array_of_primitives = array_of_primitives;
    }
    if policy_args.no_alias {
        policy.alias_components = false;
    }

    let or_config = |cli: &[PathBuf], file: &[PathBuf]| {
        if cli.is_empty() {
            file.to_vec()
        } else {
            cli.to_vec()
        }
    };

    Ok(RunSettings {
        namespace: sources
            .namespace
            .clone()
            .unwrap_or_else(|| config.namespace().to_string()),
        spec: spec.map(Path::to_path_buf).or_else(|| config.spec.clone()),
        resources: or_config(&sources.resources, &config.resources),
        wiring: or_config(&sources.wiring, &config.wiring),
        output: output.map(Path::to_path_buf).or_else(|| config.output.clone()),
        policy,
    })
}

fn generate(settings: &RunSettings, fail_on_issues: bool) -> anyhow::Result<()> {
    let Some(spec) = settings.spec.as_deref() else {
        bail!("no OpenAPI document given; pass --spec or set `spec` in {CONFIG_FILE_NAME}");
    };
    if settings.resources.is_empty() && settings.wiring.is_empty() {
        bail!("no sources given; pass --resources/--wiring or set them in {CONFIG_FILE_NAME}");
    }
    let provider =
        load_provider(spec)?.with_list_wrapper_keys(settings.policy.list_wrapper_keys.clone());
    let registry = settings.registry()?;
    let run = run_generation(
        &settings.extractor(),
        &provider,
        &registry,
        &settings.namespace,
        &settings.policy,
    )?;

    print_issues(&run.model.issues);
    let json = run.model.to_json_pretty()?;
    match &settings.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "✅ Wrote {} resource(s) and {} type(s) to {}",
                run.model.resources.len(),
                run.model.types.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    if fail_on_issues && !run.model.issues.is_empty() {
        bail!("{} operation(s) or propert(ies) excluded", run.model.issues.len());
    }
    Ok(())
}

fn lint(settings: &RunSettings, fail_on_error: bool, errors_only: bool) -> anyhow::Result<()> {
    let issues = lint_annotations(
        &settings.extractor(),
        &settings.registry()?,
        &settings.namespace,
        &settings.policy,
    )?;
    let shown: Vec<LintIssue> = if errors_only {
        issues
            .into_iter()
            .filter(|i| i.severity == LintSeverity::Error)
            .collect()
    } else {
        issues
    };
    print_lint_issues(&shown);

    let errors = shown
        .iter()
        .filter(|i| i.severity == LintSeverity::Error)
        .count();
    if fail_on_error && errors > 0 {
        bail!("{errors} lint error(s) found");
    }
    Ok(())
}

fn inspect(settings: &RunSettings) -> anyhow::Result<()> {
    let collected = collect(
        &settings.extractor(),
        &settings.registry()?,
        &settings.namespace,
        &settings.policy,
    )?;
    let descriptors: Vec<_> = collected.descriptors.values().collect();
    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(())
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file or OpenAPI document cannot be read or parsed
/// - Source files cannot be parsed
/// - An annotation references an operation the document does not declare
/// - `--fail-on-error` / `--fail-on-issues` is set and problems were found
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            spec,
            output,
            sources,
            policy,
            fail_on_issues,
        } => {
            let settings = resolve_settings(&sources, &policy, spec.as_deref(), output.as_deref())?;
            generate(&settings, fail_on_issues)
        }
        Commands::Lint {
            sources,
            policy,
            fail_on_error,
            errors_only,
        } => {
            let settings = resolve_settings(&sources, &policy, None, None)?;
            lint(&settings, fail_on_error, errors_only)
        }
        Commands::Inspect { sources, policy } => {
            let settings = resolve_settings(&sources, &policy, None, None)?;
            inspect(&settings)
        }
    }
}

/// Parse the command line, set up logging and run.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config.log_level = level.clone();
    }
    init_logging_with_config(&log_config)?;
    run(cli)
}
