//! Command handlers for `modsync`.
//!
//! Each handler returns `Result<ExitCode>`; [`run`] turns failures into an
//! error report and the matching exit code. Command output goes to stdout
//! as a JSON envelope or as human-readable text.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ms_common::{
    format_identifier_str, identifier_sort_key, normalize_alpha_numeric_id, Error, OutputFormat,
    Result, FORMAT_VERSION,
};
use ms_config::{
    check_consistency, resolve_config, schema_template, serialize, supported_fields,
    ConfigPaths, ConfigSession, ConfigStore, Configuration, MergeReport, ModuleRecord, Settings,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands, IdCommands, SchemaCommands, ToggleArgs};
use crate::exit_codes::ExitCode;

/// Everything a command needs, resolved once.
struct Context {
    format: OutputFormat,
    store: ConfigStore,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let ConfigPaths { config, settings } =
            resolve_config(cli.config.as_deref(), cli.settings.as_deref());
        debug!(
            config = %config.path.display(),
            config_source = %config.source,
            settings = %settings.path.display(),
            settings_source = %settings.source,
            "resolved paths"
        );
        let loaded = Settings::load(&settings.path)?;
        Ok(Self {
            format: cli.format,
            store: ConfigStore::new(config.path).with_backup(loaded.backup_on_save),
        })
    }

    fn emit(&self, command: &str, body: Value, human: impl FnOnce()) -> Result<()> {
        match self.format {
            OutputFormat::Json => print_json(&envelope(command, body)),
            OutputFormat::Human => {
                human();
                Ok(())
            }
        }
    }
}

fn envelope(command: &str, body: Value) -> Value {
    let mut out = json!({
        "format_version": FORMAT_VERSION,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "command": command,
    });
    if let (Some(out), Value::Object(body)) = (out.as_object_mut(), body) {
        out.extend(body);
    }
    out
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Show => "show",
        Commands::Export { .. } => "export",
        Commands::Import { .. } => "import",
        Commands::Schema { command } => match command {
            SchemaCommands::Template => "schema template",
            SchemaCommands::Fields => "schema fields",
            SchemaCommands::Check => "schema check",
        },
        Commands::Id { command } => match command {
            IdCommands::Normalize { .. } => "id normalize",
            IdCommands::Format { .. } => "id format",
            IdCommands::Key { .. } => "id key",
        },
        Commands::Enable(_) => "enable",
        Commands::Disable(_) => "disable",
    }
}

/// Run the parsed command line.
pub fn run(cli: &Cli) -> ExitCode {
    let name = command_name(&cli.command);
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            let code = ExitCode::from_error(&err);
            report_error(cli.format, name, &err, code);
            code
        }
    }
}

fn report_error(format: OutputFormat, command: &str, err: &Error, code: ExitCode) {
    match format {
        OutputFormat::Json => {
            let body = json!({
                "error": {
                    "code": err.code(),
                    "exit_code": code.as_i32(),
                    "message": err.to_string(),
                }
            });
            if print_json(&envelope(command, body)).is_err() {
                eprintln!("modsync {command}: {err}");
            }
        }
        OutputFormat::Human => eprintln!("modsync {command}: {err}"),
    }
}

fn dispatch(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Id { command } => run_id(cli.format, command),
        Commands::Schema { command } => run_schema(cli.format, command),
        Commands::Show => run_show(&Context::load(cli)?),
        Commands::Export { output } => run_export(&Context::load(cli)?, output),
        Commands::Import {
            input,
            replace,
            dry_run,
        } => run_import(&Context::load(cli)?, input, *replace, *dry_run),
        Commands::Enable(args) => run_toggle(&Context::load(cli)?, args, true),
        Commands::Disable(args) => run_toggle(&Context::load(cli)?, args, false),
    }
}

fn module_summary(module: &ModuleRecord) -> Value {
    let variables: Vec<Value> = module
        .variables
        .iter()
        .map(|v| {
            json!({
                "name": v.name,
                "enabled": v.enabled,
                "identifier": v.is_any_identifier(),
            })
        })
        .collect();
    json!({
        "name": module.name,
        "enabled": module.enabled,
        "order": module.order,
        "variables": variables,
    })
}

fn check_mark(enabled: bool) -> &'static str {
    if enabled {
        "[x]"
    } else {
        "[ ]"
    }
}

fn print_modules(configuration: &Configuration) {
    for module in configuration.ordered_modules() {
        let mark = check_mark(module.enabled);
        match module.order {
            Some(order) => println!("{mark} {} (order {order})", module.name),
            None => println!("{mark} {}", module.name),
        }
        for variable in &module.variables {
            let role = if variable.is_any_identifier() {
                " (identifier)"
            } else {
                ""
            };
            println!("    {} {}{role}", check_mark(variable.enabled), variable.name);
        }
    }
}

fn run_show(ctx: &Context) -> Result<ExitCode> {
    let configuration = ctx.store.load()?;
    let modules: Vec<Value> = configuration
        .ordered_modules()
        .into_iter()
        .map(module_summary)
        .collect();
    let body = json!({
        "path": ctx.store.path().display().to_string(),
        "count": modules.len(),
        "modules": modules,
    });
    ctx.emit("show", body, || {
        println!(
            "# {} ({} modules)",
            ctx.store.path().display(),
            configuration.modules.len()
        );
        print_modules(&configuration);
    })?;
    Ok(ExitCode::Clean)
}

fn run_export(ctx: &Context, output: &str) -> Result<ExitCode> {
    let configuration = ctx.store.load()?;
    let document = serialize(&configuration)?;
    if output == "-" {
        println!("{document}");
        return Ok(ExitCode::Clean);
    }

    let path = PathBuf::from(output);
    fs::write(&path, document).map_err(|e| Error::SaveFailed {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    info!(path = %path.display(), modules = configuration.modules.len(), "exported");

    let body = json!({
        "output": path.display().to_string(),
        "count": configuration.modules.len(),
    });
    ctx.emit("export", body, || {
        println!(
            "Exported {} modules to {}",
            configuration.modules.len(),
            path.display()
        );
    })?;
    Ok(ExitCode::Clean)
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| Error::LoadFailed {
                path: PathBuf::from("<stdin>"),
                reason: e.to_string(),
            })?;
        return Ok(text);
    }
    let path = Path::new(input);
    fs::read_to_string(path).map_err(|e| Error::LoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn print_report(report: &MergeReport) {
    println!(
        "Matched {} modules, added {}, dropped {}",
        report.matched_modules.len(),
        report.added_modules.len(),
        report.dropped_modules.len()
    );
    if !report.added_modules.is_empty() {
        println!("  added: {}", report.added_modules.join(", "));
    }
    if !report.dropped_modules.is_empty() {
        println!("  dropped: {}", report.dropped_modules.join(", "));
    }
    if !report.added_variables.is_empty() {
        let names: Vec<String> = report.added_variables.iter().map(|v| v.to_string()).collect();
        println!("  added variables: {}", names.join(", "));
    }
    if !report.dropped_variables.is_empty() {
        let names: Vec<String> = report
            .dropped_variables
            .iter()
            .map(|v| v.to_string())
            .collect();
        println!("  dropped variables: {}", names.join(", "));
    }
}

fn run_import(ctx: &Context, input: &str, replace: bool, dry_run: bool) -> Result<ExitCode> {
    let text = read_input(input)?;
    let mut session = ConfigSession::new(ctx.store.load()?)?;

    let changed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&changed);
    session.subscribe(Arc::new(move |cfg: &Configuration| {
        debug!(modules = cfg.modules.len(), "active configuration changed");
        flag.store(true, Ordering::SeqCst);
    }));

    let report = if replace {
        session.import_replace(&text)?;
        None
    } else {
        Some(session.import_merge(&text)?)
    };
    if let Some(report) = report.as_ref().filter(|r| r.dropped_anything()) {
        warn!(
            modules = report.dropped_modules.len(),
            variables = report.dropped_variables.len(),
            "import removed entries absent from the imported document"
        );
    }

    let changed = changed.load(Ordering::SeqCst);
    let (saved, backup) = if changed && !dry_run {
        (true, ctx.store.save(session.current())?)
    } else {
        (false, None)
    };

    let mode = if replace { "replace" } else { "merge" };
    let body = json!({
        "input": input,
        "mode": mode,
        "dry_run": dry_run,
        "changed": changed,
        "saved": saved,
        "backup": backup.as_ref().map(|p| p.display().to_string()),
        "count": session.current().modules.len(),
        "report": report,
    });
    ctx.emit("import", body, || {
        match &report {
            Some(report) => print_report(report),
            None => println!(
                "Replaced configuration ({} modules)",
                session.current().modules.len()
            ),
        }
        if dry_run {
            println!("Dry run: nothing saved");
        } else if !changed {
            println!("No changes");
        } else if let Some(backup) = &backup {
            println!("Saved (previous file kept at {})", backup.display());
        } else {
            println!("Saved");
        }
    })?;
    Ok(ExitCode::Clean)
}

fn run_toggle(ctx: &Context, args: &ToggleArgs, enabled: bool) -> Result<ExitCode> {
    let mut session = ConfigSession::new(ctx.store.load()?)?;
    let changed = match &args.variable {
        Some(variable) => session.set_variable_enabled(&args.module, variable, enabled)?,
        None => session.set_module_enabled(&args.module, enabled)?,
    };
    if changed {
        ctx.store.save(session.current())?;
    }

    let command = if enabled { "enable" } else { "disable" };
    let body = json!({
        "module": args.module,
        "variable": args.variable,
        "enabled": enabled,
        "changed": changed,
    });
    ctx.emit(command, body, || {
        let target = match &args.variable {
            Some(variable) => format!("{}.{variable}", args.module),
            None => args.module.clone(),
        };
        let state = if enabled { "enabled" } else { "disabled" };
        if changed {
            println!("{target} {state}");
        } else {
            println!("{target} already {state}");
        }
    })?;
    Ok(ExitCode::Clean)
}

fn run_schema(format: OutputFormat, command: &SchemaCommands) -> Result<ExitCode> {
    match command {
        SchemaCommands::Template => {
            // The template is itself a JSON document in either format.
            print_json(&schema_template())?;
            Ok(ExitCode::Clean)
        }
        SchemaCommands::Fields => {
            let fields = supported_fields();
            match format {
                OutputFormat::Json => {
                    let body = serde_json::to_value(&fields)?;
                    print_json(&envelope("schema fields", body))?;
                }
                OutputFormat::Human => {
                    println!("module fields: {}", fields.module_fields.join(", "));
                    println!("variable fields: {}", fields.variable_fields.join(", "));
                }
            }
            Ok(ExitCode::Clean)
        }
        SchemaCommands::Check => {
            let report = check_consistency();
            match format {
                OutputFormat::Json => {
                    let body = json!({
                        "consistent": report.is_consistent(),
                        "drift": report,
                    });
                    print_json(&envelope("schema check", body))?;
                }
                OutputFormat::Human => println!("{report}"),
            }
            if report.is_consistent() {
                Ok(ExitCode::Clean)
            } else {
                Ok(ExitCode::SchemaDrift)
            }
        }
    }
}

fn run_id(format: OutputFormat, command: &IdCommands) -> Result<ExitCode> {
    let (name, input, output) = match command {
        IdCommands::Normalize { id } => (
            "id normalize",
            id,
            normalize_alpha_numeric_id(id).into_owned(),
        ),
        IdCommands::Format { value } => ("id format", value, format_identifier_str(value)),
        IdCommands::Key { value } => ("id key", value, identifier_sort_key(value)),
    };
    match format {
        OutputFormat::Json => {
            print_json(&envelope(name, json!({ "input": input, "output": output })))?
        }
        OutputFormat::Human => println!("{output}"),
    }
    Ok(ExitCode::Clean)
}
